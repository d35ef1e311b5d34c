use axum::http::Uri;
use sliceosm_core::error::CoreError;

use crate::error::AppError;

pub mod jobs;
pub mod system;

/// Answer for unknown paths and for known paths hit with the wrong method.
pub async fn not_found(uri: Uri) -> AppError {
    CoreError::NotFound {
        entity: "Route",
        id: uri.path().to_string(),
    }
    .into()
}
