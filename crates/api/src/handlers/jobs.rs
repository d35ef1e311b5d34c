//! Handlers for extraction job submission and status.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sliceosm_core::error::CoreError;
use sliceosm_worker::TaskStatus;
use tokio_util::io::ReaderStream;

use crate::error::AppResult;
use crate::state::AppState;

/// POST /
///
/// Accepts a `{Name, RegionType, RegionData}` document and answers `201`
/// with the new task id as plain text.
pub async fn submit(State(state): State<AppState>, body: Bytes) -> AppResult<impl IntoResponse> {
    let task = state.dispatcher.submit_json(&body).await?;
    Ok((StatusCode::CREATED, task.uuid))
}

/// GET /api/{id}
///
/// Live progress while the task is queued or running, the stored completion
/// record once it is done, `404` otherwise.
pub async fn status(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    match state.dispatcher.status(&id).await? {
        TaskStatus::InFlight(progress) => Ok(Json(progress).into_response()),
        TaskStatus::Completed(file) => Ok((
            [(CONTENT_TYPE, "application/json")],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response()),
        TaskStatus::Unknown => Err(CoreError::NotFound { entity: "Task", id }.into()),
    }
}
