use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the route tree.
///
/// ```text
/// POST /                 submit an extraction job
/// GET  /api              system state
/// GET  /api/             system state
/// GET  /api/nodes.png    density raster
/// GET  /api/{id}         task progress or completion record
/// ```
///
/// Everything else, including a known path with another method, is `404`.
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::jobs::submit))
        .route("/api", get(handlers::system::system_state))
        .route("/api/", get(handlers::system::system_state))
        .route("/api/nodes.png", get(handlers::system::density_raster))
        .route("/api/{id}", get(handlers::jobs::status))
        .method_not_allowed_fallback(handlers::not_found)
        .fallback(handlers::not_found)
}
