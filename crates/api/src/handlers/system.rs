use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use sliceosm_core::progress::SystemState;

use crate::state::AppState;

/// GET /api
pub async fn system_state(State(state): State<AppState>) -> Json<SystemState> {
    let timestamp = state.freshness.timestamp().await;

    Json(SystemState {
        status: state.freshness.health(timestamp, Utc::now()),
        queue_size: state.dispatcher.queue_len(),
        nodes_limit: state.dispatcher.nodes_limit(),
        timestamp: timestamp
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
    })
}

/// GET /api/nodes.png
///
/// The density raster used for admission, so clients can run the same
/// estimate locally.
pub async fn density_raster(State(state): State<AppState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, "image/png")], state.raster_png.clone())
}
