use std::sync::Arc;

use axum::body::Bytes;
use sliceosm_core::freshness::FreshnessCache;
use sliceosm_worker::Dispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or is reference
/// counted already.
#[derive(Clone)]
pub struct AppState {
    /// Submission and status front end of the worker pool.
    pub dispatcher: Dispatcher,
    /// Cached dataset timestamp for health reporting.
    pub freshness: Arc<FreshnessCache>,
    /// The density raster exactly as read from disk, served to clients.
    pub raster_png: Bytes,
}
