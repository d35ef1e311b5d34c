//! Progress snapshots and the derived system summary.
//!
//! Field names are PascalCase on the wire: the extraction tool emits them that
//! way and browser clients read them back unchanged.

use serde::{Deserialize, Serialize};

/// Snapshot of an extraction, as reported by the tool.
///
/// Each document the tool prints replaces the previous snapshot entirely.
/// `size_bytes`, `elapsed` and `complete` are filled in by the worker once
/// the job has finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Progress {
    pub timestamp: String,
    pub cells_total: i64,
    pub cells_prog: i64,
    pub nodes_total: i64,
    pub nodes_prog: i64,
    pub elems_total: i64,
    pub elems_prog: i64,

    pub size_bytes: i64,
    /// Wall-clock seconds from pickup to completion.
    pub elapsed: f64,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Warn,
}

/// Read-only summary served at `/api`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemState {
    pub status: HealthStatus,
    pub queue_size: usize,
    pub nodes_limit: u64,
    /// RFC 3339 dataset timestamp, empty until the first successful check.
    pub timestamp: String,
}
