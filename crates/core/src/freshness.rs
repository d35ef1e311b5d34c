//! Lazily refreshed dataset timestamp.
//!
//! Health reporting needs to know how old the dataset is. Asking the tool is
//! a subprocess round trip, so the answer is cached and only refreshed once
//! it is older than the refresh interval.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::progress::HealthStatus;
use crate::tool::ExtractTool;
use crate::types::Timestamp;

/// Minimum time between two timestamp queries.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// A dataset older than this is reported as `warn`.
pub const STALENESS_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Default)]
struct Freshness {
    timestamp: Option<Timestamp>,
    /// Time of the last successful query.
    checked_at: Option<Instant>,
}

pub struct FreshnessCache {
    tool: ExtractTool,
    refresh_interval: Duration,
    staleness_window: chrono::Duration,
    state: Mutex<Freshness>,
}

impl FreshnessCache {
    pub fn new(tool: ExtractTool) -> Self {
        Self::with_intervals(tool, REFRESH_INTERVAL, STALENESS_WINDOW)
    }

    pub fn with_intervals(tool: ExtractTool, refresh_interval: Duration, staleness: Duration) -> Self {
        Self {
            tool,
            refresh_interval,
            staleness_window: chrono::Duration::from_std(staleness)
                .unwrap_or(chrono::Duration::MAX),
            state: Mutex::new(Freshness::default()),
        }
    }

    /// Latest known dataset timestamp, refreshing it first if it is due.
    ///
    /// The query runs under the lock, so concurrent callers wait for it
    /// instead of starting their own. A failed query keeps the previous value
    /// and leaves the refresh due.
    pub async fn timestamp(&self) -> Option<Timestamp> {
        let mut state = self.state.lock().await;

        let due = state
            .checked_at
            .map_or(true, |at| at.elapsed() > self.refresh_interval);
        if due {
            match self.tool.query_timestamp().await {
                Ok(ts) => {
                    state.timestamp = Some(ts);
                    state.checked_at = Some(Instant::now());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dataset timestamp query failed");
                }
            }
        }

        state.timestamp
    }

    /// `Ok` when `timestamp` is no older than the staleness window at `now`.
    pub fn health(&self, timestamp: Option<Timestamp>, now: Timestamp) -> HealthStatus {
        match timestamp {
            Some(ts) if now - ts <= self.staleness_window => HealthStatus::Ok,
            _ => HealthStatus::Warn,
        }
    }
}
