//! Job outcomes and the task that reports them.

use sliceosm_core::tool::ToolError;
use sliceosm_core::types::TaskId;
use tokio::sync::mpsc;

/// Why a job did not complete. Never surfaced to the submitter.
#[derive(Debug, thiserror::Error)]
pub enum JobFailure {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Failed to {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode region: {0}")]
    Encode(#[from] serde_json::Error),
}

impl JobFailure {
    pub(crate) fn io(action: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| JobFailure::Io { action, source }
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        task_id: TaskId,
        elapsed: f64,
        size_bytes: u64,
    },
    Failed {
        task_id: TaskId,
        error: JobFailure,
    },
}

pub type OutcomeSender = mpsc::UnboundedSender<JobOutcome>;
pub type OutcomeReceiver = mpsc::UnboundedReceiver<JobOutcome>;

pub fn outcome_channel() -> (OutcomeSender, OutcomeReceiver) {
    mpsc::unbounded_channel()
}

/// Log every outcome until all senders are gone.
pub async fn report_outcomes(mut rx: OutcomeReceiver) {
    while let Some(outcome) = rx.recv().await {
        match outcome {
            JobOutcome::Completed {
                task_id,
                elapsed,
                size_bytes,
            } => {
                tracing::info!(task_id = %task_id, elapsed, size_bytes, "Extraction completed");
            }
            JobOutcome::Failed { task_id, error } => {
                tracing::error!(task_id = %task_id, error = %error, "Extraction failed");
            }
        }
    }
    tracing::debug!("Outcome reporter stopped");
}
