use std::sync::Arc;

use sliceosm_core::error::CoreError;
use sliceosm_core::task::Task;
use tokio::sync::{mpsc, Mutex};

/// Producer half of the bounded FIFO of accepted tasks.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<Task>,
}

/// Consumer half, shared by every worker in the pool.
#[derive(Clone)]
pub struct TaskReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Task>>>,
}

impl TaskQueue {
    /// Create a queue holding at most `capacity` tasks. A zero capacity is
    /// raised to one.
    pub fn bounded(capacity: usize) -> (TaskQueue, TaskReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            TaskQueue { tx },
            TaskReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Append `task` without waiting. A full queue is rejected immediately.
    pub fn try_enqueue(&self, task: Task) -> Result<(), CoreError> {
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CoreError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => {
                CoreError::Internal("task queue is closed".into())
            }
        })
    }

    /// Number of tasks waiting to be picked up.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskReceiver {
    /// Wait for the next task. `None` once every [`TaskQueue`] is dropped
    /// and the backlog is drained.
    pub async fn recv(&self) -> Option<Task> {
        self.rx.lock().await.recv().await
    }
}
