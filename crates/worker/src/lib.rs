//! Task queue, progress registry and the pool of extraction workers.
//!
//! The HTTP layer talks to [`Dispatcher`]; everything behind it runs on the
//! [`WorkerPool`] and reports through the outcome channel.

pub mod dispatcher;
pub mod outcome;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod storage;

pub use dispatcher::{Dispatcher, TaskStatus};
pub use outcome::{outcome_channel, report_outcomes, JobFailure, JobOutcome};
pub use pool::{WorkerConfig, WorkerPool};
pub use queue::{TaskQueue, TaskReceiver};
pub use registry::ProgressRegistry;
pub use storage::ResultStore;
