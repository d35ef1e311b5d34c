//! Fixed-size pool of extraction workers.
//!
//! Each worker pulls one task at a time off the shared [`TaskReceiver`],
//! runs the extraction tool to completion and reports a [`JobOutcome`].
//! There is no preemption: a launched subprocess runs until it exits or the
//! pool is aborted on shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sliceosm_core::progress::Progress;
use sliceosm_core::task::Task;
use sliceosm_core::tool::ExtractTool;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::outcome::{JobFailure, JobOutcome, OutcomeSender};
use crate::queue::TaskReceiver;
use crate::registry::ProgressRegistry;
use crate::storage::{remove_if_present, ResultStore, ARTIFACT_SUFFIX};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub workers: usize,
    /// Working directory for region files and in-progress artifacts.
    pub tmp_dir: PathBuf,
}

/// State shared by every worker in the pool.
struct Shared {
    tmp_dir: PathBuf,
    receiver: TaskReceiver,
    registry: Arc<ProgressRegistry>,
    store: Arc<ResultStore>,
    tool: ExtractTool,
    outcomes: OutcomeSender,
}

/// Handle to the running workers.
pub struct WorkerPool {
    cancel: CancellationToken,
    workers: JoinSet<()>,
}

impl WorkerPool {
    /// Spawn `config.workers` workers on the current runtime.
    pub fn start(
        config: WorkerConfig,
        receiver: TaskReceiver,
        registry: Arc<ProgressRegistry>,
        store: Arc<ResultStore>,
        tool: ExtractTool,
        outcomes: OutcomeSender,
    ) -> Self {
        let shared = Arc::new(Shared {
            tmp_dir: config.tmp_dir,
            receiver,
            registry,
            store,
            tool,
            outcomes,
        });
        let cancel = CancellationToken::new();
        let mut workers = JoinSet::new();

        for worker_id in 0..config.workers.max(1) {
            workers.spawn(Arc::clone(&shared).run(worker_id, cancel.clone()));
        }

        tracing::info!(workers = workers.len(), "Worker pool started");
        Self { cancel, workers }
    }

    /// Stop picking up new tasks and wait up to `grace` for in-flight
    /// extractions. Workers still busy after that are aborted, which kills
    /// their subprocesses.
    pub async fn shutdown(mut self, grace: Duration) {
        self.cancel.cancel();

        let drained = tokio::time::timeout(grace, async {
            while self.workers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = self.workers.len(),
                "Workers did not finish within the grace period, aborting",
            );
            self.workers.shutdown().await;
        }
        tracing::info!("Worker pool stopped");
    }
}

impl Shared {
    async fn run(self: Arc<Self>, worker_id: usize, cancel: CancellationToken) {
        tracing::debug!(worker_id, "Worker started");

        loop {
            let task = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                task = self.receiver.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            tracing::info!(worker_id, task_id = %task.uuid, "Extraction started");
            let outcome = self.process(&task).await;
            if self.outcomes.send(outcome).is_err() {
                tracing::warn!(task_id = %task.uuid, "Outcome reporter is gone");
            }
        }

        tracing::debug!(worker_id, "Worker stopped");
    }

    async fn process(&self, task: &Task) -> JobOutcome {
        let started = Instant::now();
        let region_file = self.tmp_dir.join(task.region_file_name());
        let output = self
            .tmp_dir
            .join(format!("{}.{ARTIFACT_SUFFIX}", task.uuid));

        self.registry.update(&task.uuid, Progress::default()).await;

        match self.extract(task, &region_file, &output, started).await {
            Ok((elapsed, size_bytes)) => JobOutcome::Completed {
                task_id: task.uuid.clone(),
                elapsed,
                size_bytes,
            },
            Err(error) => {
                self.registry.remove(&task.uuid).await;
                remove_if_present(&region_file).await;
                remove_if_present(&output).await;
                self.store.discard(&task.uuid).await;
                JobOutcome::Failed {
                    task_id: task.uuid.clone(),
                    error,
                }
            }
        }
    }

    async fn extract(
        &self,
        task: &Task,
        region_file: &Path,
        output: &Path,
        started: Instant,
    ) -> Result<(f64, u64), JobFailure> {
        tokio::fs::write(region_file, task.region_file_contents()?)
            .await
            .map_err(JobFailure::io("write region file"))?;

        let mut run = self.tool.extract(output, region_file)?;
        let mut last = Progress::default();
        while let Some(progress) = run.next_progress().await? {
            self.registry.update(&task.uuid, progress.clone()).await;
            last = progress;
        }
        run.wait().await?;

        let size_bytes = self
            .store
            .store_artifact(output, &task.uuid)
            .await
            .map_err(JobFailure::io("store artifact"))?;
        tokio::fs::remove_file(region_file)
            .await
            .map_err(JobFailure::io("remove region file"))?;
        self.store
            .write_submission(task)
            .await
            .map_err(JobFailure::io("write submission echo"))?;

        let elapsed = started.elapsed().as_secs_f64();
        let record = Progress {
            size_bytes: i64::try_from(size_bytes).unwrap_or(i64::MAX),
            elapsed,
            complete: true,
            ..last
        };

        self.registry
            .retire_with(&task.uuid, || self.store.write_record(&task.uuid, &record))
            .await
            .map_err(JobFailure::io("write completion record"))?;

        Ok((elapsed, size_bytes))
    }
}
