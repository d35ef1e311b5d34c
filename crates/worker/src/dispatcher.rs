//! Admission of new submissions and status lookup.

use std::sync::Arc;

use sliceosm_core::density::DensityRaster;
use sliceosm_core::error::CoreError;
use sliceosm_core::progress::Progress;
use sliceosm_core::region::{self, JobRequest};
use sliceosm_core::task::Task;
use sliceosm_core::types::{is_task_id, new_task_id};

use crate::queue::TaskQueue;
use crate::registry::ProgressRegistry;
use crate::storage::ResultStore;

/// Where a task currently is, as far as a client can tell.
#[derive(Debug)]
pub enum TaskStatus {
    InFlight(Progress),
    Completed(tokio::fs::File),
    /// Never submitted, failed, or not a task id at all.
    Unknown,
}

/// Front door for submissions: validates, estimates, assigns an id and
/// enqueues.
#[derive(Clone)]
pub struct Dispatcher {
    raster: Arc<DensityRaster>,
    nodes_limit: u64,
    queue: TaskQueue,
    registry: Arc<ProgressRegistry>,
    store: Arc<ResultStore>,
}

impl Dispatcher {
    pub fn new(
        raster: Arc<DensityRaster>,
        nodes_limit: u64,
        queue: TaskQueue,
        registry: Arc<ProgressRegistry>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            raster,
            nodes_limit,
            queue,
            registry,
            store,
        }
    }

    /// Parse and submit a raw request body.
    pub async fn submit_json(&self, body: &[u8]) -> Result<Task, CoreError> {
        self.submit(JobRequest::from_json(body)?).await
    }

    /// Validate `request` and queue it for extraction.
    ///
    /// Returns as soon as the task is queued; the caller never waits for the
    /// extraction itself.
    pub async fn submit(&self, request: JobRequest) -> Result<Task, CoreError> {
        let region = region::validate(request)?;

        let raster = Arc::clone(&self.raster);
        let (region, estimate) = tokio::task::spawn_blocking(move || {
            let estimate = raster.estimate(&region.geometry);
            (region, estimate)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("Estimate task failed: {e}")))?;
        tracing::debug!(kind = region.geometry.kind(), estimate, "Region estimated");
        if estimate > self.nodes_limit {
            tracing::info!(estimate, limit = self.nodes_limit, "Submission over node limit");
            return Err(CoreError::AdmissionRejected {
                estimate,
                limit: self.nodes_limit,
            });
        }

        let id = self.reserve_id().await;
        let task = Task::new(id, region);

        if let Err(e) = self.queue.try_enqueue(task.clone()) {
            self.registry.remove(&task.uuid).await;
            tracing::warn!(task_id = %task.uuid, error = %e, "Submission not queued");
            return Err(e);
        }

        tracing::info!(
            task_id = %task.uuid,
            region_type = %task.sanitized_region_type,
            estimate,
            "Task queued",
        );
        Ok(task)
    }

    /// Draw ids until one is free in both the registry and storage, and
    /// claim it in the registry.
    async fn reserve_id(&self) -> String {
        loop {
            let id = new_task_id();
            if self.store.has_record(&id).await {
                continue;
            }
            if self.registry.reserve(&id).await {
                return id;
            }
        }
    }

    /// Look up a task by id.
    pub async fn status(&self, id: &str) -> Result<TaskStatus, CoreError> {
        if !is_task_id(id) {
            return Ok(TaskStatus::Unknown);
        }
        if let Some(progress) = self.registry.get(id).await {
            return Ok(TaskStatus::InFlight(progress));
        }
        match self.store.open_record(id).await {
            Ok(Some(file)) => Ok(TaskStatus::Completed(file)),
            Ok(None) => Ok(TaskStatus::Unknown),
            Err(e) => Err(CoreError::Internal(format!("failed to open record {id}: {e}"))),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn nodes_limit(&self) -> u64 {
        self.nodes_limit
    }
}
