use std::collections::HashMap;
use std::future::Future;

use sliceosm_core::progress::Progress;
use sliceosm_core::types::TaskId;
use tokio::sync::RwLock;

/// Progress of every task that is queued or running.
///
/// An entry exists from the moment a submission is accepted until its
/// worker retires it. Designed to be wrapped in `Arc` and shared between
/// the HTTP handlers and the worker pool.
#[derive(Default)]
pub struct ProgressRegistry {
    entries: RwLock<HashMap<TaskId, Progress>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an empty snapshot for `id` unless one already exists.
    ///
    /// Returns `false` if the id was taken.
    pub async fn reserve(&self, id: &str) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(id) {
            return false;
        }
        entries.insert(id.to_string(), Progress::default());
        true
    }

    /// Replace the snapshot for `id`.
    pub async fn update(&self, id: &str, progress: Progress) {
        self.entries.write().await.insert(id.to_string(), progress);
    }

    pub async fn get(&self, id: &str) -> Option<Progress> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Progress> {
        self.entries.write().await.remove(id)
    }

    /// Remove `id` and run `persist` while still holding the write lock.
    ///
    /// A reader sees either the live entry or the persisted record, never a
    /// gap between the two.
    pub async fn retire_with<F, Fut, T>(&self, id: &str, persist: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut entries = self.entries.write().await;
        entries.remove(id);
        persist().await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
