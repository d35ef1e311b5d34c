//! Durable result storage.
//!
//! Layout under the files directory, per task id:
//!
//! | File               | Contents                          |
//! |--------------------|-----------------------------------|
//! | `<id>`             | final completion record (JSON)    |
//! | `<id>_region.json` | sanitized submission echo         |
//! | `<id>.osm.pbf`     | extraction output                 |

use std::io;
use std::path::{Path, PathBuf};

use sliceosm_core::progress::Progress;
use sliceosm_core::task::Task;

/// Suffix of the extraction output.
pub const ARTIFACT_SUFFIX: &str = "osm.pbf";

#[derive(Debug, Clone)]
pub struct ResultStore {
    files_dir: PathBuf,
}

impl ResultStore {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
        }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.files_dir.join(id)
    }

    fn artifact_path(&self, id: &str) -> PathBuf {
        self.files_dir.join(format!("{id}.{ARTIFACT_SUFFIX}"))
    }

    fn submission_path(&self, id: &str) -> PathBuf {
        self.files_dir.join(format!("{id}_region.json"))
    }

    /// Write the completion record for `id`.
    ///
    /// The record goes to a temporary sibling first and is renamed into
    /// place, so readers never see a partial document.
    pub async fn write_record(&self, id: &str, progress: &Progress) -> io::Result<()> {
        let json = serde_json::to_vec(progress)?;
        let tmp = self.files_dir.join(format!("{id}.tmp"));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.record_path(id)).await
    }

    /// Write the sanitized submission echo for a completed task.
    pub async fn write_submission(&self, task: &Task) -> io::Result<()> {
        let json = serde_json::to_vec(task)?;
        tokio::fs::write(self.submission_path(&task.uuid), json).await
    }

    /// Move a finished artifact into storage and return its size in bytes.
    ///
    /// Falls back to copy and delete when the working directory is on a
    /// different filesystem.
    pub async fn store_artifact(&self, tmp: &Path, id: &str) -> io::Result<u64> {
        let dest = self.artifact_path(id);
        if let Err(e) = tokio::fs::rename(tmp, &dest).await {
            tracing::debug!(error = %e, path = %tmp.display(), "Rename failed, copying artifact");
            tokio::fs::copy(tmp, &dest).await?;
            tokio::fs::remove_file(tmp).await?;
        }
        Ok(tokio::fs::metadata(&dest).await?.len())
    }

    /// Open the completion record for `id`, if there is one.
    pub async fn open_record(&self, id: &str) -> io::Result<Option<tokio::fs::File>> {
        match tokio::fs::File::open(self.record_path(id)).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Best-effort removal of everything a failed task may have stored.
    pub async fn discard(&self, id: &str) {
        remove_if_present(&self.artifact_path(id)).await;
        remove_if_present(&self.submission_path(id)).await;
        remove_if_present(&self.files_dir.join(format!("{id}.tmp"))).await;
    }

    pub async fn has_record(&self, id: &str) -> bool {
        tokio::fs::try_exists(self.record_path(id))
            .await
            .unwrap_or(false)
    }
}

/// Remove `path`, logging anything other than it already being gone.
pub(crate) async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}
