#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use sliceosm_core::density::DensityRaster;
use sliceosm_core::region::JobRequest;
use sliceosm_core::tool::ExtractTool;
use sliceosm_worker::outcome::OutcomeReceiver;
use sliceosm_worker::{
    outcome_channel, Dispatcher, JobOutcome, ProgressRegistry, ResultStore, TaskQueue,
    TaskReceiver, WorkerConfig, WorkerPool,
};
use tempfile::TempDir;

/// Extraction tool stand-in. The dataset file name selects the behaviour:
/// `ok`, `fail` (exits 3), `garbage` (unparsable progress), `slow`
/// (waits for `<dataset>.release` to appear) or `unlink` (succeeds but
/// deletes its region file, so the job fails after the artifact is stored).
const FAKE_TOOL: &str = r#"#!/bin/sh
mode=$(basename "$2")
case "$1" in
query) echo 2026-10-19T08:30:00Z ;;
extract)
  case "$mode" in
    fail) echo '{"CellsTotal":2,"CellsProg":1}'; exit 3 ;;
    garbage) echo 'working...'; sleep 5; exit 0 ;;
    slow) while [ ! -e "$2.release" ]; do sleep 0.05; done ;;
  esac
  echo '{"CellsTotal":2,"CellsProg":1,"NodesTotal":10}'
  echo '{"CellsTotal":2,"CellsProg":2,"NodesTotal":10}'
  cat "$6" > "$3"
  if [ "$mode" = unlink ]; then rm -f "$6"; fi
  ;;
*) exit 9 ;;
esac
"#;

pub fn fake_tool() -> &'static Path {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("sliceosm-worker-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("osmx");
        std::fs::write(&path, FAKE_TOOL).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    })
}

/// A dispatcher wired to a worker pool, all inside one scratch directory.
pub struct Harness {
    pub dir: TempDir,
    pub dataset: PathBuf,
    pub files_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub dispatcher: Dispatcher,
    pub registry: Arc<ProgressRegistry>,
    pub store: Arc<ResultStore>,
    pub outcomes: OutcomeReceiver,
    pub pool: Option<WorkerPool>,
    /// Keeps the queue open when no pool is running.
    idle_receiver: Option<TaskReceiver>,
}

pub struct Options {
    pub mode: &'static str,
    /// `0` leaves the queue without consumers.
    pub workers: usize,
    pub capacity: usize,
    pub nodes_limit: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: "ok",
            workers: 1,
            capacity: 8,
            nodes_limit: u64::MAX,
        }
    }
}

/// 4x4 raster with 1000 elements in every cell.
pub fn uniform_raster() -> DensityRaster {
    DensityRaster::from_counts(4, vec![1000; 16]).unwrap()
}

pub fn harness(options: Options) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join(options.mode);
    let files_dir = dir.path().join("files");
    let tmp_dir = dir.path().join("tmp");
    std::fs::create_dir_all(&files_dir).unwrap();
    std::fs::create_dir_all(&tmp_dir).unwrap();

    let registry = Arc::new(ProgressRegistry::new());
    let store = Arc::new(ResultStore::new(&files_dir));
    let (queue, receiver) = TaskQueue::bounded(options.capacity);
    let (outcome_tx, outcomes) = outcome_channel();

    let dispatcher = Dispatcher::new(
        Arc::new(uniform_raster()),
        options.nodes_limit,
        queue,
        Arc::clone(&registry),
        Arc::clone(&store),
    );

    let (pool, idle_receiver) = if options.workers > 0 {
        let pool = WorkerPool::start(
            WorkerConfig {
                workers: options.workers,
                tmp_dir: tmp_dir.clone(),
            },
            receiver,
            Arc::clone(&registry),
            Arc::clone(&store),
            ExtractTool::new(fake_tool(), &dataset),
            outcome_tx,
        );
        (Some(pool), None)
    } else {
        (None, Some(receiver))
    };

    Harness {
        dir,
        dataset,
        files_dir,
        tmp_dir,
        dispatcher,
        registry,
        store,
        outcomes,
        pool,
        idle_receiver,
    }
}

impl Harness {
    /// Let `slow` extractions finish.
    pub fn release(&self) {
        let mut path = self.dataset.as_os_str().to_owned();
        path.push(".release");
        std::fs::write(PathBuf::from(path), "").unwrap();
    }

    pub async fn next_outcome(&mut self) -> JobOutcome {
        tokio::time::timeout(Duration::from_secs(10), self.outcomes.recv())
            .await
            .expect("no outcome within 10s")
            .expect("outcome channel closed")
    }

    /// Wait until every queued task has been picked up by a worker.
    pub async fn wait_for_empty_queue(&self) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.dispatcher.queue_len() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("queue was not drained");
    }

    pub fn tmp_entries(&self) -> Vec<String> {
        std::fs::read_dir(&self.tmp_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

pub fn bbox_request(name: &str) -> JobRequest {
    JobRequest {
        name: name.to_string(),
        region_type: "bbox".to_string(),
        region_data: serde_json::json!([0, 0, 1, 1]),
    }
}

pub fn world_request() -> JobRequest {
    JobRequest {
        name: "world".to_string(),
        region_type: "bbox".to_string(),
        region_data: serde_json::json!([-80, -170, 80, 170]),
    }
}
