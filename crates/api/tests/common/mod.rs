#![allow(dead_code)]

use std::io::Cursor;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sliceosm_core::density::DensityRaster;
use sliceosm_core::freshness::FreshnessCache;
use sliceosm_core::tool::ExtractTool;
use sliceosm_worker::{
    outcome_channel, Dispatcher, ProgressRegistry, ResultStore, TaskQueue, TaskReceiver,
    WorkerConfig, WorkerPool,
};
use tempfile::TempDir;
use tower::ServiceExt;

use sliceosm_api::config::ServerConfig;
use sliceosm_api::router::build_app_router;
use sliceosm_api::state::AppState;

/// Extraction tool stand-in; the dataset file name selects the behaviour.
///
/// `query`: `stale` answers a 2001 timestamp, `broken` fails, anything else
/// answers the current time. `extract`: `slow` waits for
/// `<dataset>.release`, anything else finishes immediately.
const FAKE_TOOL: &str = r#"#!/bin/sh
mode=$(basename "$2")
case "$1" in
query)
  case "$mode" in
    broken) exit 1 ;;
    stale) echo 2001-01-01T00:00:00Z ;;
    *) date -u +%Y-%m-%dT%H:%M:%SZ ;;
  esac
  ;;
extract)
  if [ "$mode" = slow ]; then
    while [ ! -e "$2.release" ]; do sleep 0.05; done
  fi
  echo '{"CellsTotal":1,"CellsProg":1}'
  cat "$6" > "$3"
  ;;
*) exit 9 ;;
esac
"#;

fn fake_tool() -> &'static Path {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("sliceosm-api-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("osmx");
        std::fs::write(&path, FAKE_TOOL).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    })
}

/// 4x4 PNG with 1000 (red 3, green 232) in every cell.
pub fn raster_png() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(4, 4, image::Rgb([3, 232, 0]));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

pub struct TestOptions {
    pub mode: &'static str,
    /// `0` leaves the queue without consumers.
    pub workers: usize,
    pub queue_capacity: usize,
    pub nodes_limit: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            mode: "ok",
            workers: 1,
            queue_capacity: 8,
            nodes_limit: 100_000_000,
        }
    }
}

/// Everything a test needs to drive the app and inspect its side effects.
pub struct TestApp {
    pub app: Router,
    pub dir: TempDir,
    pub dataset: PathBuf,
    pub files_dir: PathBuf,
    pub pool: Option<WorkerPool>,
    idle_receiver: Option<TaskReceiver>,
}

impl TestApp {
    pub fn release(&self) {
        let mut path = self.dataset.as_os_str().to_owned();
        path.push(".release");
        std::fs::write(PathBuf::from(path), "").unwrap();
    }
}

pub fn test_config(dir: &Path, options: &TestOptions) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        files_dir: dir.join("files"),
        dataset: dir.join(options.mode),
        osmx_exec: fake_tool().to_path_buf(),
        tmp_dir: dir.join("tmp"),
        nodes_limit: options.nodes_limit,
        density_raster: dir.join("nodes.png"),
        worker_count: options.workers,
        queue_capacity: options.queue_capacity,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 1,
    }
}

/// Build the full application router, wired the same way `main.rs` does it.
pub fn build_test_app(options: TestOptions) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &options);
    std::fs::create_dir_all(&config.files_dir).unwrap();
    std::fs::create_dir_all(&config.tmp_dir).unwrap();

    let png = raster_png();
    let raster = DensityRaster::from_png(&png).unwrap();
    let tool = ExtractTool::new(&config.osmx_exec, &config.dataset);
    let registry = Arc::new(ProgressRegistry::new());
    let store = Arc::new(ResultStore::new(&config.files_dir));
    let (queue, receiver) = TaskQueue::bounded(config.queue_capacity);
    let (outcome_tx, outcome_rx) = outcome_channel();
    tokio::spawn(sliceosm_worker::report_outcomes(outcome_rx));

    let (pool, idle_receiver) = if options.workers > 0 {
        let pool = WorkerPool::start(
            WorkerConfig {
                workers: options.workers,
                tmp_dir: config.tmp_dir.clone(),
            },
            receiver,
            Arc::clone(&registry),
            Arc::clone(&store),
            tool.clone(),
            outcome_tx,
        );
        (Some(pool), None)
    } else {
        (None, Some(receiver))
    };

    let state = AppState {
        dispatcher: Dispatcher::new(
            Arc::new(raster),
            config.nodes_limit,
            queue,
            registry,
            store,
        ),
        freshness: Arc::new(FreshnessCache::new(tool)),
        raster_png: Bytes::from(png),
    };

    TestApp {
        app: build_app_router(state, &config),
        dataset: config.dataset.clone(),
        files_dir: config.files_dir.clone(),
        dir,
        pool,
        idle_receiver,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(
        app,
        Request::get(uri)
            .header("origin", "http://example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> Response<Body> {
    send(
        app,
        Request::post(uri)
            .header("origin", "http://example.com")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll `GET /api/{id}` until the task reports completion.
pub async fn wait_for_completion(app: &Router, id: &str) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let response = get(app, &format!("/api/{id}")).await;
            if response.status().is_success() {
                let json = body_json(response).await;
                if json["Complete"] == true {
                    return json;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("task did not complete within 10s")
}
