#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use maptoposter_artifacts::{ArtifactStore, CleanupScheduler, DEFAULT_TTL};
use maptoposter_backend::build_router;
use maptoposter_backend::state::AppState;
use maptoposter_job_queue::{JobQueueClient, JobQueueError, ProgressReporter};
use maptoposter_render::{DirectoryThemes, ThemeProvider};
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nposter-bytes";

/// Blocks the stub pipeline until opened. Opens itself on drop so no blocking
/// task outlives a test.
#[derive(Clone, Default)]
pub struct Gate(Arc<AtomicBool>);

impl Gate {
    pub fn open(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn wait(&self) {
        while !self.0.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: ArtifactStore,
    pub gate: Gate,
    shutdown: CancellationToken,
    _themes: TempDir,
    _out: TempDir,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.gate.open();
        self.shutdown.cancel();
    }
}

/// Router over a stub pipeline. The stub writes [`FAKE_PNG`] through the real
/// artifact store, and fails for the city "Atlantis".
pub fn test_app(gate_open: bool) -> TestApp {
    build_test_app(gate_open, false)
}

/// Like [`test_app`], with the cleanup scheduler running. Its interval is an
/// hour, so sweeps after startup only happen on request.
pub fn test_app_with_cleanup(gate_open: bool) -> TestApp {
    build_test_app(gate_open, true)
}

fn build_test_app(gate_open: bool, run_cleanup: bool) -> TestApp {
    let themes_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        themes_dir.path().join("feature_based.json"),
        r##"{"name": "Feature Based", "description": "Roads by class", "bg": "#FFFFFF"}"##,
    )
    .unwrap();
    std::fs::write(
        themes_dir.path().join("noir.json"),
        r##"{"name": "Noir", "bg": "#000000", "text": "#FFFFFF"}"##,
    )
    .unwrap();

    let out = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(out.path()).unwrap();

    let gate = Gate::default();
    if gate_open {
        gate.open();
    }

    let pipeline_store = store.clone();
    let pipeline_gate = gate.clone();
    let pipeline = move |request: &Value, progress: &ProgressReporter| -> Result<PathBuf, JobQueueError> {
        progress.report(10, "Geocoding location...");
        pipeline_gate.wait();
        let city = request["city"].as_str().unwrap_or_default();
        if city == "Atlantis" {
            return Err(JobQueueError::ExecutionFailed(format!(
                "could not find coordinates for {city}"
            )));
        }
        progress.report(90, "Saving poster...");
        let name = format!("{}_{}.png", city.to_lowercase(), progress.job_id().simple());
        pipeline_store
            .write(&name, FAKE_PNG)
            .map_err(|e| JobQueueError::ExecutionFailed(e.to_string()))
    };

    let themes: Arc<dyn ThemeProvider> = Arc::new(DirectoryThemes::new(themes_dir.path()));
    let scheduler =
        CleanupScheduler::new(store.clone(), DEFAULT_TTL).with_interval(Duration::from_secs(3600));
    let cleanup = scheduler.trigger();
    let shutdown = CancellationToken::new();
    if run_cleanup {
        tokio::spawn(scheduler.run(shutdown.clone()));
    }
    let state = Arc::new(AppState::new(
        JobQueueClient::new(Arc::new(pipeline)),
        store.clone(),
        themes,
        cleanup,
    ));

    TestApp {
        router: build_router(state.clone()),
        state,
        store,
        gate,
        shutdown,
        _themes: themes_dir,
        _out: out,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> TestResponse {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

/// Poll the status endpoint until the job reaches a terminal state.
pub async fn wait_for_terminal(router: &Router, job_id: &str) -> Value {
    for _ in 0..500 {
        let res = get(router, &format!("/api/job/{job_id}")).await;
        assert_eq!(res.status, StatusCode::OK);
        let payload = res.json();
        if payload["status"] == "completed" || payload["status"] == "failed" {
            return payload;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

/// Write a png straight into the artifact directory and backdate its mtime.
pub fn write_aged_artifact(store: &ArtifactStore, name: &str, age: Duration) -> PathBuf {
    let path = store.root().join(name);
    std::fs::write(&path, FAKE_PNG).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(std::time::SystemTime::now() - age)
        .unwrap();
    path
}

/// Poll until `path` no longer exists.
pub async fn wait_removed(path: &std::path::Path) {
    for _ in 0..500 {
        if !path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} was never removed", path.display());
}
