//! Router fixture backed by a live controller and scripted devices.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use crate::api::{router, AppState};
use crate::config::LoggingConfig;
use crate::recorder::testing::{test_config, CountingBackend, RecordingGateway};
use crate::recorder::{
    ControllerHandle, FileWriter, MembershipMonitor, RecorderController, RecorderStatusHandle,
    RecordingSession, SessionOptions,
};

pub struct TestApp {
    pub router: Router,
    pub handle: ControllerHandle,
    pub task: JoinHandle<()>,
    pub gateway: Arc<RecordingGateway>,
    pub dir: TempDir,
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(RecordingGateway::default());
    let (session, events) = RecordingSession::new(
        Arc::new(CountingBackend::default()),
        gateway.clone(),
        gateway.clone(),
        FileWriter::new(dir.path().join("recordings"), "test"),
        SessionOptions::new(test_config(), 3),
    );
    let status = RecorderStatusHandle::default();
    let controller = RecorderController::new(session, MembershipMonitor::new(3), status.clone());
    let (handle, task) = controller.spawn(events);

    let state = AppState {
        controller: handle.clone(),
        status,
        notifier: gateway.clone(),
        command_prefix: "!".to_string(),
        recordings_dir: dir.path().join("recordings"),
        logging: LoggingConfig {
            dir: dir.path().join("logs").to_string_lossy().to_string(),
            file_name: "bot.log".to_string(),
        },
    };

    TestApp {
        router: router(state),
        handle,
        task,
        gateway,
        dir,
    }
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
