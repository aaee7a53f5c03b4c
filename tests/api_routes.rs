//! Router-level tests against an in-memory runtime without remote sync

use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use focus_session::{
    create_router,
    services::{audio::AudioStream, AudioPort},
    state::{FileStorage, MemoryStorage, Storage},
    Collaborators, Result, Runtime, RuntimeOptions,
};

/// Audio port that never plays anything
struct SilentAudio;

struct SilentStream;

impl AudioStream for SilentStream {
    fn stop(&mut self) {}
}

impl AudioPort for SilentAudio {
    fn play_loop(&self, _asset: &Path, _volume: f32) -> Result<Box<dyn AudioStream>> {
        Ok(Box::new(SilentStream))
    }

    fn play_once(&self, _asset: &Path, _volume: f32) -> Result<()> {
        Ok(())
    }
}

fn launch(storage: Arc<dyn Storage>) -> (Runtime, Router) {
    let runtime = Runtime::launch(
        Collaborators {
            storage,
            audio: Arc::new(SilentAudio),
            sessions: None,
            blocks: None,
        },
        RuntimeOptions::default(),
    );
    let app = create_router(runtime.state());
    (runtime, app)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn health_reports_ok() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    runtime.shutdown().await;
}

#[tokio::test]
async fn fresh_timer_is_idle_focus() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));
    let (status, body) = send(&app, "GET", "/timer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "focus");
    assert_eq!(body["remainingSeconds"], 1500);
    assert_eq!(body["isRunning"], false);
    assert_eq!(body["cyclesCompleted"], 0);

    let (_, widget) = send(&app, "GET", "/widget", None).await;
    assert_eq!(widget["display"], "25:00");
    assert_eq!(widget["remoteSessionActive"], false);
    runtime.shutdown().await;
}

#[tokio::test]
async fn start_pause_and_invalid_transitions() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));

    let (status, body) = send(&app, "POST", "/timer/pause", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, body) = send(&app, "POST", "/timer/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["type"], "started");
    assert_eq!(body["timer"]["isRunning"], true);

    let (status, body) = send(&app, "POST", "/timer/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["type"], "paused");
    assert_eq!(body["timer"]["isRunning"], false);

    let (_, body) = send(&app, "GET", "/status", None).await;
    assert_eq!(body["last_action"], "pause");
    assert_eq!(body["ticking"], false);
    runtime.shutdown().await;
}

#[tokio::test]
async fn start_accepts_time_block() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));
    let (status, body) = send(
        &app,
        "POST",
        "/timer/start",
        Some(json!({"blockId": "block-7"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["blockId"], "block-7");
    runtime.shutdown().await;
}

#[tokio::test]
async fn skip_moves_to_break_without_counting_a_cycle() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));
    send(&app, "POST", "/timer/start", None).await;
    let (status, body) = send(&app, "POST", "/timer/skip", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["type"], "cancelled");
    assert_eq!(body["event"]["skipped"], true);
    assert_eq!(body["timer"]["mode"], "break");
    assert_eq!(body["timer"]["cyclesCompleted"], 0);

    let (_, body) = send(&app, "POST", "/timer/reset", None).await;
    assert_eq!(body["timer"]["mode"], "focus");
    assert_eq!(body["timer"]["remainingSeconds"], 1500);
    runtime.shutdown().await;
}

#[tokio::test]
async fn settings_round_trip_and_reach_the_timer() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));

    let (status, body) = send(&app, "GET", "/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"focus": 25, "break": 5, "long_break": 15}));

    let (status, body) = send(
        &app,
        "PUT",
        "/settings",
        Some(json!({"focus": 50, "break": 10, "long_break": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["focus"], 50);
    settle().await;

    let (_, timer) = send(&app, "GET", "/timer", None).await;
    assert_eq!(timer["remainingSeconds"], 3000);

    let (status, _) = send(
        &app,
        "PUT",
        "/settings",
        Some(json!({"focus": 0, "break": 10, "long_break": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = send(&app, "GET", "/settings", None).await;
    assert_eq!(body["focus"], 50);

    let (status, body) = send(&app, "DELETE", "/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["focus"], 25);
    runtime.shutdown().await;
}

#[tokio::test]
async fn preferences_drive_widget_dark_mode() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));
    let (_, body) = send(&app, "GET", "/preferences", None).await;
    assert_eq!(body, json!({"timerSounds": true, "darkMode": false}));

    send(
        &app,
        "PUT",
        "/preferences",
        Some(json!({"timerSounds": false, "darkMode": true})),
    )
    .await;

    let (_, widget) = send(&app, "GET", "/widget", None).await;
    assert_eq!(widget["darkMode"], false);

    send(&app, "POST", "/timer/start", None).await;
    let (_, widget) = send(&app, "GET", "/widget", None).await;
    assert_eq!(widget["darkMode"], true);
    assert_eq!(widget["isRunning"], true);
    runtime.shutdown().await;
}

#[tokio::test]
async fn ambient_selection_accepts_unknown_ids() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));

    let (_, body) = send(&app, "PUT", "/ambient", Some(json!({"preset": "rain"}))).await;
    assert_eq!(body["preset"], "rain");
    assert_eq!(body["known"], true);
    assert_eq!(body["available"].as_array().unwrap().len(), 6);

    let (_, body) = send(&app, "PUT", "/ambient", Some(json!({"preset": "thunder"}))).await;
    assert_eq!(body["preset"], "thunder");
    assert_eq!(body["known"], false);

    let (_, body) = send(&app, "DELETE", "/ambient", None).await;
    assert_eq!(body["preset"], Value::Null);
    runtime.shutdown().await;
}

#[tokio::test]
async fn title_follows_the_running_countdown() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));
    send(&app, "PUT", "/title", Some(json!({"title": "Courses"}))).await;

    send(&app, "POST", "/timer/start", None).await;
    settle().await;
    let (_, body) = send(&app, "GET", "/title", None).await;
    assert_eq!(body["title"], "25:00 — StudyDash");

    send(&app, "POST", "/timer/pause", None).await;
    settle().await;
    let (_, body) = send(&app, "GET", "/title", None).await;
    assert_eq!(body["title"], "Courses");
    runtime.shutdown().await;
}

#[tokio::test]
async fn remote_endpoints_without_service() {
    let (runtime, app) = launch(Arc::new(MemoryStorage::new()));
    let (status, body) = send(&app, "GET", "/sessions/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"], Value::Null);

    let (status, _) = send(&app, "GET", "/sessions/today", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    runtime.shutdown().await;
}

#[tokio::test]
async fn settings_persist_across_runtimes() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (runtime, app) = launch(Arc::new(FileStorage::open(dir.path()).unwrap()));
        send(
            &app,
            "PUT",
            "/settings",
            Some(json!({"focus": 40, "break": 8, "long_break": 20})),
        )
        .await;
        runtime.shutdown().await;
    }

    let (runtime, app) = launch(Arc::new(FileStorage::open(dir.path()).unwrap()));
    let (_, timer) = send(&app, "GET", "/timer", None).await;
    assert_eq!(timer["remainingSeconds"], 2400);
    runtime.shutdown().await;
}
