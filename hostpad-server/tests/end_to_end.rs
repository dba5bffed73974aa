use std::{fs, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum_test::TestServer;
use hostpad_core::{
    AccessGate, ActionRunner, AllowedOrigins, MessageSanitizer, Renderer,
    RendererError, ShoutMessage, ShoutQueue, ShoutService, ShutdownOutcome,
};
use hostpad_server::{create_app, infra::app_state::AppState};
use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;

/// Renderer that records what it was asked to show.
#[derive(Default)]
struct RecordingRenderer {
    shown: Mutex<Vec<String>>,
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, message: &ShoutMessage) -> Result<(), RendererError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.shown.lock().push(message.text().to_string());
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shouts_over_real_http_are_rendered_in_order() -> Result<()> {
    let dir = TempDir::new()?;
    fs::create_dir_all(dir.path().join("stream"))?;
    fs::write(dir.path().join("stream/index.html"), "<h1>pad</h1>")?;

    let queue = Arc::new(ShoutQueue::new());
    let renderer = Arc::new(RecordingRenderer::default());
    let service = ShoutService::start(Arc::clone(&queue), renderer.clone());

    let state = AppState::new(
        AccessGate::new(AllowedOrigins::lan_defaults()),
        MessageSanitizer::default(),
        Arc::clone(&queue),
        ActionRunner::new(dir.path().join("hostcontrol")),
        dir.path().join("stream"),
    );
    let make_service =
        create_app(state).into_make_service_with_connect_info::<SocketAddr>();
    let server = TestServer::builder()
        .http_transport()
        .build(make_service)
        .map_err(|err| anyhow!(err.to_string()))?;

    for text in ["one", "two", ".three", "four"] {
        let response = server.post("/shout").json(&json!({ "message": text })).await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    let rejected = server.post("/shout").json(&json!({ "message": "  " })).await;
    rejected.assert_status_bad_request();

    server.post("/right").await.assert_text("OK");
    server.get("/").await.assert_text("<h1>pad</h1>");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while renderer.shown.lock().len() < 4 {
        assert!(tokio::time::Instant::now() < deadline, "renderer never caught up");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*renderer.shown.lock(), ["ONE", "TWO", "three", "FOUR"]);

    let outcome = service.stop(Duration::from_secs(1)).await;
    assert!(matches!(outcome, ShutdownOutcome::Stopped { dropped: 0, .. }));
    Ok(())
}
