use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use camino::Utf8PathBuf;
use manimatic_app_core::{ClientSettings, SessionFilter, SettingsStore};
use manimatic_cli::commands::{self, CompileOptions, GenerateOptions};
use manimatic_cli::ConfigKey;
use tempfile::tempdir;
use tokio::sync::mpsc;

const SCRIPT: &str = "from manim import *\n\nclass Ball(Scene):\n    def construct(self):\n        self.play(Create(Circle()))\n";

fn frame(kind: &str, data: &str) -> String {
    format!("data: {{\"kind\":\"{kind}\",\"sessionId\":\"e2e\",\"data\":{data}}}\n\n")
}

type Slot = Arc<Mutex<Option<mpsc::UnboundedReceiver<String>>>>;

/// Backend stand-in: `/generate` answers with a script and a chained render,
/// `/compile` with a compile failure pointing at line 3.
async fn start_mock_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let slot: Slot = Arc::new(Mutex::new(Some(rx)));

    let app = Router::new()
        .route("/api/healthz", get(|| async { StatusCode::OK }))
        .route(
            "/api/features",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"version":"0.2.0","features":[{"key":"user-compile","description":"Recompile","enabled":true}]}"#,
                )
            }),
        )
        .route(
            "/api/models",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"models":["fast-v1","slow-v2"],"default_model":"fast-v1"}"#,
                )
            }),
        )
        .route(
            "/api/generate",
            post({
                let tx = tx.clone();
                move || {
                    let tx = tx.clone();
                    async move {
                        let script = serde_json::to_string(SCRIPT).unwrap();
                        tx.send(frame("generate_succeeded", &format!("{{\"script\":{script}}}")))
                            .unwrap();
                        tx.send(frame(
                            "compile_succeeded",
                            r#"{"video_url":"/videos/ball.mp4"}"#,
                        ))
                        .unwrap();
                        StatusCode::ACCEPTED
                    }
                }
            }),
        )
        .route(
            "/api/compile",
            post({
                let tx = tx.clone();
                move || {
                    let tx = tx.clone();
                    async move {
                        tx.send(frame(
                            "compile_failed",
                            r#"{"message":"NameError: name 'Circel' is not defined","stdout":"","stderr":"Traceback","line":3}"#,
                        ))
                        .unwrap();
                        StatusCode::ACCEPTED
                    }
                }
            }),
        )
        .route(
            "/api/events",
            get({
                let slot = slot.clone();
                move || {
                    let slot = slot.clone();
                    async move {
                        let rx = slot.lock().unwrap().take().unwrap();
                        let body = futures::stream::unfold(rx, |mut rx| async move {
                            rx.recv().await.map(|s| (Ok::<_, Infallible>(s), rx))
                        });
                        (
                            [(header::CONTENT_TYPE, "text/event-stream")],
                            Body::from_stream(body),
                        )
                    }
                }
            }),
        )
        .route(
            "/videos/ball.mp4",
            get(|| async { Body::from(vec![0u8; 2048]) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, handle)
}

fn settings_for(addr: SocketAddr) -> ClientSettings {
    ClientSettings {
        api_base_url: format!("http://{addr}/api"),
        ..ClientSettings::default()
    }
}

#[tokio::test]
async fn generate_waits_for_render_and_downloads() {
    let (addr, server_handle) = start_mock_server().await;
    let settings = settings_for(addr);

    let work_dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(work_dir.path().to_path_buf()).unwrap();

    let features = commands::cmd_features(&settings).await.unwrap();
    assert!(features.features[0].enabled);
    let models = commands::cmd_models(&settings).await.unwrap();
    assert_eq!(models.preferred(), Some("fast-v1"));

    let opts = GenerateOptions {
        script_out: Some(root.join("ball.py")),
        download: Some(root.join("out/ball.mp4")),
        ..GenerateOptions::new("draw a bouncing ball")
    };
    let outcome = commands::cmd_generate(&settings, opts)
        .await
        .expect("generate failed");

    assert_eq!(outcome.script.as_deref(), Some(SCRIPT));
    assert_eq!(
        std::fs::read_to_string(root.join("ball.py")).unwrap(),
        SCRIPT
    );
    assert_eq!(
        outcome.video_url.as_deref(),
        Some(format!("http://{addr}/videos/ball.mp4").as_str())
    );
    assert_eq!(outcome.downloaded_bytes, Some(2048));
    assert_eq!(std::fs::metadata(root.join("out/ball.mp4")).unwrap().len(), 2048);

    server_handle.abort();
}

#[tokio::test]
async fn compile_failure_reports_diagnostics() {
    let (addr, server_handle) = start_mock_server().await;
    let settings = settings_for(addr);

    let work_dir = tempdir().unwrap();
    let script = Utf8PathBuf::from_path_buf(work_dir.path().join("scene.py")).unwrap();
    std::fs::write(&script, "self.play(Create(Circel()))\n").unwrap();

    let err = commands::cmd_compile(&settings, &script, CompileOptions::default())
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("Compilation Error at Line 3"), "{err}");
    assert!(err.contains("NameError"), "{err}");
    assert!(err.contains("--- Standard Error ---"), "{err}");
    assert!(!err.contains("--- Standard Output ---"), "{err}");

    server_handle.abort();
}

#[tokio::test]
async fn health_fails_for_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = commands::cmd_health(&settings_for(addr)).await.unwrap_err();
    assert!(err.to_string().contains("Health check failed"));
}

#[test]
fn config_set_persists_settings() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::at(dir.path());

    commands::cmd_config_set(&store, ConfigKey::ApiBaseUrl, "http://render.local:9000/api")
        .unwrap();
    commands::cmd_config_set(&store, ConfigKey::GenerationTimeoutMs, "5").unwrap();
    commands::cmd_config_set(&store, ConfigKey::SessionFilter, "off").unwrap();
    assert!(commands::cmd_config_set(&store, ConfigKey::ApiBaseUrl, "not a url").is_err());
    assert!(commands::cmd_config_set(&store, ConfigKey::NoticeTtlMs, "soon").is_err());

    let settings = commands::cmd_config_show(&store).unwrap();
    assert_eq!(settings.api_base_url, "http://render.local:9000/api");
    assert_eq!(
        settings.generation_timeout_ms,
        manimatic_config::MIN_GENERATION_TIMEOUT_MS
    );
    assert_eq!(settings.session_filter, SessionFilter::Off);
}
