#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use manimatic_app_core::{BackendPort, ClientSettings, EventStream, SessionOrchestrator};
use manimatic_core::{
    encode_event, CompileFailure, CompileRequest, CompileSuccess, EventPayload, Feature,
    FeaturesResponse, GenerateFailure, GenerateRequest, GenerateSuccess, ModelsResponse,
    ServerEvent, USER_COMPILE,
};
use manimatic_infra::TransportError;
use tokio::sync::mpsc;

pub const SESSION: &str = "session-a";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe,
    Generate(GenerateRequest),
    Compile(CompileRequest),
}

/// In-process backend. Events are fed through [`FakeHandle::push`].
pub struct FakeBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<Result<String, TransportError>>>>,
    compile_enabled: bool,
    probe_fails: bool,
    features_fail: bool,
    generate_fails: bool,
    compile_fails: bool,
}

pub struct FakeHandle {
    calls: Arc<Mutex<Vec<Call>>>,
    events: mpsc::UnboundedSender<Result<String, TransportError>>,
}

impl FakeBackend {
    pub fn new() -> (Self, FakeHandle) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = Self {
            calls: calls.clone(),
            events: Mutex::new(Some(rx)),
            compile_enabled: true,
            probe_fails: false,
            features_fail: false,
            generate_fails: false,
            compile_fails: false,
        };
        (backend, FakeHandle { calls, events: tx })
    }

    pub fn compile_enabled(mut self, on: bool) -> Self {
        self.compile_enabled = on;
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub fn failing_features(mut self) -> Self {
        self.features_fail = true;
        self
    }

    pub fn failing_generate(mut self) -> Self {
        self.generate_fails = true;
        self
    }

    pub fn failing_compile(mut self) -> Self {
        self.compile_fails = true;
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unavailable(endpoint: &str) -> TransportError {
    TransportError::Status {
        endpoint: endpoint.into(),
        status: 503,
    }
}

#[async_trait::async_trait]
impl BackendPort for FakeBackend {
    async fn probe(&self) -> Result<(), TransportError> {
        self.record(Call::Probe);
        if self.probe_fails {
            return Err(unavailable("healthz"));
        }
        Ok(())
    }

    async fn fetch_features(&self) -> Result<FeaturesResponse, TransportError> {
        if self.features_fail {
            return Err(unavailable("features"));
        }
        Ok(FeaturesResponse {
            version: "0.1.0".into(),
            features: vec![Feature {
                key: USER_COMPILE.into(),
                description: "Recompile edited scripts".into(),
                enabled: self.compile_enabled,
            }],
        })
    }

    async fn fetch_models(&self) -> Result<ModelsResponse, TransportError> {
        Ok(ModelsResponse {
            models: vec!["fast-v1".into(), "slow-v2".into()],
            default_model: Some("fast-v1".into()),
        })
    }

    async fn submit_generate(&self, req: &GenerateRequest) -> Result<(), TransportError> {
        self.record(Call::Generate(req.clone()));
        if self.generate_fails {
            return Err(unavailable("generate"));
        }
        Ok(())
    }

    async fn submit_compile(&self, req: &CompileRequest) -> Result<(), TransportError> {
        self.record(Call::Compile(req.clone()));
        if self.compile_fails {
            return Err(unavailable("compile"));
        }
        Ok(())
    }

    async fn open_events(&self) -> Result<EventStream, TransportError> {
        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or(TransportError::Closed)?;
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}

impl FakeHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Generate(_)))
            .count()
    }

    pub fn compile_calls(&self) -> Vec<CompileRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Compile(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn push(&self, ev: ServerEvent) {
        self.push_raw(&encode_event(&ev).unwrap());
    }

    pub fn push_raw(&self, data: &str) {
        self.events.send(Ok(data.to_string())).unwrap();
    }

    pub fn fail_stream(&self) {
        self.events
            .send(Err(TransportError::Stream("connection reset".into())))
            .unwrap();
    }
}

pub fn settings() -> ClientSettings {
    ClientSettings::default()
}

pub async fn mounted(backend: FakeBackend) -> SessionOrchestrator<FakeBackend> {
    let mut orch = SessionOrchestrator::new(backend, settings());
    orch.mount().await.unwrap();
    orch
}

/// Generate `script` and let the chained render finish, leaving the session
/// in `VideoReady` with the compile stage free.
pub async fn generated_and_rendered(
    orch: &mut SessionOrchestrator<FakeBackend>,
    handle: &FakeHandle,
    script: &str,
) {
    orch.set_prompt("p");
    orch.generate().await.unwrap();
    handle.push(script_ok(SESSION, script));
    orch.process_next().await;
    handle.push(video_ok(SESSION, CHAINED_VIDEO));
    orch.process_next().await;
}

pub const CHAINED_VIDEO: &str = "/videos/chained.mp4";

pub fn script_ok(session: &str, script: &str) -> ServerEvent {
    ServerEvent::new(
        session,
        EventPayload::GenerateSucceeded(GenerateSuccess {
            script: script.into(),
        }),
    )
}

pub fn script_failed(session: &str, message: &str) -> ServerEvent {
    ServerEvent::new(
        session,
        EventPayload::GenerateFailed(GenerateFailure {
            message: message.into(),
            details: None,
            model: "fast-v1".into(),
        }),
    )
}

pub fn video_ok(session: &str, url: &str) -> ServerEvent {
    ServerEvent::new(
        session,
        EventPayload::CompileSucceeded(CompileSuccess {
            video_url: url.into(),
        }),
    )
}

pub fn video_failed(session: &str, message: &str, stderr: &str, line: Option<u32>) -> ServerEvent {
    ServerEvent::new(
        session,
        EventPayload::CompileFailed(CompileFailure {
            message: message.into(),
            stdout: String::new(),
            stderr: stderr.into(),
            line,
        }),
    )
}
