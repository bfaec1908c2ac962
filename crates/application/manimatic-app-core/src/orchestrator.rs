use std::sync::Arc;
use std::time::Instant;

use manimatic_core::{ErrorRecord, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app_core::reducer::{CHANNEL_FAILED_MESSAGE, PROBE_FAILED_MESSAGE};
use crate::app_core::{SessionCommand, SessionEvent, SessionStore};
use crate::channel::{ChannelError, EventChannel};
use crate::dispatcher::{
    validate_compile, validate_generate, RequestDispatcher, NO_MODEL_MESSAGE, READ_ONLY_MESSAGE,
};
use crate::domain::{ActionId, ChannelStatus, SessionFilter, SessionPhase, SessionState, Stage};
use crate::ports::BackendPort;
use crate::settings::ClientSettings;
use crate::timeout::TimeoutGuard;

/// Owns the session: every state change goes through here, in queue order.
///
/// Producers (the channel reader and the timeout guard) only post
/// [`SessionEvent`]s; nothing is applied until [`tick`](Self::tick) or
/// [`process_next`](Self::process_next) drains them.
pub struct SessionOrchestrator<B: BackendPort> {
    store: SessionStore,
    backend: Arc<B>,
    dispatcher: RequestDispatcher<B>,
    channel: EventChannel,
    guard: TimeoutGuard,
    settings: ClientSettings,

    tx: mpsc::Sender<SessionEvent>,
    rx: mpsc::Receiver<SessionEvent>,
}

impl<B: BackendPort> SessionOrchestrator<B> {
    pub fn new(backend: B, settings: ClientSettings) -> Self {
        let store = SessionStore::new(SessionState::new(settings.notice_ttl()));
        let backend = Arc::new(backend);
        let (tx, rx) = mpsc::channel(manimatic_config::EVENT_QUEUE_CAPACITY);
        Self {
            store,
            dispatcher: RequestDispatcher::new(backend.clone()),
            backend,
            channel: EventChannel::new(),
            guard: TimeoutGuard::new(tx.clone()),
            settings,
            tx,
            rx,
        }
    }

    pub fn store(&self) -> SessionStore {
        self.store.clone()
    }

    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.tx.clone()
    }

    pub async fn dispatch(&mut self, cmd: SessionCommand) -> Result<(), ErrorRecord> {
        match cmd {
            SessionCommand::Mount => self.mount().await.map_err(|e| match e {
                ChannelError::Probe(_) => ErrorRecord::transport(PROBE_FAILED_MESSAGE),
                ChannelError::Open(_) => ErrorRecord::transport(CHANNEL_FAILED_MESSAGE),
                ChannelError::AlreadyUsed => ErrorRecord::transport(e.to_string()),
            }),
            SessionCommand::Dispose => {
                self.dispose();
                Ok(())
            }
            SessionCommand::SetPrompt(p) => {
                self.set_prompt(p);
                Ok(())
            }
            SessionCommand::SelectModel(m) => self.select_model(m),
            SessionCommand::EditScript(s) => self.edit_script(s),
            SessionCommand::Generate => self.generate().await.map(|_| ()),
            SessionCommand::Compile => self.compile().await.map(|_| ()),
            SessionCommand::DismissNotice => {
                self.apply(SessionEvent::NoticeDismissed);
                Ok(())
            }
        }
    }

    /// Load the feature flags and model catalogue and open the push channel,
    /// concurrently. Feature and model failures are logged and tolerated; a
    /// channel failure is recorded in state and also returned.
    pub async fn mount(&mut self) -> Result<(), ChannelError> {
        if self.store.read(|s| s.channel != ChannelStatus::Disconnected) {
            return Err(ChannelError::AlreadyUsed);
        }
        self.apply(SessionEvent::ChannelConnecting);

        let backend = self.backend.clone();
        let (features, models, connected) = tokio::join!(
            backend.fetch_features(),
            backend.fetch_models(),
            self.channel.connect(backend.clone(), self.tx.clone()),
        );

        match features {
            Ok(f) => {
                info!(version = %f.version, "feature flags loaded");
                self.apply(SessionEvent::FeaturesLoaded(f));
            }
            Err(e) => {
                warn!("feature flags unavailable: {e}");
                self.apply(SessionEvent::FeaturesUnavailable);
            }
        }

        match models {
            Ok(m) => {
                debug!(count = m.models.len(), "model catalogue loaded");
                self.apply(SessionEvent::ModelsLoaded(m));
            }
            Err(e) => warn!("model catalogue unavailable: {e}"),
        }

        match connected {
            Ok(()) => {
                self.apply(SessionEvent::ChannelOpened);
                Ok(())
            }
            Err(e) => {
                warn!("{e}");
                let ev = match &e {
                    ChannelError::Probe(_) => SessionEvent::ProbeFailed,
                    _ => SessionEvent::ChannelFailed,
                };
                self.apply(ev);
                Err(e)
            }
        }
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.apply(SessionEvent::PromptChanged(prompt.into()));
    }

    pub fn select_model(&mut self, model: impl Into<String>) -> Result<(), ErrorRecord> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(self.reject(ErrorRecord::validation(NO_MODEL_MESSAGE)));
        }
        self.apply(SessionEvent::ModelSelected(model));
        Ok(())
    }

    /// Replace the editable script. Refused while a compile is in flight.
    pub fn edit_script(&mut self, script: impl Into<String>) -> Result<(), ErrorRecord> {
        if self.store.read(|s| s.compiling) {
            return Err(self.reject(ErrorRecord::validation(READ_ONLY_MESSAGE)));
        }
        self.apply(SessionEvent::ScriptEdited(script.into()));
        Ok(())
    }

    pub async fn generate(&mut self) -> Result<ActionId, ErrorRecord> {
        let req = match self
            .store
            .read(|s| validate_generate(&s.prompt, s.selected_model.as_deref()))
        {
            Ok(req) => req,
            Err(e) => return Err(self.reject(e)),
        };

        let action_id = uuid::Uuid::new_v4();
        info!(%action_id, "generate requested");
        self.apply(SessionEvent::GenerateDispatched { action_id });
        self.guard.arm(action_id, self.settings.generation_timeout());

        if let Err(e) = self.dispatcher.generate(&req).await {
            self.guard.disarm();
            self.apply(SessionEvent::DispatchFailed {
                action_id,
                stage: Stage::Script,
                error: e.clone(),
            });
            return Err(e);
        }
        Ok(action_id)
    }

    pub async fn compile(&mut self) -> Result<ActionId, ErrorRecord> {
        let req = match self.store.read(validate_compile) {
            Ok(req) => req,
            Err(e) => return Err(self.reject(e)),
        };

        let action_id = uuid::Uuid::new_v4();
        info!(%action_id, "compile requested");
        self.apply(SessionEvent::CompileDispatched { action_id });
        self.guard.arm(action_id, self.settings.generation_timeout());

        if let Err(e) = self.dispatcher.compile(&req).await {
            self.guard.disarm();
            self.apply(SessionEvent::DispatchFailed {
                action_id,
                stage: Stage::Video,
                error: e.clone(),
            });
            return Err(e);
        }
        Ok(action_id)
    }

    /// Apply everything currently queued, then prune an expired notice.
    pub fn tick(&mut self) {
        while let Ok(ev) = self.rx.try_recv() {
            self.handle(ev);
        }
        self.apply(SessionEvent::NoticeExpired {
            now: Instant::now(),
        });
    }

    /// Wait for the next queued event and apply it.
    pub async fn process_next(&mut self) {
        if let Some(ev) = self.rx.recv().await {
            self.handle(ev);
        }
    }

    /// Process events until `done` holds for the current state.
    ///
    /// Callers should bound this with a timeout when no action is in flight,
    /// since nothing else would wake it.
    pub async fn run_until(&mut self, done: impl Fn(&SessionState) -> bool) {
        while !self.store.read(&done) {
            self.process_next().await;
        }
    }

    /// Cancel the pending deadline and stop the channel reader. Idempotent.
    pub fn dispose(&mut self) {
        self.guard.disarm();
        self.channel.dispose();
        if self.store.read(|s| s.channel != ChannelStatus::Closed) {
            info!("session disposed");
            self.apply(SessionEvent::ChannelDisposed);
        }
    }

    fn handle(&mut self, ev: SessionEvent) {
        match &ev {
            SessionEvent::Server(server) => {
                if !self.accepts(server) {
                    return;
                }
                self.guard.disarm();
                info!(kind = server.kind().as_str(), "server event");
            }
            SessionEvent::TimedOut { action_id } => {
                if self.guard.armed_action() != Some(*action_id) {
                    debug!(%action_id, "dropping stale deadline");
                    return;
                }
                self.guard.disarm();
                warn!(%action_id, "no server event before the deadline");
            }
            SessionEvent::ChannelFailed => self.guard.disarm(),
            _ => {}
        }
        self.apply(ev);
    }

    /// Whether a server event belongs to the current session and action.
    fn accepts(&self, ev: &ServerEvent) -> bool {
        let kind = ev.kind();
        let (phase, pinned) = self.store.read(|s| (s.phase, s.session_id.clone()));

        if self.settings.session_filter == SessionFilter::Pinned {
            if let Some(pinned) = pinned {
                if !ev.session_id.is_empty() && ev.session_id != pinned {
                    debug!(
                        kind = kind.as_str(),
                        session = %ev.session_id,
                        "dropping event for another session"
                    );
                    return false;
                }
            }
        }

        let stale = match phase {
            SessionPhase::AwaitingScript => kind.is_compilation(),
            SessionPhase::AwaitingVideo => kind.is_generation(),
            _ => false,
        };
        if stale {
            debug!(kind = kind.as_str(), ?phase, "dropping event from a previous action");
        }
        !stale
    }

    fn reject(&mut self, err: ErrorRecord) -> ErrorRecord {
        debug!("rejected: {}", err.message);
        self.apply(SessionEvent::Rejected(err.clone()));
        err
    }

    fn apply(&self, ev: SessionEvent) {
        self.store.apply(ev);
    }
}

impl<B: BackendPort> Drop for SessionOrchestrator<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
