use std::time::{Duration, Instant};

use manimatic_core::{CompileDiagnostics, ErrorKind, ErrorRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::FeatureGate;

/// Identifies one triggering action (a generate or a compile).
pub type ActionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Script,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    AwaitingScript,
    ScriptReady,
    AwaitingVideo,
    VideoReady,
    Errored(ErrorKind),
}

impl SessionPhase {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, Self::AwaitingScript | Self::AwaitingVideo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// Failed or disposed. Never reopened.
    Closed,
}

/// Transient, auto-dismissing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
    pub raised_at: Instant,
    pub ttl: Duration,
}

impl Notice {
    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) < self.ttl
    }
}

/// What `sessionId` on incoming events is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFilter {
    /// Pin the first non-empty id seen on the channel and drop events
    /// carrying a different one.
    #[default]
    Pinned,
    /// Apply every event regardless of its id.
    Off,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,

    // Inputs
    pub prompt: String,
    pub selected_model: Option<String>,
    pub models: Vec<String>,

    // Artifacts
    pub script: Option<String>,
    pub edited_script: String,
    pub video_url: Option<String>,

    pub script_status: StageStatus,
    pub video_status: StageStatus,
    /// A user-initiated compile is in flight; the script is read-only.
    pub compiling: bool,

    pub last_error: Option<ErrorRecord>,
    pub notice: Option<Notice>,
    pub notice_ttl: Duration,

    pub features: FeatureGate,
    pub channel: ChannelStatus,

    pub action_id: Option<ActionId>,
    pub session_id: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Duration::from_millis(manimatic_config::DEFAULT_NOTICE_TTL_MS))
    }
}

impl SessionState {
    pub fn new(notice_ttl: Duration) -> Self {
        Self {
            phase: SessionPhase::Idle,
            prompt: String::new(),
            selected_model: None,
            models: Vec::new(),
            script: None,
            edited_script: String::new(),
            video_url: None,
            script_status: StageStatus::Idle,
            video_status: StageStatus::Idle,
            compiling: false,
            last_error: None,
            notice: None,
            notice_ttl,
            features: FeatureGate::NotLoaded,
            channel: ChannelStatus::Disconnected,
            action_id: None,
            session_id: None,
        }
    }

    pub fn script_loading(&self) -> bool {
        self.script_status == StageStatus::Loading
    }

    pub fn video_loading(&self) -> bool {
        self.video_status == StageStatus::Loading
    }

    pub fn is_busy(&self) -> bool {
        self.script_loading() || self.video_loading()
    }

    pub fn compile_diagnostics(&self) -> Option<&CompileDiagnostics> {
        self.last_error
            .as_ref()
            .filter(|e| e.kind == ErrorKind::Compilation)
            .and_then(|e| e.diagnostics.as_ref())
    }

    pub fn visible_notice(&self, now: Instant) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| n.is_visible_at(now))
    }
}
