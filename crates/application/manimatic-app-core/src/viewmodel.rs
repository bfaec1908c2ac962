use std::time::Instant;

use manimatic_core::{CompileDiagnostics, ErrorKind, HIGH_QUALITY, USER_COMPILE};

use crate::dispatcher::{validate_compile, validate_generate};
use crate::domain::{ChannelStatus, SessionPhase, SessionState, StageStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticTab {
    pub label: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileErrorVm {
    pub title: String,
    pub tabs: Vec<DiagnosticTab>,
}

/// Error message first, then the captured output streams that have content.
pub fn compile_error_vm(diag: &CompileDiagnostics) -> CompileErrorVm {
    let title = match diag.line {
        Some(line) => format!("Compilation Error at Line {line}"),
        None => "Compilation Error".to_string(),
    };

    let mut tabs = vec![DiagnosticTab {
        label: "Error Message",
        content: diag.message.clone(),
    }];
    if !diag.stdout.trim().is_empty() {
        tabs.push(DiagnosticTab {
            label: "Standard Output",
            content: diag.stdout.clone(),
        });
    }
    if !diag.stderr.trim().is_empty() {
        tabs.push(DiagnosticTab {
            label: "Standard Error",
            content: diag.stderr.clone(),
        });
    }

    CompileErrorVm { title, tabs }
}

#[derive(Debug, Clone)]
pub struct StageVm {
    pub label: &'static str,
    pub status: StageStatus,
    pub detail: String,
    pub show_spinner: bool,
}

#[derive(Debug, Clone)]
pub struct NoticeVm {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SessionVm {
    pub status_label: String,
    pub connection_label: &'static str,
    pub stages: Vec<StageVm>,
    pub prompt: String,
    pub selected_model: Option<String>,
    pub models: Vec<String>,
    pub script: String,
    pub editor_read_only: bool,
    pub video_url: Option<String>,
    pub can_generate: bool,
    pub can_compile: bool,
    pub compile_feature_enabled: bool,
    pub high_quality_available: bool,
    pub notice: Option<NoticeVm>,
    pub error: Option<String>,
    pub compile_error: Option<CompileErrorVm>,
}

fn status_label(state: &SessionState) -> String {
    match state.phase {
        SessionPhase::Idle => "Ready".into(),
        SessionPhase::AwaitingScript => "Generating script…".into(),
        SessionPhase::ScriptReady if state.video_loading() => "Rendering video…".into(),
        SessionPhase::ScriptReady => "Script ready".into(),
        SessionPhase::AwaitingVideo => "Compiling…".into(),
        SessionPhase::VideoReady => "Video ready".into(),
        SessionPhase::Errored(kind) => format!("Failed ({kind})"),
    }
}

fn connection_label(status: ChannelStatus) -> &'static str {
    match status {
        ChannelStatus::Disconnected => "Not connected",
        ChannelStatus::Connecting => "Connecting…",
        ChannelStatus::Open => "Connected",
        ChannelStatus::Closed => "Disconnected",
    }
}

fn stages(state: &SessionState) -> Vec<StageVm> {
    vec![
        StageVm {
            label: "Script",
            status: state.script_status,
            detail: match state.script_status {
                StageStatus::Idle => "Waiting".into(),
                StageStatus::Loading => "Writing animation script…".into(),
                StageStatus::Ready => {
                    let lines = state.edited_script.lines().count();
                    format!("{lines} lines")
                }
                StageStatus::Errored => "Generation failed".into(),
            },
            show_spinner: state.script_loading(),
        },
        StageVm {
            label: "Video",
            status: state.video_status,
            detail: match (state.video_status, &state.video_url) {
                (StageStatus::Ready, Some(url)) => url.clone(),
                (StageStatus::Loading, _) => "Rendering…".into(),
                (StageStatus::Errored, _) => "Render failed".into(),
                _ => "Waiting".into(),
            },
            show_spinner: state.video_loading(),
        },
    ]
}

pub fn session_vm(state: &SessionState, now: Instant) -> SessionVm {
    let busy_generating = state.script_loading() || state.compiling;
    SessionVm {
        status_label: status_label(state),
        connection_label: connection_label(state.channel),
        stages: stages(state),
        prompt: state.prompt.clone(),
        selected_model: state.selected_model.clone(),
        models: state.models.clone(),
        script: state.edited_script.clone(),
        editor_read_only: state.compiling,
        video_url: state.video_url.clone(),
        can_generate: !busy_generating
            && validate_generate(&state.prompt, state.selected_model.as_deref()).is_ok(),
        can_compile: validate_compile(state).is_ok(),
        compile_feature_enabled: state.features.is_enabled(USER_COMPILE),
        high_quality_available: state.features.is_enabled(HIGH_QUALITY),
        notice: state.visible_notice(now).map(|n| NoticeVm {
            kind: n.kind,
            message: n.message.clone(),
        }),
        error: state.last_error.as_ref().map(|e| e.message.clone()),
        compile_error: state.compile_diagnostics().map(compile_error_vm),
    }
}
