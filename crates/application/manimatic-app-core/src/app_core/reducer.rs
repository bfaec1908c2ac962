use std::time::Instant;

use manimatic_core::{CompileDiagnostics, ErrorKind, ErrorRecord, EventPayload};

use crate::domain::{ChannelStatus, Notice, SessionPhase, SessionState, Stage, StageStatus};
use crate::features::FeatureGate;

use super::events::SessionEvent;

pub const PROBE_FAILED_MESSAGE: &str = "Health check failed. Unable to connect to the server.";
pub const CHANNEL_FAILED_MESSAGE: &str = "Connection error. Please refresh and try again.";
pub const TIMED_OUT_MESSAGE: &str = "Generation timed out. Please try again.";

pub fn reduce(mut state: SessionState, ev: SessionEvent) -> SessionState {
    match ev {
        SessionEvent::ChannelConnecting => state.channel = ChannelStatus::Connecting,
        SessionEvent::ChannelOpened => state.channel = ChannelStatus::Open,
        SessionEvent::ChannelDisposed => state.channel = ChannelStatus::Closed,

        SessionEvent::ProbeFailed => {
            state.channel = ChannelStatus::Closed;
            fail(&mut state, ErrorRecord::transport(PROBE_FAILED_MESSAGE));
        }

        SessionEvent::ChannelFailed => {
            state.channel = ChannelStatus::Closed;
            fail(&mut state, ErrorRecord::transport(CHANNEL_FAILED_MESSAGE));
        }

        SessionEvent::FeaturesLoaded(resp) => {
            if !state.features.is_settled() {
                state.features = FeatureGate::from_response(resp);
            }
        }

        SessionEvent::FeaturesUnavailable => {
            if !state.features.is_settled() {
                state.features = FeatureGate::Unavailable;
            }
        }

        SessionEvent::ModelsLoaded(resp) => {
            if state.selected_model.is_none() {
                state.selected_model = resp.preferred().map(str::to_string);
            }
            state.models = resp.models;
        }

        SessionEvent::PromptChanged(p) => state.prompt = p,
        SessionEvent::ModelSelected(m) => state.selected_model = Some(m),
        SessionEvent::ScriptEdited(s) => state.edited_script = s,

        SessionEvent::GenerateDispatched { action_id } => {
            state.script = None;
            state.edited_script.clear();
            state.video_url = None;
            state.last_error = None;
            state.notice = None;
            state.compiling = false;
            // The backend chains a render onto every generated script, so a
            // generate request covers both stages.
            state.script_status = StageStatus::Loading;
            state.video_status = StageStatus::Loading;
            state.phase = SessionPhase::AwaitingScript;
            state.action_id = Some(action_id);
        }

        SessionEvent::CompileDispatched { action_id } => {
            state.last_error = None;
            state.notice = None;
            state.compiling = true;
            state.video_status = StageStatus::Loading;
            state.phase = SessionPhase::AwaitingVideo;
            state.action_id = Some(action_id);
        }

        SessionEvent::DispatchFailed {
            action_id,
            stage,
            error,
        } => {
            if state.action_id != Some(action_id) {
                return state;
            }
            match stage {
                Stage::Script => settle_loading(&mut state, StageStatus::Errored),
                Stage::Video => {
                    if state.video_loading() {
                        state.video_status = StageStatus::Errored;
                    }
                    state.compiling = false;
                }
            }
            state.phase = SessionPhase::Errored(error.kind);
            raise(&mut state, error);
        }

        SessionEvent::Server(ev) => {
            if state.session_id.is_none() && !ev.session_id.is_empty() {
                state.session_id = Some(ev.session_id.clone());
            }
            apply_server_event(&mut state, ev.payload);
        }

        SessionEvent::TimedOut { action_id } => {
            if state.action_id != Some(action_id) {
                return state;
            }
            fail(&mut state, ErrorRecord::timeout(TIMED_OUT_MESSAGE));
        }

        SessionEvent::Rejected(error) => raise(&mut state, error),

        SessionEvent::NoticeDismissed => state.notice = None,
        SessionEvent::NoticeExpired { now } => {
            if state.notice.as_ref().is_some_and(|n| !n.is_visible_at(now)) {
                state.notice = None;
            }
        }
    }
    state
}

fn apply_server_event(state: &mut SessionState, payload: EventPayload) {
    match payload {
        EventPayload::GenerateSucceeded(ok) => {
            state.edited_script = ok.script.clone();
            state.script = Some(ok.script);
            state.prompt.clear();
            state.script_status = StageStatus::Ready;
            state.phase = SessionPhase::ScriptReady;
        }

        EventPayload::GenerateFailed(f) => {
            fail(
                state,
                ErrorRecord::generation(f.message, f.details.as_deref()),
            );
        }

        EventPayload::CompileSucceeded(ok) => {
            state.video_url = Some(ok.video_url);
            state.video_status = StageStatus::Ready;
            if state.script_loading() {
                state.script_status = StageStatus::Idle;
            }
            state.compiling = false;
            if state
                .last_error
                .as_ref()
                .is_some_and(|e| e.kind == ErrorKind::Compilation)
            {
                state.last_error = None;
            }
            state.phase = SessionPhase::VideoReady;
        }

        EventPayload::CompileFailed(f) => {
            // The script stays as the user left it so it can be fixed and recompiled.
            fail(state, ErrorRecord::compilation(CompileDiagnostics::from(f)));
        }
    }
}

/// Stop every loading stage, record the error and enter `Errored`.
fn fail(state: &mut SessionState, error: ErrorRecord) {
    settle_loading(state, StageStatus::Errored);
    state.phase = SessionPhase::Errored(error.kind);
    raise(state, error);
}

fn settle_loading(state: &mut SessionState, to: StageStatus) {
    if state.script_loading() {
        state.script_status = to;
    }
    if state.video_loading() {
        state.video_status = to;
    }
    state.compiling = false;
}

/// Surface an error as a notice. Validation errors only produce the notice so
/// they never hide compile diagnostics of the previous attempt.
fn raise(state: &mut SessionState, error: ErrorRecord) {
    state.notice = Some(Notice {
        kind: error.kind,
        message: error.message.clone(),
        raised_at: Instant::now(),
        ttl: state.notice_ttl,
    });
    if error.kind != ErrorKind::Validation {
        state.last_error = Some(error);
    }
}
