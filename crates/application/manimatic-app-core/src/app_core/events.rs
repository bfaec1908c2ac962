use std::time::Instant;

use manimatic_core::{ErrorRecord, FeaturesResponse, ModelsResponse, ServerEvent};

use crate::domain::{ActionId, Stage};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    // Channel lifecycle
    ChannelConnecting,
    ChannelOpened,
    ProbeFailed,
    ChannelFailed,
    ChannelDisposed,

    // Mount-time fetches
    FeaturesLoaded(FeaturesResponse),
    FeaturesUnavailable,
    ModelsLoaded(ModelsResponse),

    // Inputs
    PromptChanged(String),
    ModelSelected(String),
    ScriptEdited(String),

    // Pipeline
    GenerateDispatched {
        action_id: ActionId,
    },
    CompileDispatched {
        action_id: ActionId,
    },
    DispatchFailed {
        action_id: ActionId,
        stage: Stage,
        error: ErrorRecord,
    },
    Server(ServerEvent),
    TimedOut {
        action_id: ActionId,
    },

    // Locally rejected user action
    Rejected(ErrorRecord),
    NoticeDismissed,
    NoticeExpired {
        now: Instant,
    },
}
