pub mod app_core;
pub mod backend;
pub mod channel;
pub mod dispatcher;
pub mod domain;
pub mod features;
pub mod orchestrator;
pub mod ports;
pub mod settings;
pub mod timeout;
pub mod viewmodel;

pub use app_core::*;
pub use backend::HttpBackend;
pub use channel::{ChannelError, EventChannel};
pub use dispatcher::RequestDispatcher;
pub use domain::{
    ActionId, ChannelStatus, Notice, SessionFilter, SessionPhase, SessionState, Stage, StageStatus,
};
pub use features::FeatureGate;
pub use orchestrator::SessionOrchestrator;
pub use ports::*;
pub use settings::{ClientSettings, SettingsStore};
pub use timeout::TimeoutGuard;
pub use viewmodel::*;
