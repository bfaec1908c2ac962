use std::sync::Arc;

use manimatic_core::{CompileRequest, ErrorRecord, GenerateRequest, USER_COMPILE};
use tracing::{error, info};

use crate::domain::SessionState;
use crate::ports::BackendPort;

pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a prompt";
pub const NO_MODEL_MESSAGE: &str = "Please select a model";
pub const COMPILE_DISABLED_MESSAGE: &str = "Compilation feature is currently unavailable";
pub const EMPTY_SCRIPT_MESSAGE: &str = "There is no script to compile";
pub const SCRIPT_PENDING_MESSAGE: &str = "Wait for the script to finish generating";
pub const COMPILE_PENDING_MESSAGE: &str = "A compilation is already in progress";
pub const RENDER_PENDING_MESSAGE: &str = "Wait for the current render to finish";
pub const READ_ONLY_MESSAGE: &str = "The script cannot be edited while it is compiling";
pub const GENERATE_REJECTED_MESSAGE: &str = "Failed to generate animation. Please try again.";
pub const COMPILE_REJECTED_MESSAGE: &str = "Failed to compile script. Please try again.";

pub fn validate_generate(
    prompt: &str,
    model: Option<&str>,
) -> Result<GenerateRequest, ErrorRecord> {
    if prompt.trim().is_empty() {
        return Err(ErrorRecord::validation(EMPTY_PROMPT_MESSAGE));
    }
    let model = model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ErrorRecord::validation(NO_MODEL_MESSAGE))?;
    Ok(GenerateRequest {
        prompt: prompt.to_string(),
        model: model.to_string(),
    })
}

/// Checks the compile request against the current session: feature gate,
/// no generation, compile or chained render in flight, non-empty editable script.
pub fn validate_compile(state: &SessionState) -> Result<CompileRequest, ErrorRecord> {
    if !state.features.is_enabled(USER_COMPILE) {
        return Err(ErrorRecord::validation(COMPILE_DISABLED_MESSAGE));
    }
    if state.script_loading() {
        return Err(ErrorRecord::validation(SCRIPT_PENDING_MESSAGE));
    }
    if state.compiling {
        return Err(ErrorRecord::validation(COMPILE_PENDING_MESSAGE));
    }
    // the render chained onto a generate reports through the same compile events
    if state.video_loading() {
        return Err(ErrorRecord::validation(RENDER_PENDING_MESSAGE));
    }
    if state.edited_script.trim().is_empty() {
        return Err(ErrorRecord::validation(EMPTY_SCRIPT_MESSAGE));
    }
    Ok(CompileRequest {
        script: state.edited_script.clone(),
    })
}

/// Issues the acknowledgement-only triggering calls.
pub struct RequestDispatcher<B> {
    backend: Arc<B>,
}

impl<B: BackendPort> RequestDispatcher<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn generate(&self, req: &GenerateRequest) -> Result<(), ErrorRecord> {
        info!(model = %req.model, "submitting generation");
        self.backend.submit_generate(req).await.map_err(|e| {
            error!("generate request failed: {e}");
            ErrorRecord::transport(GENERATE_REJECTED_MESSAGE)
        })
    }

    pub async fn compile(&self, req: &CompileRequest) -> Result<(), ErrorRecord> {
        info!(bytes = req.script.len(), "submitting compilation");
        self.backend.submit_compile(req).await.map_err(|e| {
            error!("compile request failed: {e}");
            ErrorRecord::transport(COMPILE_REJECTED_MESSAGE)
        })
    }
}
