#[derive(Debug, Clone)]
pub enum SessionCommand {
    // Lifecycle
    Mount,
    Dispose,

    // Inputs
    SetPrompt(String),
    SelectModel(String),
    EditScript(String),

    // Pipeline
    Generate,
    Compile,

    // Notices
    DismissNotice,
}
