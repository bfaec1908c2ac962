use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::CompileFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Detected locally before anything is sent.
    Validation,
    /// Probe failure, push channel failure or a rejected triggering call.
    Transport,
    /// Reported by the generation backend over the push channel.
    Generation,
    /// Reported by the compilation backend over the push channel.
    Compilation,
    /// No terminal event arrived before the deadline.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::Generation => "generation",
            ErrorKind::Compilation => "compilation",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileDiagnostics {
    pub message: String,
    pub stdout: String,
    pub stderr: String,
    pub line: Option<u32>,
}

impl From<CompileFailure> for CompileDiagnostics {
    fn from(f: CompileFailure) -> Self {
        Self {
            message: f.message,
            stdout: f.stdout,
            stderr: f.stderr,
            line: f.line,
        }
    }
}

/// The single UI-facing error model. Every failure source funnels into this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub diagnostics: Option<CompileDiagnostics>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            diagnostics: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn generation(message: impl Into<String>, details: Option<&str>) -> Self {
        let message = message.into();
        let message = match details.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => format!("Generation failed: {message}\n{d}"),
            None => format!("Generation failed: {message}"),
        };
        Self::new(ErrorKind::Generation, message)
    }

    pub fn compilation(diagnostics: CompileDiagnostics) -> Self {
        Self {
            kind: ErrorKind::Compilation,
            message: format!("Compilation failed: {}", diagnostics.message),
            diagnostics: Some(diagnostics),
        }
    }
}
