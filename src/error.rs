//! Diagnostic protocol shared by every validator, plus the single fatal
//! error type.
//!
//! Validators never fail: they accumulate `Diagnostic` values and run to
//! completion. `JourneyError` is reserved for the one unrecoverable
//! condition — input that cannot be read or parsed as a journey document.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Structural,
    Expression,
    Scope,
    RequiredField,
    Metadata,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Structural => write!(f, "Structural"),
            DiagnosticKind::Expression => write!(f, "Expression"),
            DiagnosticKind::Scope => write!(f, "Scope"),
            DiagnosticKind::RequiredField => write!(f, "RequiredField"),
            DiagnosticKind::Metadata => write!(f, "Metadata"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: String,
    pub kind: DiagnosticKind,
    pub message: String,
    pub node_id: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(id) => write!(
                f,
                "[{}:{}] {} (node '{}')",
                self.kind, self.code, self.message, id
            ),
            None => write!(f, "[{}:{}] {}", self.kind, self.code, self.message),
        }
    }
}

impl Diagnostic {
    pub fn structural(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            code: code.into(),
            kind: DiagnosticKind::Structural,
            message: message.into(),
            node_id,
        }
    }

    pub fn expression(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            code: code.into(),
            kind: DiagnosticKind::Expression,
            message: message.into(),
            node_id,
        }
    }

    pub fn scope(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            code: code.into(),
            kind: DiagnosticKind::Scope,
            message: message.into(),
            node_id,
        }
    }

    pub fn required_field(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            code: code.into(),
            kind: DiagnosticKind::RequiredField,
            message: message.into(),
            node_id,
        }
    }

    pub fn metadata(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            code: code.into(),
            kind: DiagnosticKind::Metadata,
            message: message.into(),
            node_id,
        }
    }
}

/// Fatal failures. Everything recoverable is a `Diagnostic` instead.
#[derive(Debug, Error)]
pub enum JourneyError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse journey JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("journey document contains no workflow")]
    MissingWorkflow,
}
