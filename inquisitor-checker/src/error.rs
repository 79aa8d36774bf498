use thiserror::Error;

use crate::ast::SourceSpan;
use crate::diagnostics::{Diagnostic, DiagnosticLevel};

/// Outcome of a failed check on one node.
///
/// `Heresy` and `Suspicion` are reported to the user. `Unsupported` marks a
/// construct the checker cannot reason about; it unwinds the same way but is
/// discarded by the top-level walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("{message}")]
    Heresy { message: String, span: SourceSpan },
    #[error("suspicious: {message}")]
    Suspicion { message: String, span: SourceSpan },
    #[error("unsupported {construct}")]
    Unsupported { construct: String, span: SourceSpan },
}

impl CheckError {
    pub fn heresy(message: impl Into<String>, span: SourceSpan) -> Self {
        CheckError::Heresy {
            message: message.into(),
            span,
        }
    }

    pub fn suspicion(message: impl Into<String>, span: SourceSpan) -> Self {
        CheckError::Suspicion {
            message: message.into(),
            span,
        }
    }

    pub fn unsupported(construct: impl Into<String>, span: SourceSpan) -> Self {
        CheckError::Unsupported {
            construct: construct.into(),
            span,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, CheckError::Unsupported { .. })
    }

    /// Converts a reportable error into a diagnostic; escapes yield `None`.
    pub fn into_diagnostic(self) -> Option<Diagnostic> {
        match self {
            CheckError::Heresy { message, span } => Some(Diagnostic {
                span,
                level: DiagnosticLevel::Heresy,
                message,
            }),
            CheckError::Suspicion { message, span } => Some(Diagnostic {
                span,
                level: DiagnosticLevel::Suspicion,
                message,
            }),
            CheckError::Unsupported { .. } => None,
        }
    }
}

pub type CheckResult<T> = Result<T, CheckError>;
