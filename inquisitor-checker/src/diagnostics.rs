use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Heresy,
    Suspicion,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Diagnostic {
    pub span: SourceSpan,
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn line(&self) -> usize {
        self.span.line
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            DiagnosticLevel::Heresy => write!(f, "{}: {}", self.span.line, self.message),
            DiagnosticLevel::Suspicion => {
                write!(f, "{}: suspicious: {}", self.span.line, self.message)
            }
        }
    }
}

/// Violations keyed by content, iterated in source order.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: BTreeSet<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: BTreeSet::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.insert(diagnostic);
    }

    pub fn push_heresy<S: Into<String>>(&mut self, message: S, span: SourceSpan) {
        self.push(Diagnostic {
            span,
            level: DiagnosticLevel::Heresy,
            message: message.into(),
        });
    }

    pub fn push_suspicion<S: Into<String>>(&mut self, message: S, span: SourceSpan) {
        self.push(Diagnostic {
            span,
            level: DiagnosticLevel::Suspicion,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_heresies(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Heresy)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.entries.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::collections::btree_set::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
