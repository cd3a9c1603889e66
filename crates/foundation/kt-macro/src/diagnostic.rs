//! Diagnostics produced while a macro runs

use kt_span::Span;
use std::fmt;

/// Severity level for diagnostics
#[allow(missing_docs, reason = "variants are self-describing")]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    /// Fails the expansion
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A message anchored at an absolute position in the expansion's file
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    /// How serious the message is
    pub severity: Severity,
    /// The message text
    pub message: String,
    /// Where the message points, in the file the macro was used in
    pub span: Span,
    /// Extra notes shown after the message
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a diagnostic without notes
    pub fn new(severity: Severity, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    /// Creates an error diagnostic
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, message, span)
    }

    /// Creates a warning diagnostic
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, message, span)
    }

    /// Creates a note diagnostic
    pub fn note(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Note, message, span)
    }

    /// Appends a note
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Whether this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
