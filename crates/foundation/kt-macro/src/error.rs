//! Macro expansion error types

use kt_parser::ParseError;
use kt_span::Span;

/// Error returned by a macro implementation
#[derive(Debug, Clone, thiserror::Error)]
pub enum MacroExpansionError {
    /// Free-form failure
    #[error("{message}")]
    Custom {
        /// Error message
        message: String,
        /// Location, if the macro knows a better one than the use site
        span: Option<Span>,
    },
    /// Wrong number of arguments
    #[error("macro `{name}` expects {expected} argument(s), found {found}")]
    ArgumentCount {
        /// Macro name
        name: String,
        /// Number of arguments accepted
        expected: usize,
        /// Number of arguments given
        found: usize,
    },
    /// An argument has the wrong shape
    #[error("expected {expected}, found `{found}`")]
    UnexpectedArgument {
        /// What the macro accepts
        expected: &'static str,
        /// Source text of the argument
        found: String,
        /// Location of the argument
        span: Span,
    },
    /// Attached to a declaration the macro cannot handle
    #[error("`@{name}` can only be attached to {expected}")]
    InvalidAttachment {
        /// Macro name
        name: String,
        /// What the macro can be attached to
        expected: &'static str,
        /// Location of the declaration
        span: Span,
    },
    /// Generated source did not parse
    #[error("macro produced invalid syntax: {0}")]
    Parse(#[from] ParseError),
}

impl MacroExpansionError {
    /// Creates a free-form error anchored at the use site
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
            span: None,
        }
    }

    /// Location the error points at, if it has its own
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Custom { span, .. } => *span,
            Self::UnexpectedArgument { span, .. } | Self::InvalidAttachment { span, .. } => Some(*span),
            Self::ArgumentCount { .. } | Self::Parse(_) => None,
        }
    }
}
