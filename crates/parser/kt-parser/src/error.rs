//! Rich error reporting for the parser
//!
//! Note: These struct fields are used by miette's `#[derive(Diagnostic)]` macro
//! for rich error output, but rustc cannot see through the proc macro expansion.

#![allow(unused_assignments, reason = "fields are read by the miette derive")]

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Parse error with rich diagnostic information
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum ParseError {
    /// Syntax error with unexpected input
    #[error("unexpected token `{token}`")]
    #[diagnostic(code(parser::unexpected_token), help("this token is not valid here"))]
    UnexpectedToken {
        /// What was found
        token: String,
        /// Source location
        #[label("unexpected token")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: miette::NamedSource<String>,
    },

    /// Missing expected token
    #[error("expected {expected}, found `{found}`")]
    #[diagnostic(code(parser::missing_token), help("try adding {expected} here"))]
    MissingToken {
        /// What was expected
        expected: String,
        /// What was actually found
        found: String,
        /// Source location where it should be
        #[label("expected {expected} here")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: miette::NamedSource<String>,
    },

    /// String literal running to the end of its line
    #[error("unterminated string literal")]
    #[diagnostic(code(parser::unterminated_string), help("add a closing `\"`"))]
    UnterminatedString {
        /// Source location of the literal
        #[label("string starts here")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: miette::NamedSource<String>,
    },

    /// Fragment did not parse as the requested construct
    #[error("failed to parse {construct}: {reason}")]
    #[diagnostic(code(parser::parse_failed))]
    ParseFailed {
        /// What the fragment was parsed as
        construct: String,
        /// Reason for failure
        reason: String,
    },
}

impl ParseError {
    /// Source location of the error, if it has one
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::MissingToken { span, .. }
            | Self::UnterminatedString { span, .. } => Some(*span),
            Self::ParseFailed { .. } => None,
        }
    }
}
