//! Bridge error types

use crate::resolve::ResolveError;
use kt_macro::MacroRole;
use kt_syntax::TreeInvariantViolation;

/// Why an expansion request failed
///
/// Only the fact of failure crosses the C boundary (see
/// [`BridgeError::status`]); the details go to the log and, for failures
/// inside a macro, to the host's diagnostic sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A host address did not lead to a node of the expected shape
    #[error(transparent)]
    Resolve(ResolveError),
    /// The syntax tree of an exported file is malformed
    #[error(transparent)]
    Invariant(TreeInvariantViolation),
    /// The role tag is not one of the known roles
    #[error("unknown macro role tag {0:#04x}")]
    UnknownRole(u8),
    /// The macro does not implement the protocol the request needs
    #[error("macro `{name}` cannot be expanded as {role}")]
    UnsupportedRole {
        /// Macro name
        name: String,
        /// Requested role
        role: MacroRole,
    },
    /// A member-attribute request without a resolvable enclosing group
    #[error("macro `{name}` needs the declaration group enclosing the member")]
    MissingParentGroup {
        /// Macro name
        name: String,
    },
    /// A member request on something that cannot hold members
    #[error("macro `{name}` must be attached to a declaration group")]
    NotADeclGroup {
        /// Macro name
        name: String,
    },
    /// The macro rejected the expansion; its diagnostic has been relayed
    #[error("macro `{name}` failed to expand")]
    ExpansionFailed {
        /// Macro name
        name: String,
    },
}

impl BridgeError {
    /// Status code of a failed request
    pub const FAILURE: i32 = 1;

    /// Status code of a successful request
    pub const SUCCESS: i32 = 0;

    /// The status code reported across the C boundary
    pub fn status(&self) -> i32 {
        Self::FAILURE
    }
}

impl From<ResolveError> for BridgeError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::Invariant(violation) => Self::Invariant(violation),
            other => Self::Resolve(other),
        }
    }
}

impl From<TreeInvariantViolation> for BridgeError {
    fn from(violation: TreeInvariantViolation) -> Self {
        Self::Invariant(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use kt_span::Span;
    use kt_syntax::SyntaxKind;

    #[test]
    fn invariant_violations_keep_their_own_variant() {
        let violation = TreeInvariantViolation {
            kind: SyntaxKind::TupleExpr,
            span: Span::new(0, 5),
            position: 2,
        };
        let error = BridgeError::from(ResolveError::Invariant(violation.clone()));
        assert_eq!(error, BridgeError::Invariant(violation));
        assert_eq!(error.status(), BridgeError::FAILURE);
    }

    #[test]
    fn messages() {
        let name = || "stringify".to_owned();
        let errors = [
            BridgeError::from(ResolveError::NoToken {
                file: "main.kt".to_owned(),
                offset: 17,
            }),
            BridgeError::UnknownRole(3),
            BridgeError::UnsupportedRole {
                name: name(),
                role: MacroRole::MemberAttribute,
            },
            BridgeError::MissingParentGroup { name: name() },
            BridgeError::NotADeclGroup { name: name() },
            BridgeError::ExpansionFailed { name: name() },
        ];
        let rendered: Vec<_> = errors.iter().map(ToString::to_string).collect();
        expect![[r#"
            [
                "no token of `main.kt` covers offset 17",
                "unknown macro role tag 0x03",
                "macro `stringify` cannot be expanded as member attribute",
                "macro `stringify` needs the declaration group enclosing the member",
                "macro `stringify` must be attached to a declaration group",
                "macro `stringify` failed to expand",
            ]
        "#]]
        .assert_debug_eq(&rendered);
    }
}
