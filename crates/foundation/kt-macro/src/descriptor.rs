//! Macro descriptors

use crate::protocols::{
    AccessorMacro, DeclarationMacro, ExpressionMacro, MemberAttributeMacro, MemberMacro,
};
use crate::role::{MacroRole, MacroRoles};
use std::fmt;
use std::sync::Arc;

/// One protocol a macro implements, together with its implementation
#[derive(Clone)]
pub enum MacroImplementation {
    /// Expands `#name(...)` expressions
    Expression(Arc<dyn ExpressionMacro>),
    /// Expands `#name(...)` declarations
    Declaration(Arc<dyn DeclarationMacro>),
    /// Adds accessors to a variable
    Accessor(Arc<dyn AccessorMacro>),
    /// Adds attributes to the members of a group
    MemberAttribute(Arc<dyn MemberAttributeMacro>),
    /// Adds members to a group
    Member(Arc<dyn MemberMacro>),
}

impl MacroImplementation {
    /// The role this implementation expands in
    pub fn role(&self) -> MacroRole {
        match self {
            Self::Expression(_) => MacroRole::Expression,
            Self::Declaration(_) => MacroRole::FreestandingDeclaration,
            Self::Accessor(_) => MacroRole::Accessor,
            Self::MemberAttribute(_) => MacroRole::MemberAttribute,
            Self::Member(_) => MacroRole::Member,
        }
    }
}

impl fmt::Debug for MacroImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MacroImplementation").field(&self.role()).finish()
    }
}

/// A named macro and the protocols it implements
///
/// Descriptors are immutable once built and shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct MacroDescriptor {
    name: String,
    implementations: Vec<MacroImplementation>,
}

impl MacroDescriptor {
    /// Creates a descriptor implementing no protocol yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implementations: Vec::new(),
        }
    }

    /// Adds an implementation
    #[must_use]
    pub fn with(mut self, implementation: MacroImplementation) -> Self {
        self.implementations.push(implementation);
        self
    }

    /// Adds an expression implementation
    #[must_use]
    pub fn expression(self, implementation: impl ExpressionMacro + 'static) -> Self {
        self.with(MacroImplementation::Expression(Arc::new(implementation)))
    }

    /// Adds a declaration implementation
    #[must_use]
    pub fn declaration(self, implementation: impl DeclarationMacro + 'static) -> Self {
        self.with(MacroImplementation::Declaration(Arc::new(implementation)))
    }

    /// Adds an accessor implementation
    #[must_use]
    pub fn accessor(self, implementation: impl AccessorMacro + 'static) -> Self {
        self.with(MacroImplementation::Accessor(Arc::new(implementation)))
    }

    /// Adds a member-attribute implementation
    #[must_use]
    pub fn member_attribute(self, implementation: impl MemberAttributeMacro + 'static) -> Self {
        self.with(MacroImplementation::MemberAttribute(Arc::new(implementation)))
    }

    /// Adds a member implementation
    #[must_use]
    pub fn member(self, implementation: impl MemberMacro + 'static) -> Self {
        self.with(MacroImplementation::Member(Arc::new(implementation)))
    }

    /// The macro's name, used to annotate its diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Implementations in the order they were added
    pub fn implementations(&self) -> &[MacroImplementation] {
        &self.implementations
    }

    /// Roles covered by the implementations
    pub fn roles(&self) -> MacroRoles {
        self.implementations
            .iter()
            .fold(MacroRoles::empty(), |roles, implementation| {
                roles | implementation.role().into()
            })
    }

    /// Whether the descriptor implements at least one protocol
    pub fn is_macro(&self) -> bool {
        !self.implementations.is_empty()
    }
}
