//! The five expansion protocols
//!
//! Implementations only ever see detached copies of the syntax they are
//! anchored on. Returned nodes are re-serialized by their trimmed text, so
//! they may be built with the `kt_parser` fragment parsers.

use crate::context::MacroExpansionContext;
use crate::error::MacroExpansionError;
use kt_syntax::SyntaxNode;
use kt_syntax::ast::{Attribute, Decl, DeclGroup, FreestandingMacroExpansion};

/// `#name(...)` in expression position, replaced by one expression
pub trait ExpressionMacro: Send + Sync {
    /// Produces the replacement expression
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion is rejected
    fn expansion(
        &self,
        node: FreestandingMacroExpansion<'_>,
        context: &mut MacroExpansionContext,
    ) -> Result<SyntaxNode, MacroExpansionError>;
}

/// `#name(...)` in declaration position, replaced by declarations
pub trait DeclarationMacro: Send + Sync {
    /// Produces the replacement declarations in order
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion is rejected
    fn expansion(
        &self,
        node: FreestandingMacroExpansion<'_>,
        context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError>;
}

/// Attribute on a variable, adding accessors to it
pub trait AccessorMacro: Send + Sync {
    /// Produces the accessors for `declaration`
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion is rejected
    fn expansion(
        &self,
        attribute: Attribute<'_>,
        declaration: Decl<'_>,
        context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError>;
}

/// Attribute on a group, adding attributes to one member at a time
pub trait MemberAttributeMacro: Send + Sync {
    /// Produces the attributes to prepend to `member` of `group`
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion is rejected
    fn expansion(
        &self,
        attribute: Attribute<'_>,
        group: DeclGroup<'_>,
        member: Decl<'_>,
        context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError>;
}

/// Attribute on a group, adding members to it
pub trait MemberMacro: Send + Sync {
    /// Produces the members to add to `group`
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion is rejected
    fn expansion(
        &self,
        attribute: Attribute<'_>,
        group: DeclGroup<'_>,
        context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError>;
}
