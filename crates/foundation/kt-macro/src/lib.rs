//! Macro model for Kite
//!
//! A macro is described by a [`MacroDescriptor`]: a name plus one
//! [`MacroImplementation`] per protocol it supports. The protocols differ in
//! what syntax they are handed and what they give back:
//!
//! | Role | Trait | Input | Output |
//! |---|---|---|---|
//! | Expression | [`ExpressionMacro`] | `#name(...)` | one expression |
//! | Freestanding declaration | [`DeclarationMacro`] | `#name(...)` | declarations |
//! | Accessor | [`AccessorMacro`] | attribute + variable | accessors |
//! | Member attribute | [`MemberAttributeMacro`] | attribute + group + member | attributes |
//! | Member | [`MemberMacro`] | attribute + group | members |
//!
//! Implementations report problems either by returning a
//! [`MacroExpansionError`] or by recording [`Diagnostic`]s on the
//! [`MacroExpansionContext`] of the call.

pub mod builtins;
mod context;
mod descriptor;
mod diagnostic;
mod error;
mod protocols;
mod role;

pub use context::MacroExpansionContext;
pub use descriptor::{MacroDescriptor, MacroImplementation};
pub use diagnostic::{Diagnostic, Severity};
pub use error::MacroExpansionError;
pub use protocols::{
    AccessorMacro, DeclarationMacro, ExpressionMacro, MemberAttributeMacro, MemberMacro,
};
pub use role::{MacroRole, MacroRoles};

use builtins::{
    DeclareStructsMacro, DictionaryStorageMacro, DictionaryStoragePropertyMacro, StringifyMacro,
    WarningMacro,
};

/// Names of the builtin macro implementations
pub const BUILTIN_NAMES: [&str; 5] = [
    "stringify",
    "warning",
    "declareStructs",
    "DictionaryStorage",
    "DictionaryStorageProperty",
];

/// Builds the descriptor of the builtin macro called `name`
pub fn builtin_descriptor(name: &str) -> Option<MacroDescriptor> {
    let descriptor = MacroDescriptor::new(name);
    Some(match name {
        "stringify" => descriptor.expression(StringifyMacro),
        "warning" => descriptor.expression(WarningMacro),
        "declareStructs" => descriptor.declaration(DeclareStructsMacro),
        "DictionaryStorage" => descriptor
            .member(DictionaryStorageMacro)
            .member_attribute(DictionaryStorageMacro),
        "DictionaryStorageProperty" => descriptor.accessor(DictionaryStoragePropertyMacro),
        _ => return None,
    })
}
