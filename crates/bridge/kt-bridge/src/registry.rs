//! Macro handle registry

use crate::config::BridgeConfig;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use kt_macro::{MacroDescriptor, builtin_descriptor};
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Module the builtin macros are registered under
pub const BUILTIN_MODULE: &str = "KiteMacros";

/// Type names of the builtin macros, with the builtin each one maps to
const BUILTIN_TYPES: [(&str, &str); 5] = [
    ("StringifyMacro", "stringify"),
    ("WarningMacro", "warning"),
    ("DeclareStructsMacro", "declareStructs"),
    ("DictionaryStorageMacro", "DictionaryStorage"),
    ("DictionaryStoragePropertyMacro", "DictionaryStorageProperty"),
];

/// Stable key a host uses to name a macro implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacroTypeIdentity {
    /// Module declaring the macro type
    pub module: String,
    /// Name of the macro type
    pub type_name: String,
}

impl MacroTypeIdentity {
    /// Creates an identity
    pub fn new(module: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for MacroTypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.type_name)
    }
}

/// A resolved macro, owned by the host between `resolve` and `destroy`
#[derive(Debug)]
pub struct MacroHandle {
    identity: MacroTypeIdentity,
    descriptor: Arc<MacroDescriptor>,
}

impl MacroHandle {
    /// The identity the handle was resolved from
    pub fn identity(&self) -> &MacroTypeIdentity {
        &self.identity
    }

    /// The macro's descriptor
    pub fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    /// The macro's name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// Descriptors by identity, in registration order
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    descriptors: IndexMap<MacroTypeIdentity, Arc<MacroDescriptor>, FxBuildHasher>,
}

impl MacroRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the builtin macros under [`BUILTIN_MODULE`]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (type_name, builtin) in BUILTIN_TYPES {
            if let Some(descriptor) = builtin_descriptor(builtin) {
                registry.register(MacroTypeIdentity::new(BUILTIN_MODULE, type_name), descriptor);
            }
        }
        registry
    }

    /// Creates the builtin registry plus the `[[macros]]` entries of `config`
    ///
    /// # Errors
    ///
    /// Returns an error if an entry names an unknown builtin
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let mut registry = Self::with_builtins();
        for entry in &config.macros {
            let descriptor = builtin_descriptor(&entry.builtin)
                .with_context(|| format!("macro `{}` maps to unknown builtin `{}`", entry.identity(), entry.builtin))?;
            registry.register(entry.identity(), descriptor);
        }
        Ok(registry)
    }

    /// Registers `descriptor` under `identity`, replacing any previous one
    pub fn register(&mut self, identity: MacroTypeIdentity, descriptor: MacroDescriptor) {
        tracing::debug!(%identity, roles = ?descriptor.roles(), "registering macro");
        self.descriptors.insert(identity, Arc::new(descriptor));
    }

    /// Number of registered identities
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered identities in registration order
    pub fn identities(&self) -> impl Iterator<Item = &MacroTypeIdentity> {
        self.descriptors.keys()
    }

    /// Resolves `identity` to a fresh handle
    ///
    /// Returns `None` for unknown identities and for descriptors that
    /// implement no protocol. Every handle must be passed to
    /// [`MacroRegistry::destroy`] exactly once.
    pub fn resolve(&self, identity: &MacroTypeIdentity) -> Option<Box<MacroHandle>> {
        let descriptor = self.descriptors.get(identity).filter(|descriptor| descriptor.is_macro());
        let Some(descriptor) = descriptor else {
            tracing::debug!(%identity, "not a macro");
            return None;
        };
        Some(Box::new(MacroHandle {
            identity: identity.clone(),
            descriptor: Arc::clone(descriptor),
        }))
    }

    /// Releases a handle returned by [`MacroRegistry::resolve`]
    pub fn destroy(handle: Box<MacroHandle>) {
        tracing::trace!(identity = %handle.identity, "destroying macro handle");
        drop(handle);
    }

    #[cfg(test)]
    fn descriptor(&self, identity: &MacroTypeIdentity) -> Option<&Arc<MacroDescriptor>> {
        self.descriptors.get(identity)
    }
}
