//! Macro expansion bridge for Kite
//!
//! The host compiler owns the source text and the diagnostics engine; this
//! crate owns the macros. A request names a macro by a handle obtained from
//! [`MacroBridge::resolve_macro_type`] and a use site by host addresses into
//! an [`ExportedSourceFile`]. The bridge resolves the addresses to syntax
//! nodes, runs the matching protocol of the macro, relays the macro's
//! diagnostics to the host, and hands back the expansion as a
//! NUL-terminated [`ResultBuffer`].
//!
//! The same operations are exported to C by [`ffi`].

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ffi;
pub mod registry;
pub mod relay;
pub mod resolve;
pub mod source_file;

pub use buffer::ResultBuffer;
pub use config::{BridgeConfig, ExpansionConfig, MacroEntry};
pub use dispatch::Site;
pub use error::BridgeError;
pub use registry::{BUILTIN_MODULE, MacroHandle, MacroRegistry, MacroTypeIdentity};
pub use relay::DiagnosticSink;
pub use resolve::ResolveError;
pub use source_file::{ExportedSourceFile, SourceBuffer};

use kt_macro::MacroRole;
use std::path::Path;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs a `tracing` subscriber filtered by `RUST_LOG`
///
/// Does nothing unless `RUST_LOG` is set, and only the first call has an
/// effect. A subscriber installed by the host beforehand is kept.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let installed = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
            if installed.is_err() {
                tracing::debug!("a global subscriber was already installed");
            }
        }
    });
}

/// Registry plus configuration; every boundary operation goes through one
#[derive(Debug, Clone, Default)]
pub struct MacroBridge {
    registry: MacroRegistry,
    config: BridgeConfig,
}

impl MacroBridge {
    /// Creates a bridge over `registry`
    pub fn new(registry: MacroRegistry, config: BridgeConfig) -> Self {
        Self { registry, config }
    }

    /// Creates a bridge holding only the builtin macros
    pub fn with_builtins() -> Self {
        Self::new(MacroRegistry::with_builtins(), BridgeConfig::default())
    }

    /// Creates a bridge holding the builtins plus the macros of `config`
    ///
    /// # Errors
    ///
    /// Returns an error if a `[[macros]]` entry names an unknown builtin
    pub fn from_config(config: BridgeConfig) -> anyhow::Result<Self> {
        let registry = MacroRegistry::from_config(&config)?;
        Ok(Self::new(registry, config))
    }

    /// Loads the configuration at `path` and builds a bridge from it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or names an unknown
    /// builtin
    pub fn from_config_file(path: &Path) -> anyhow::Result<Self> {
        Self::from_config(BridgeConfig::from_file(path)?)
    }

    /// The registry
    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    /// The configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Resolves a macro type to a handle, or `None` if it is not a macro
    pub fn resolve_macro_type(&self, identity: &MacroTypeIdentity) -> Option<Box<MacroHandle>> {
        self.registry.resolve(identity)
    }

    /// Releases a handle from [`MacroBridge::resolve_macro_type`]
    #[allow(clippy::unused_self, reason = "handles go back through the bridge that issued them")]
    pub fn destroy_macro(&self, handle: Box<MacroHandle>) {
        MacroRegistry::destroy(handle);
    }

    /// Expands the freestanding macro whose `#` is at `address`
    ///
    /// # Errors
    ///
    /// See [`dispatch::evaluate`]
    pub fn evaluate_macro(
        &self,
        sink: &mut dyn DiagnosticSink,
        handle: &MacroHandle,
        file: &ExportedSourceFile,
        address: usize,
    ) -> Result<ResultBuffer, BridgeError> {
        let _span = tracing::debug_span!("evaluate", macro_name = handle.name(), file = file.file_name()).entered();
        dispatch::evaluate(handle, Site::new(file, address), self.config.expansion, sink)
    }

    /// Expands an attached macro in `role`
    ///
    /// # Errors
    ///
    /// See [`dispatch::expand_attached`]
    pub fn expand_attached_macro(
        &self,
        sink: &mut dyn DiagnosticSink,
        handle: &MacroHandle,
        role: MacroRole,
        attribute: Site<'_>,
        declaration: Site<'_>,
        parent: Option<Site<'_>>,
    ) -> Result<ResultBuffer, BridgeError> {
        let _span = tracing::debug_span!(
            "expand_attached",
            macro_name = handle.name(),
            %role,
            file = declaration.file.file_name()
        )
        .entered();
        dispatch::expand_attached(
            handle,
            role,
            attribute,
            declaration,
            parent,
            self.config.expansion,
            sink,
        )
    }
}
