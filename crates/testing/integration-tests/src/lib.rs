//! Shared setup for the bridge integration tests
//!
//! A [`Fixture`] plays the host: it owns a source buffer, exports it to a
//! [`MacroBridge`], and turns needles in the text into the host addresses
//! the bridge expects.

use anyhow::{Context, Result};
use kt_bridge::{
    BridgeError, DiagnosticSink, ExportedSourceFile, MacroBridge, MacroHandle, MacroTypeIdentity,
    ResultBuffer, Site, BUILTIN_MODULE,
};
use kt_macro::{Diagnostic, MacroRole};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding the `.kt` fixtures
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// A host buffer exported to a bridge
pub struct Fixture {
    bridge: MacroBridge,
    source: String,
    file: ExportedSourceFile,
}

impl Fixture {
    /// Exports `source` to a bridge holding the builtin macros
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_bridge(MacroBridge::with_builtins(), "main.kt", source)
    }

    /// Exports `source` as `file_name` to `bridge`
    pub fn with_bridge(bridge: MacroBridge, file_name: &str, source: impl Into<String>) -> Self {
        let source = source.into();
        let file = ExportedSourceFile::from_text("App", file_name, &source);
        Self {
            bridge,
            source,
            file,
        }
    }

    /// Loads `fixtures/<name>`
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture cannot be read
    pub fn load(name: &str) -> Result<Self> {
        let path = fixtures_dir().join(name);
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
        Ok(Self::with_bridge(MacroBridge::with_builtins(), name, source))
    }

    /// The bridge
    pub fn bridge(&self) -> &MacroBridge {
        &self.bridge
    }

    /// The exported file
    pub fn file(&self) -> &ExportedSourceFile {
        &self.file
    }

    /// The host buffer
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Host address of the first occurrence of `needle`
    ///
    /// # Errors
    ///
    /// Returns an error if `needle` does not occur
    pub fn address(&self, needle: &str) -> Result<usize> {
        self.nth_address(needle, 0)
    }

    /// Host address of occurrence `index` of `needle`
    ///
    /// # Errors
    ///
    /// Returns an error if `needle` occurs fewer than `index + 1` times
    pub fn nth_address(&self, needle: &str, index: usize) -> Result<usize> {
        let offset = self
            .source
            .match_indices(needle)
            .nth(index)
            .map(|(offset, _)| offset)
            .with_context(|| format!("`{needle}` occurs fewer than {} times", index + 1))?;
        u32::try_from(offset)
            .ok()
            .and_then(|offset| self.file.address_of(offset))
            .with_context(|| format!("offset {offset} is outside the buffer"))
    }

    /// Offset of the first occurrence of `needle`
    ///
    /// # Errors
    ///
    /// Returns an error if `needle` does not occur
    pub fn offset(&self, needle: &str) -> Result<u32> {
        let address = self.address(needle)?;
        Ok(u32::try_from(address - self.file.buffer().base_address())?)
    }

    /// The first address past the buffer
    pub fn end_address(&self) -> usize {
        self.file.buffer().base_address() + self.file.buffer().len()
    }

    /// Resolves a builtin macro type
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not a builtin macro
    pub fn builtin(&self, type_name: &str) -> Result<Box<MacroHandle>> {
        self.resolve(&MacroTypeIdentity::new(BUILTIN_MODULE, type_name))
    }

    /// Resolves a macro type
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is not a macro
    pub fn resolve(&self, identity: &MacroTypeIdentity) -> Result<Box<MacroHandle>> {
        self.bridge
            .resolve_macro_type(identity)
            .with_context(|| format!("`{identity}` is not a macro"))
    }

    /// Evaluates `handle` at `address`
    pub fn evaluate(&self, handle: &MacroHandle, address: usize) -> Expansion {
        Expansion::collect(|sink| self.bridge.evaluate_macro(sink, handle, &self.file, address))
    }

    /// Expands `handle` in `role`, with all sites in this fixture's file
    pub fn expand_attached(
        &self,
        handle: &MacroHandle,
        role: MacroRole,
        attribute: usize,
        declaration: usize,
        parent: Option<usize>,
    ) -> Expansion {
        Expansion::collect(|sink| {
            self.bridge.expand_attached_macro(
                sink,
                handle,
                role,
                Site::new(&self.file, attribute),
                Site::new(&self.file, declaration),
                parent.map(|parent| Site::new(&self.file, parent)),
            )
        })
    }
}

/// Outcome of one request, with what reached the host sink
#[derive(Debug)]
pub struct Expansion {
    /// Expansion text, or why there is none
    pub result: Result<String, BridgeError>,
    /// Diagnostics relayed during the request
    pub diagnostics: Vec<Diagnostic>,
}

impl Expansion {
    fn collect(request: impl FnOnce(&mut dyn DiagnosticSink) -> Result<ResultBuffer, BridgeError>) -> Self {
        let mut diagnostics = Vec::new();
        let result = request(&mut diagnostics).map(|buffer| buffer.as_str().to_owned());
        Self {
            result,
            diagnostics,
        }
    }

    /// The expansion text, if the request succeeded
    pub fn text(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }

    /// Relayed diagnostics rendered as `severity: message`
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}
