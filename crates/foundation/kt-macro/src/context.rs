//! Per-expansion state

use crate::diagnostic::Diagnostic;
use kt_span::Span;
use rustc_hash::FxHashMap;

/// State for one expansion call
///
/// A context is created for a single call, collects whatever diagnostics
/// the macro emits and is dropped once they have been relayed.
#[derive(Debug, Default)]
pub struct MacroExpansionContext {
    module_name: String,
    file_name: String,
    diagnostics: Vec<Diagnostic>,
    /// Names handed out by `make_unique_name`, per base name
    unique_names: FxHashMap<String, u32>,
}

impl MacroExpansionContext {
    /// Creates a context for an expansion in `file_name` of `module_name`
    #[must_use]
    pub fn new(module_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Module of the expansion site
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// File of the expansion site
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Records a diagnostic
    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(%diagnostic, span = %diagnostic.span, "macro diagnostic");
        self.diagnostics.push(diagnostic);
    }

    /// Records a warning
    pub fn warning(&mut self, message: impl Into<String>, span: Span) {
        self.diagnose(Diagnostic::warning(message, span));
    }

    /// Records an error
    pub fn error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnose(Diagnostic::error(message, span));
    }

    /// Diagnostics recorded so far, in order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Removes and returns the recorded diagnostics
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Returns an identifier no user code in this expansion can clash with
    pub fn make_unique_name(&mut self, base: &str) -> String {
        let counter = self.unique_names.entry(base.to_owned()).or_default();
        let name = format!("__macro_local_{}{base}{counter}_", base.len());
        *counter += 1;
        name
    }
}
