//! Forwarding macro diagnostics to the host

use crate::source_file::ExportedSourceFile;
use kt_macro::Diagnostic;

/// Host-owned receiver of diagnostics
pub trait DiagnosticSink {
    /// Receives one diagnostic whose span is an offset into `file`
    fn emit(&mut self, diagnostic: &Diagnostic, file: &ExportedSourceFile);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: &Diagnostic, _file: &ExportedSourceFile) {
        self.push(diagnostic.clone());
    }
}

/// Forwards `diagnostics` to `sink` in the order they were produced
///
/// With `annotate` set, each message gets a ` (from macro 'NAME')` suffix.
pub fn relay(
    diagnostics: Vec<Diagnostic>,
    macro_name: &str,
    annotate: bool,
    file: &ExportedSourceFile,
    sink: &mut dyn DiagnosticSink,
) {
    for mut diagnostic in diagnostics {
        if annotate {
            diagnostic.message = format!("{} (from macro '{macro_name}')", diagnostic.message);
        }
        tracing::debug!(
            file = file.file_name(),
            span = %diagnostic.span,
            %diagnostic,
            "relaying diagnostic"
        );
        sink.emit(&diagnostic, file);
    }
}
