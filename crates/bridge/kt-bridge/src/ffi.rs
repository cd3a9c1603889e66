//! C ABI for the bridge
//!
//! Every object crosses the boundary as an owned pointer with a matching
//! destroy function: bridges, exported source files, macro handles and
//! expansion texts. Requests return `0` on success and `1` on failure; the
//! reason for a failure is logged and, when it came from the macro, relayed
//! through the [`KtDiagnosticSink`].
//!
//! # Safety
//!
//! The entry points are `extern "C"` functions for the host, not Rust API.
//! They accept null for every pointer and treat it as a failed request, but
//! non-null pointers must be ones this module handed out (or, for source
//! buffers and strings, valid for the duration of the call). Panics never
//! unwind into the host.

#![allow(unsafe_code, reason = "C entry points work on raw host pointers")]
#![allow(
    clippy::not_unsafe_ptr_arg_deref,
    reason = "entry points are called by the host, which owns the pointer contracts"
)]

use crate::buffer::{OutText, ResultBuffer};
use crate::dispatch::Site;
use crate::error::BridgeError;
use crate::registry::{MacroHandle, MacroRegistry, MacroTypeIdentity};
use crate::relay::DiagnosticSink;
use crate::source_file::{ExportedSourceFile, SourceBuffer};
use crate::MacroBridge;
use kt_macro::{Diagnostic, MacroRole, Severity};
use std::ffi::{CStr, c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::{ptr, slice};

/// Severity tag of an error diagnostic
pub const KT_SEVERITY_ERROR: u8 = 0;
/// Severity tag of a warning diagnostic
pub const KT_SEVERITY_WARNING: u8 = 1;
/// Severity tag of a note diagnostic
pub const KT_SEVERITY_NOTE: u8 = 2;

/// Callback receiving `(context, severity, message, message_len, location)`
///
/// `location` is the host address the diagnostic points at, or null when
/// it does not point into the exported buffer.
pub type KtEmitDiagnostic =
    extern "C" fn(*mut c_void, u8, *const u8, usize, *const u8);

/// Host diagnostic sink
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KtDiagnosticSink {
    /// Passed back to `emit` unchanged
    pub context: *mut c_void,
    /// Called once per diagnostic; diagnostics are dropped when null
    pub emit: Option<KtEmitDiagnostic>,
}

impl KtDiagnosticSink {
    /// A sink that drops everything
    pub const DISCARD: Self = Self {
        context: ptr::null_mut(),
        emit: None,
    };
}

fn severity_tag(severity: Severity) -> u8 {
    match severity {
        Severity::Error => KT_SEVERITY_ERROR,
        Severity::Warning => KT_SEVERITY_WARNING,
        Severity::Note => KT_SEVERITY_NOTE,
    }
}

impl DiagnosticSink for KtDiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic, file: &ExportedSourceFile) {
        let Some(emit) = self.emit else {
            return;
        };
        let location = file
            .address_of(diagnostic.span.start)
            .map_or(ptr::null(), |address| address as *const u8);
        emit(
            self.context,
            severity_tag(diagnostic.severity),
            diagnostic.message.as_ptr(),
            diagnostic.message.len(),
            location,
        );
    }
}

/// Runs an entry point body, answering `on_panic` if it panics
fn guard<T>(entry: &'static str, on_panic: T, body: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        tracing::error!(entry, "panic in bridge entry point");
        on_panic
    })
}

fn c_str<'a>(text: *const c_char) -> Option<&'a str> {
    if text.is_null() {
        return None;
    }
    // SAFETY: non-null strings from the host are NUL-terminated and live
    // for the duration of the call.
    unsafe { CStr::from_ptr(text) }.to_str().ok()
}

/// Creates a bridge holding the builtin macros
#[unsafe(no_mangle)]
pub extern "C" fn kt_bridge_new_with_builtins() -> *mut MacroBridge {
    guard("kt_bridge_new_with_builtins", ptr::null_mut(), || {
        Box::into_raw(Box::new(MacroBridge::with_builtins()))
    })
}

/// Creates a bridge from the configuration file at `path`
///
/// Returns null if the file cannot be loaded.
#[unsafe(no_mangle)]
pub extern "C" fn kt_bridge_new_from_config(path: *const c_char) -> *mut MacroBridge {
    guard("kt_bridge_new_from_config", ptr::null_mut(), || {
        let Some(path) = c_str(path) else {
            tracing::warn!("bridge config path is null or not UTF-8");
            return ptr::null_mut();
        };
        match MacroBridge::from_config_file(Path::new(path)) {
            Ok(bridge) => Box::into_raw(Box::new(bridge)),
            Err(error) => {
                tracing::warn!("cannot create bridge: {error:#}");
                ptr::null_mut()
            }
        }
    })
}

/// Destroys a bridge
#[unsafe(no_mangle)]
pub extern "C" fn kt_bridge_destroy(bridge: *mut MacroBridge) {
    if bridge.is_null() {
        return;
    }
    // SAFETY: non-null bridges come from `kt_bridge_new_*` and are destroyed
    // once.
    drop(unsafe { Box::from_raw(bridge) });
}

/// Parses the `len` bytes at `base` as a file of `module`
///
/// The bytes are copied; the buffer only has to stay valid during the
/// call, but later requests address it by the same `base`. Returns null
/// for null pointers and for text that is not UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn kt_source_file_export(
    base: *const u8,
    len: usize,
    module: *const c_char,
    file_name: *const c_char,
) -> *mut ExportedSourceFile {
    guard("kt_source_file_export", ptr::null_mut(), || {
        let (Some(module), Some(file_name)) = (c_str(module), c_str(file_name)) else {
            tracing::warn!("module or file name is null or not UTF-8");
            return ptr::null_mut();
        };
        if base.is_null() {
            tracing::warn!(file = file_name, "source buffer is null");
            return ptr::null_mut();
        }
        // SAFETY: the host guarantees `len` readable bytes at `base`.
        let bytes = unsafe { slice::from_raw_parts(base, len) };
        let Ok(text) = std::str::from_utf8(bytes) else {
            tracing::warn!(file = file_name, "source buffer is not UTF-8");
            return ptr::null_mut();
        };
        let buffer = SourceBuffer::new(base as usize, len);
        Box::into_raw(Box::new(ExportedSourceFile::parse(module, file_name, buffer, text)))
    })
}

/// Destroys an exported source file
#[unsafe(no_mangle)]
pub extern "C" fn kt_source_file_destroy(file: *mut ExportedSourceFile) {
    if file.is_null() {
        return;
    }
    // SAFETY: non-null files come from `kt_source_file_export` and are
    // destroyed once.
    drop(unsafe { Box::from_raw(file) });
}

/// Resolves `module.type_name` to a macro handle, or null if it is not a
/// macro
#[unsafe(no_mangle)]
pub extern "C" fn kt_resolve_macro_type(
    bridge: *const MacroBridge,
    module: *const c_char,
    type_name: *const c_char,
) -> *mut MacroHandle {
    guard("kt_resolve_macro_type", ptr::null_mut(), || {
        // SAFETY: non-null bridges come from `kt_bridge_new_*`.
        let bridge = unsafe { bridge.as_ref() };
        let (Some(bridge), Some(module), Some(type_name)) = (bridge, c_str(module), c_str(type_name)) else {
            return ptr::null_mut();
        };
        bridge
            .resolve_macro_type(&MacroTypeIdentity::new(module, type_name))
            .map_or(ptr::null_mut(), Box::into_raw)
    })
}

/// Releases a handle from `kt_resolve_macro_type`
#[unsafe(no_mangle)]
pub extern "C" fn kt_destroy_macro(handle: *mut MacroHandle) {
    if handle.is_null() {
        return;
    }
    // SAFETY: non-null handles come from `kt_resolve_macro_type` and are
    // destroyed once.
    MacroRegistry::destroy(unsafe { Box::from_raw(handle) });
}

/// Expands the freestanding macro whose `#` is at `address`
///
/// On success, `*out_text` receives a NUL-terminated buffer of `*out_len`
/// bytes to be released with `kt_free_expansion_text`. Both are reset to
/// null and zero first.
#[unsafe(no_mangle)]
pub extern "C" fn kt_evaluate_macro(
    bridge: *const MacroBridge,
    sink: *mut KtDiagnosticSink,
    handle: *const MacroHandle,
    file: *const ExportedSourceFile,
    address: usize,
    out_text: *mut *mut u8,
    out_len: *mut usize,
) -> c_int {
    // SAFETY: non-null out-parameters point at writable host storage.
    let (Some(out_text), Some(out_len)) = (unsafe { out_text.as_mut() }, unsafe { out_len.as_mut() }) else {
        return BridgeError::FAILURE;
    };
    let out = OutText::reset(out_text, out_len);
    guard("kt_evaluate_macro", BridgeError::FAILURE, move || {
        // SAFETY: non-null objects were handed out by this module and are
        // still alive.
        let objects = unsafe { (bridge.as_ref(), handle.as_ref(), file.as_ref()) };
        let (Some(bridge), Some(handle), Some(file)) = objects else {
            tracing::warn!("kt_evaluate_macro called with a null object");
            return BridgeError::FAILURE;
        };
        let mut discard = KtDiagnosticSink::DISCARD;
        // SAFETY: a non-null sink points at a live `KtDiagnosticSink`.
        let sink = unsafe { sink.as_mut() }.unwrap_or(&mut discard);
        finish(bridge.evaluate_macro(sink, handle, file, address), out)
    })
}

/// Expands an attached macro in the role tagged `role`
///
/// `parent_file` may be null; it is only consulted for the member
/// attribute role. Out-parameters behave as for `kt_evaluate_macro`.
#[allow(clippy::too_many_arguments, reason = "one argument per host-side value")]
#[unsafe(no_mangle)]
pub extern "C" fn kt_expand_attached_macro(
    bridge: *const MacroBridge,
    sink: *mut KtDiagnosticSink,
    handle: *const MacroHandle,
    role: u8,
    attribute_file: *const ExportedSourceFile,
    attribute_address: usize,
    declaration_file: *const ExportedSourceFile,
    declaration_address: usize,
    parent_file: *const ExportedSourceFile,
    parent_address: usize,
    out_text: *mut *mut u8,
    out_len: *mut usize,
) -> c_int {
    // SAFETY: non-null out-parameters point at writable host storage.
    let (Some(out_text), Some(out_len)) = (unsafe { out_text.as_mut() }, unsafe { out_len.as_mut() }) else {
        return BridgeError::FAILURE;
    };
    let out = OutText::reset(out_text, out_len);
    guard("kt_expand_attached_macro", BridgeError::FAILURE, move || {
        let Some(role) = MacroRole::from_raw(role) else {
            let error = BridgeError::UnknownRole(role);
            tracing::warn!(%error, "rejecting attached expansion");
            return error.status();
        };
        // SAFETY: non-null objects were handed out by this module and are
        // still alive.
        let objects = unsafe {
            (
                bridge.as_ref(),
                handle.as_ref(),
                attribute_file.as_ref(),
                declaration_file.as_ref(),
                parent_file.as_ref(),
            )
        };
        let (Some(bridge), Some(handle), Some(attribute_file), Some(declaration_file), parent_file) = objects
        else {
            tracing::warn!("kt_expand_attached_macro called with a null object");
            return BridgeError::FAILURE;
        };
        let mut discard = KtDiagnosticSink::DISCARD;
        // SAFETY: a non-null sink points at a live `KtDiagnosticSink`.
        let sink = unsafe { sink.as_mut() }.unwrap_or(&mut discard);
        let result = bridge.expand_attached_macro(
            sink,
            handle,
            role,
            Site::new(attribute_file, attribute_address),
            Site::new(declaration_file, declaration_address),
            parent_file.map(|file| Site::new(file, parent_address)),
        );
        finish(result, out)
    })
}

fn finish(result: Result<ResultBuffer, BridgeError>, out: OutText<'_>) -> c_int {
    match result {
        Ok(buffer) => {
            out.deliver(buffer);
            BridgeError::SUCCESS
        }
        Err(error) => {
            tracing::debug!(%error, "expansion request failed");
            error.status()
        }
    }
}

/// Releases an expansion text
#[unsafe(no_mangle)]
pub extern "C" fn kt_free_expansion_text(text: *mut u8, len: usize) {
    if text.is_null() {
        return;
    }
    // SAFETY: non-null texts and their lengths come from a successful
    // expansion and are freed once.
    drop(unsafe { ResultBuffer::from_raw_parts(text, len) });
}

/// Installs the `RUST_LOG` subscriber; see [`crate::init_tracing`]
#[unsafe(no_mangle)]
pub extern "C" fn kt_init_tracing() {
    guard("kt_init_tracing", (), crate::init_tracing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    type Collected = Vec<(u8, String, usize)>;

    extern "C" fn collect(context: *mut c_void, severity: u8, message: *const u8, len: usize, location: *const u8) {
        // SAFETY: the tests pass a `Collected` as context and the bridge
        // passes a live message.
        let (collected, bytes) = unsafe { (&mut *context.cast::<Collected>(), slice::from_raw_parts(message, len)) };
        collected.push((severity, String::from_utf8_lossy(bytes).into_owned(), location as usize));
    }

    struct Host {
        bridge: *mut MacroBridge,
        file: *mut ExportedSourceFile,
        base: usize,
    }

    impl Host {
        fn new(source: &'static str) -> Self {
            let module = CString::new("App").unwrap();
            let file_name = CString::new("main.kt").unwrap();
            let bridge = kt_bridge_new_with_builtins();
            let file = kt_source_file_export(source.as_ptr(), source.len(), module.as_ptr(), file_name.as_ptr());
            assert!(!bridge.is_null() && !file.is_null());
            Self {
                bridge,
                file,
                base: source.as_ptr() as usize,
            }
        }

        fn resolve(&self, type_name: &str) -> *mut MacroHandle {
            let module = CString::new(crate::BUILTIN_MODULE).unwrap();
            let type_name = CString::new(type_name).unwrap();
            kt_resolve_macro_type(self.bridge, module.as_ptr(), type_name.as_ptr())
        }

        fn evaluate(&self, handle: *mut MacroHandle, offset: usize, collected: &mut Collected) -> (c_int, Option<String>) {
            let mut sink = KtDiagnosticSink {
                context: ptr::from_mut(collected).cast(),
                emit: Some(collect),
            };
            let mut text = ptr::null_mut();
            let mut len = usize::MAX;
            let status = kt_evaluate_macro(self.bridge, &mut sink, handle, self.file, self.base + offset, &mut text, &mut len);
            (status, take_text(text, len))
        }
    }

    impl Drop for Host {
        fn drop(&mut self) {
            kt_source_file_destroy(self.file);
            kt_bridge_destroy(self.bridge);
        }
    }

    fn take_text(text: *mut u8, len: usize) -> Option<String> {
        if text.is_null() {
            assert_eq!(len, 0);
            return None;
        }
        // SAFETY: a non-null text is a delivered buffer of `len + 1` bytes.
        let bytes = unsafe { slice::from_raw_parts(text, len + 1) };
        assert_eq!(bytes[len], 0);
        let owned = String::from_utf8_lossy(&bytes[..len]).into_owned();
        kt_free_expansion_text(text, len);
        Some(owned)
    }

    #[test]
    fn evaluate_through_the_c_surface() {
        let host = Host::new("#stringify(1 + 2)");
        let handle = host.resolve("StringifyMacro");
        let mut collected = Collected::new();
        assert_eq!(host.evaluate(handle, 0, &mut collected), (0, Some("\"1 + 2\"".to_owned())));
        assert!(collected.is_empty());
        kt_destroy_macro(handle);
    }

    #[test]
    fn end_of_buffer_fails_without_diagnostics() {
        let source = "#stringify(1 + 2)";
        let host = Host::new(source);
        let handle = host.resolve("StringifyMacro");
        let mut collected = Collected::new();
        assert_eq!(host.evaluate(handle, source.len(), &mut collected), (1, None));
        assert!(collected.is_empty());
        kt_destroy_macro(handle);
    }

    #[test]
    fn diagnostics_carry_host_addresses() {
        let host = Host::new("let x = #warning(\"careful\")");
        let handle = host.resolve("WarningMacro");
        let mut collected = Collected::new();
        assert_eq!(host.evaluate(handle, 8, &mut collected), (0, Some("()".to_owned())));
        assert_eq!(
            collected,
            [(KT_SEVERITY_WARNING, "careful (from macro 'warning')".to_owned(), host.base + 8)]
        );
        kt_destroy_macro(handle);
    }

    #[test]
    fn attached_expansion_through_the_c_surface() {
        let source = "@DictionaryStorage struct S { var x = 1 }";
        let host = Host::new(source);
        let handle = host.resolve("DictionaryStorageMacro");
        let mut text = ptr::null_mut();
        let mut len = 0;
        let status = kt_expand_attached_macro(
            host.bridge,
            ptr::null_mut(),
            handle,
            MacroRole::Member.raw(),
            host.file,
            host.base,
            host.file,
            host.base + source.find("struct").unwrap(),
            ptr::null(),
            0,
            &mut text,
            &mut len,
        );
        assert_eq!(status, 0);
        assert_eq!(take_text(text, len).as_deref(), Some("var _storage: Storage = Storage()"));

        let status = kt_expand_attached_macro(
            host.bridge,
            ptr::null_mut(),
            handle,
            0x40,
            host.file,
            host.base,
            host.file,
            host.base + source.find("struct").unwrap(),
            ptr::null(),
            0,
            &mut text,
            &mut len,
        );
        assert_eq!((status, text.is_null(), len), (1, true, 0));
        kt_destroy_macro(handle);
    }

    #[test]
    fn null_pointers_are_failures() {
        let mut text = ptr::null_mut();
        let mut len = 7;
        let status = kt_evaluate_macro(
            ptr::null(),
            ptr::null_mut(),
            ptr::null(),
            ptr::null(),
            0,
            &mut text,
            &mut len,
        );
        assert_eq!((status, text.is_null(), len), (1, true, 0));
        assert_eq!(
            kt_evaluate_macro(ptr::null(), ptr::null_mut(), ptr::null(), ptr::null(), 0, ptr::null_mut(), ptr::null_mut()),
            1
        );
        assert!(kt_source_file_export(ptr::null(), 0, ptr::null(), ptr::null()).is_null());
        assert!(kt_resolve_macro_type(ptr::null(), ptr::null(), ptr::null()).is_null());
        kt_destroy_macro(ptr::null_mut());
        kt_free_expansion_text(ptr::null_mut(), 0);
    }

    #[test]
    fn non_macros_resolve_to_null() {
        let host = Host::new("");
        assert!(host.resolve("NotAMacro").is_null());
    }

    #[test]
    fn bridges_load_from_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kite-bridge.toml");
        std::fs::write(&path, "[[macros]]\nmodule = \"App\"\ntype = \"Str\"\nbuiltin = \"stringify\"\n").unwrap();
        let path = CString::new(path.to_string_lossy().into_owned()).unwrap();
        let bridge = kt_bridge_new_from_config(path.as_ptr());
        assert!(!bridge.is_null());

        let module = CString::new("App").unwrap();
        let type_name = CString::new("Str").unwrap();
        let handle = kt_resolve_macro_type(bridge, module.as_ptr(), type_name.as_ptr());
        assert!(!handle.is_null());
        kt_destroy_macro(handle);
        kt_bridge_destroy(bridge);

        let missing = CString::new("/nonexistent/kite-bridge.toml").unwrap();
        assert!(kt_bridge_new_from_config(missing.as_ptr()).is_null());
    }
}
