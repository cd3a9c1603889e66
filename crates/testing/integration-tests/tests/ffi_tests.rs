//! Scenarios driven through the C ABI, the way a host compiler calls in

#![allow(unsafe_code, reason = "plays the C host")]

use kt_bridge::ffi::{
    KT_SEVERITY_ERROR, KtDiagnosticSink, kt_bridge_destroy, kt_destroy_macro, kt_evaluate_macro,
    kt_expand_attached_macro, kt_free_expansion_text, kt_resolve_macro_type, kt_source_file_destroy,
    kt_source_file_export,
};
use kt_bridge::{BridgeConfig, ExportedSourceFile, MacroBridge, MacroHandle, MacroRegistry, MacroTypeIdentity};
use kt_macro::{ExpressionMacro, MacroDescriptor, MacroExpansionContext, MacroExpansionError, MacroRole};
use kt_syntax::SyntaxNode;
use kt_syntax::ast::FreestandingMacroExpansion;
use std::ffi::{CString, c_int, c_void};
use std::{ptr, slice};

#[derive(Debug, PartialEq, Eq)]
struct Received {
    severity: u8,
    message: String,
    offset: Option<usize>,
}

struct Host {
    source: &'static str,
    received: Vec<Received>,
}

extern "C" fn receive(context: *mut c_void, severity: u8, message: *const u8, len: usize, location: *const u8) {
    // SAFETY: the context is the `Host` of the running test and the message
    // is live for the duration of the callback.
    let (host, message) = unsafe { (&mut *context.cast::<Host>(), slice::from_raw_parts(message, len)) };
    let offset = (!location.is_null()).then(|| location as usize - host.source.as_ptr() as usize);
    host.received.push(Received {
        severity,
        message: String::from_utf8_lossy(message).into_owned(),
        offset,
    });
}

struct Session {
    bridge: *mut MacroBridge,
    file: *mut ExportedSourceFile,
    host: Box<Host>,
}

impl Session {
    fn new(bridge: MacroBridge, source: &'static str) -> Self {
        let module = CString::new("App").unwrap();
        let file_name = CString::new("main.kt").unwrap();
        let file = kt_source_file_export(source.as_ptr(), source.len(), module.as_ptr(), file_name.as_ptr());
        assert!(!file.is_null());
        Self {
            bridge: Box::into_raw(Box::new(bridge)),
            file,
            host: Box::new(Host {
                source,
                received: Vec::new(),
            }),
        }
    }

    fn address(&self, needle: &str) -> usize {
        self.host.source.as_ptr() as usize + self.host.source.find(needle).unwrap()
    }

    fn resolve(&self, module: &str, type_name: &str) -> *mut MacroHandle {
        let module = CString::new(module).unwrap();
        let type_name = CString::new(type_name).unwrap();
        kt_resolve_macro_type(self.bridge, module.as_ptr(), type_name.as_ptr())
    }

    fn sink(&mut self) -> KtDiagnosticSink {
        KtDiagnosticSink {
            context: ptr::from_mut(self.host.as_mut()).cast(),
            emit: Some(receive),
        }
    }

    fn evaluate(&mut self, handle: *mut MacroHandle, address: usize) -> (c_int, Option<String>) {
        let mut sink = self.sink();
        let mut text = ptr::null_mut();
        let mut len = 99;
        let status = kt_evaluate_macro(self.bridge, &mut sink, handle, self.file, address, &mut text, &mut len);
        (status, take(text, len))
    }

    fn expand(
        &mut self,
        handle: *mut MacroHandle,
        role: u8,
        attribute: usize,
        declaration: usize,
        parent: Option<usize>,
    ) -> (c_int, Option<String>) {
        let mut sink = self.sink();
        let mut text = ptr::null_mut();
        let mut len = 99;
        let (parent_file, parent_address) = parent.map_or((ptr::null(), 0), |address| (self.file.cast_const(), address));
        let status = kt_expand_attached_macro(
            self.bridge,
            &mut sink,
            handle,
            role,
            self.file,
            attribute,
            self.file,
            declaration,
            parent_file,
            parent_address,
            &mut text,
            &mut len,
        );
        (status, take(text, len))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        kt_source_file_destroy(self.file);
        kt_bridge_destroy(self.bridge);
    }
}

/// Copies and frees an expansion text; a failed request must leave null/0
fn take(text: *mut u8, len: usize) -> Option<String> {
    if text.is_null() {
        assert_eq!(len, 0, "failed requests reset the length");
        return None;
    }
    // SAFETY: a delivered text holds `len` bytes plus the terminator.
    let bytes = unsafe { slice::from_raw_parts(text, len + 1) };
    assert_eq!(bytes[len], 0, "texts are NUL-terminated");
    let text_copy = String::from_utf8(bytes[..len].to_vec()).unwrap();
    kt_free_expansion_text(text, len);
    Some(text_copy)
}

struct Boom;

impl ExpressionMacro for Boom {
    fn expansion(
        &self,
        _node: FreestandingMacroExpansion<'_>,
        _context: &mut MacroExpansionContext,
    ) -> Result<SyntaxNode, MacroExpansionError> {
        Err(MacroExpansionError::custom("boom"))
    }
}

#[test]
fn scenario_a_stringify() {
    let mut session = Session::new(MacroBridge::with_builtins(), "#stringify(1 + 2)");
    let handle = session.resolve("KiteMacros", "StringifyMacro");
    let address = session.address("#");
    assert_eq!(session.evaluate(handle, address), (0, Some("\"1 + 2\"".to_owned())));
    assert!(session.host.received.is_empty());
    kt_destroy_macro(handle);
}

#[test]
fn scenario_b_offset_at_buffer_end() {
    let source = "#stringify(1 + 2)";
    let mut session = Session::new(MacroBridge::with_builtins(), source);
    let handle = session.resolve("KiteMacros", "StringifyMacro");
    let end = source.as_ptr() as usize + source.len();
    assert_eq!(session.evaluate(handle, end), (1, None));
    assert!(session.host.received.is_empty());
    kt_destroy_macro(handle);
}

#[test]
fn scenario_c_member_attribute_without_parent() {
    let source = "@DictionaryStorage struct S {\n  var x = 1\n}\n";
    let mut session = Session::new(MacroBridge::with_builtins(), source);
    let handle = session.resolve("KiteMacros", "DictionaryStorageMacro");
    let (attribute, member, group) = (session.address("@"), session.address("var"), session.address("struct"));
    let role = MacroRole::MemberAttribute.raw();

    assert_eq!(session.expand(handle, role, attribute, member, None), (1, None));
    assert_eq!(
        session.expand(handle, role, attribute, member, Some(group)),
        (0, Some("@DictionaryStorageProperty".to_owned()))
    );
    kt_destroy_macro(handle);
}

#[test]
fn scenario_d_failing_macro() {
    let mut registry = MacroRegistry::new();
    registry.register(MacroTypeIdentity::new("App", "Boom"), MacroDescriptor::new("boomMacro").expression(Boom));
    let mut session = Session::new(MacroBridge::new(registry, BridgeConfig::default()), "let v = #boomMacro()");
    let handle = session.resolve("App", "Boom");
    let address = session.address("#");
    assert_eq!(session.evaluate(handle, address), (1, None));
    assert_eq!(
        session.host.received,
        [Received {
            severity: KT_SEVERITY_ERROR,
            message: "boom (from macro 'boomMacro')".to_owned(),
            offset: Some(8),
        }]
    );
    kt_destroy_macro(handle);
}

#[test]
fn unknown_identities_are_not_macros() {
    let session = Session::new(MacroBridge::with_builtins(), "");
    assert!(session.resolve("KiteMacros", "Missing").is_null());
    assert!(session.resolve("Elsewhere", "StringifyMacro").is_null());
}

#[test]
fn invalid_role_tags_are_rejected() {
    let source = "@DictionaryStorage struct S {}";
    let mut session = Session::new(MacroBridge::with_builtins(), source);
    let handle = session.resolve("KiteMacros", "DictionaryStorageMacro");
    let (attribute, group) = (session.address("@"), session.address("struct"));
    for role in [0x00, 0x03, 0x20, 0xff] {
        assert_eq!(session.expand(handle, role, attribute, group, None), (1, None));
    }
    assert_eq!(
        session.expand(handle, MacroRole::Member.raw(), attribute, group, None),
        (0, Some("var _storage: Storage = Storage()".to_owned()))
    );
    kt_destroy_macro(handle);
}
