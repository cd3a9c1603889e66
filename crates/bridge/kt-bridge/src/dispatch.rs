//! Expansion dispatch
//!
//! Every request is a flat sequence: resolve the anchor nodes, pick the one
//! protocol the request allows, run it on detached copies, record a failure
//! as a diagnostic, then relay everything the macro produced. A panic that
//! is not caught resumes only after the relay. Nothing survives between
//! requests.

use crate::buffer::ResultBuffer;
use crate::config::ExpansionConfig;
use crate::error::BridgeError;
use crate::registry::MacroHandle;
use crate::relay::{DiagnosticSink, relay};
use crate::resolve::{ResolveError, find_node};
use crate::source_file::ExportedSourceFile;
use kt_macro::{
    AccessorMacro, MacroExpansionContext, MacroExpansionError, MacroImplementation, MacroRole,
    MemberAttributeMacro, MemberMacro,
};
use kt_parser::{OperatorTable, ParseError, fold_all};
use kt_span::Span;
use kt_syntax::ast::{AstNode, Attribute, Decl, DeclGroup, FreestandingMacroExpansion};
use kt_syntax::{SyntaxElement, SyntaxKind, SyntaxNode};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Separator between generated accessors and members
const BLOCK_SEPARATOR: &str = "\n\n";
/// Separator between generated attributes
const ATTRIBUTE_SEPARATOR: &str = " ";

/// A host address inside an exported file
#[derive(Debug, Clone, Copy)]
pub struct Site<'file> {
    /// File the address points into
    pub file: &'file ExportedSourceFile,
    /// Absolute host address
    pub address: usize,
}

impl<'file> Site<'file> {
    /// Creates a site
    pub fn new(file: &'file ExportedSourceFile, address: usize) -> Self {
        Self { file, address }
    }

    fn find<S: AstNode<'file>>(self) -> Result<S, BridgeError> {
        find_node::<S>(self.file, self.address).map_err(|error| {
            tracing::warn!(
                file = self.file.file_name(),
                address = self.address,
                shape = S::SHAPE,
                %error,
                "cannot resolve macro anchor"
            );
            BridgeError::from(error)
        })
    }
}

/// Expands the freestanding macro whose `#` is at `site`
///
/// # Errors
///
/// Returns an error if the anchor does not resolve, if the macro has
/// neither an expression nor a declaration implementation, or if the
/// implementation fails. Diagnostics are relayed to `sink` in every case.
pub fn evaluate(
    handle: &MacroHandle,
    site: Site<'_>,
    config: ExpansionConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<ResultBuffer, BridgeError> {
    let file = site.file;
    let mut context = MacroExpansionContext::new(file.module_name(), file.file_name());
    let mut guard = PanicGuard::new(config.catch_panics);
    let outcome = expand_freestanding(handle, site, &mut guard, &mut context);
    relay(
        context.take_diagnostics(),
        handle.name(),
        config.annotate_macro_name,
        file,
        sink,
    );
    guard.finish();
    outcome.map(|text| ResultBuffer::new(&text))
}

fn expand_freestanding(
    handle: &MacroHandle,
    site: Site<'_>,
    guard: &mut PanicGuard,
    context: &mut MacroExpansionContext,
) -> Result<String, BridgeError> {
    let name = handle.name();
    let anchor = site.find::<FreestandingMacroExpansion<'_>>()?;
    let anchor_span = anchor.syntax().trimmed_span();
    tracing::debug!(macro_name = name, span = %anchor_span, "resolved freestanding expansion");
    reject_malformed(site.file, anchor.syntax().span(), name, context)?;

    let implementations = handle.descriptor().implementations();
    let expression = implementations.iter().find_map(|implementation| match implementation {
        MacroImplementation::Expression(expression) => Some(expression),
        _ => None,
    });
    if let Some(expression) = expression {
        tracing::debug!(macro_name = name, role = %MacroRole::Expression, "dispatching");
        let detached = anchor.syntax().detached_as(SyntaxKind::MacroExpansionExpr);
        let folded = match fold_all(&detached, &OperatorTable::standard()) {
            Ok(folded) => folded,
            Err(error) => {
                context.error(error.to_string(), error.span());
                return Err(BridgeError::ExpansionFailed {
                    name: name.to_owned(),
                });
            }
        };
        let node = view::<FreestandingMacroExpansion<'_>>(&folded)?;
        let result = guard.run(|| expression.expansion(node, context));
        let expansion = settle(result, anchor_span, name, context)?;
        return Ok(expansion.trimmed_text());
    }

    let declaration = implementations.iter().find_map(|implementation| match implementation {
        MacroImplementation::Declaration(declaration) => Some(declaration),
        _ => None,
    });
    if let Some(declaration) = declaration {
        tracing::debug!(macro_name = name, role = %MacroRole::FreestandingDeclaration, "dispatching");
        let detached = anchor.syntax().detached_as(SyntaxKind::MacroExpansionDecl);
        let node = view::<FreestandingMacroExpansion<'_>>(&detached)?;
        let result = guard.run(|| declaration.expansion(node, context));
        let declarations = settle(result, anchor_span, name, context)?;
        return Ok(join_block_items(declarations));
    }

    tracing::warn!(macro_name = name, roles = ?handle.descriptor().roles(), "macro is not freestanding");
    Err(BridgeError::UnsupportedRole {
        name: name.to_owned(),
        role: MacroRole::Expression,
    })
}

/// Expands the attached macro written at `attribute` on `declaration`
///
/// `parent` is only resolved for [`MacroRole::MemberAttribute`].
///
/// # Errors
///
/// Returns an error if a required anchor does not resolve, if the macro has
/// no implementation for `role`, or if the implementation fails.
/// Diagnostics are relayed to `sink` against the declaration's file in
/// every case.
pub fn expand_attached(
    handle: &MacroHandle,
    role: MacroRole,
    attribute: Site<'_>,
    declaration: Site<'_>,
    parent: Option<Site<'_>>,
    config: ExpansionConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<ResultBuffer, BridgeError> {
    let file = declaration.file;
    let mut context = MacroExpansionContext::new(file.module_name(), file.file_name());
    let mut guard = PanicGuard::new(config.catch_panics);
    let outcome = expand_attached_in(
        handle,
        role,
        attribute,
        declaration,
        parent,
        &mut guard,
        &mut context,
    );
    relay(
        context.take_diagnostics(),
        handle.name(),
        config.annotate_macro_name,
        file,
        sink,
    );
    guard.finish();
    outcome.map(|text| ResultBuffer::new(&text))
}

/// The attached protocol a request was paired with
enum Attached<'a> {
    Accessor(&'a dyn AccessorMacro),
    MemberAttribute(&'a dyn MemberAttributeMacro),
    Member(&'a dyn MemberMacro),
}

/// Pairs an implementation with a role tag; only matching pairs dispatch
fn pair(implementation: &MacroImplementation, role: MacroRole) -> Option<Attached<'_>> {
    match (implementation, role) {
        (MacroImplementation::Accessor(accessor), MacroRole::Accessor) => {
            Some(Attached::Accessor(accessor.as_ref()))
        }
        (MacroImplementation::MemberAttribute(member_attribute), MacroRole::MemberAttribute) => {
            Some(Attached::MemberAttribute(member_attribute.as_ref()))
        }
        (MacroImplementation::Member(member), MacroRole::Member) => Some(Attached::Member(member.as_ref())),
        (
            MacroImplementation::Expression(_)
            | MacroImplementation::Declaration(_)
            | MacroImplementation::Accessor(_)
            | MacroImplementation::MemberAttribute(_)
            | MacroImplementation::Member(_),
            _,
        ) => None,
    }
}

fn expand_attached_in(
    handle: &MacroHandle,
    role: MacroRole,
    attribute_site: Site<'_>,
    declaration_site: Site<'_>,
    parent_site: Option<Site<'_>>,
    guard: &mut PanicGuard,
    context: &mut MacroExpansionContext,
) -> Result<String, BridgeError> {
    let name = handle.name();
    let attribute = attribute_site.find::<Attribute<'_>>()?;
    let declaration = declaration_site.find::<Decl<'_>>()?;
    let parent = match (role, parent_site) {
        (MacroRole::MemberAttribute, Some(site)) => site.find::<DeclGroup<'_>>().ok(),
        _ => None,
    };
    let anchor_span = declaration.syntax().trimmed_span();
    tracing::debug!(
        macro_name = name,
        %role,
        attribute = attribute.name().unwrap_or_default(),
        declaration = %declaration.syntax().kind(),
        has_parent = parent.is_some(),
        "resolved attached expansion"
    );

    let paired = handle
        .descriptor()
        .implementations()
        .iter()
        .find_map(|implementation| pair(implementation, role));
    let Some(paired) = paired else {
        tracing::warn!(macro_name = name, %role, roles = ?handle.descriptor().roles(), "unsupported role");
        return Err(BridgeError::UnsupportedRole {
            name: name.to_owned(),
            role,
        });
    };

    let attribute_node = attribute.syntax().detached();
    let attribute = view::<Attribute<'_>>(&attribute_node)?;
    let declaration_node = declaration.syntax().detached();

    match paired {
        Attached::Accessor(accessor) => {
            let declaration = view::<Decl<'_>>(&declaration_node)?;
            let result = guard.run(|| accessor.expansion(attribute, declaration, context));
            let accessors = settle(result, anchor_span, name, context)?;
            Ok(join_trimmed(&accessors, BLOCK_SEPARATOR))
        }
        Attached::MemberAttribute(member_attribute) => {
            let Some(parent) = parent else {
                tracing::warn!(macro_name = name, "member attribute expansion without a parent group");
                return Err(BridgeError::MissingParentGroup {
                    name: name.to_owned(),
                });
            };
            let group_node = parent.syntax().detached();
            let group = view::<DeclGroup<'_>>(&group_node)?;
            let member = view::<Decl<'_>>(&declaration_node)?;
            let result = guard.run(|| member_attribute.expansion(attribute, group, member, context));
            let attributes = settle(result, anchor_span, name, context)?;
            Ok(join_trimmed(&attributes, ATTRIBUTE_SEPARATOR))
        }
        Attached::Member(member) => {
            let Some(group) = DeclGroup::cast(&declaration_node) else {
                tracing::warn!(
                    macro_name = name,
                    kind = %declaration_node.kind(),
                    "member expansion on a declaration without members"
                );
                return Err(BridgeError::NotADeclGroup {
                    name: name.to_owned(),
                });
            };
            let result = guard.run(|| member.expansion(attribute, group, context));
            let members = settle(result, anchor_span, name, context)?;
            Ok(join_trimmed(&members, BLOCK_SEPARATOR))
        }
    }
}

/// Narrows a detached copy back to the shape it was resolved as
fn view<'n, S: AstNode<'n>>(node: &'n SyntaxNode) -> Result<S, BridgeError> {
    S::cast(node).ok_or_else(|| {
        BridgeError::from(ResolveError::ShapeMismatch {
            expected: S::SHAPE,
            found: node.kind(),
            offset: node.span().start,
        })
    })
}

/// Rejects an anchor the parser had to recover inside
///
/// `anchor` includes trailing trivia and its end counts: a missing closing
/// delimiter is reported at the token after the anchor.
fn reject_malformed(
    file: &ExportedSourceFile,
    anchor: Span,
    name: &str,
    context: &mut MacroExpansionContext,
) -> Result<(), BridgeError> {
    let offset_of = |error: &ParseError| {
        error
            .span()
            .and_then(|span| u32::try_from(span.offset()).ok())
    };
    let Some((error, offset)) = file.parse_errors().iter().find_map(|error| {
        offset_of(error)
            .filter(|&offset| anchor.start <= offset && offset <= anchor.end)
            .map(|offset| (error, offset))
    }) else {
        return Ok(());
    };
    tracing::debug!(macro_name = name, %error, "macro expansion does not parse");
    context.error(format!("malformed macro expansion: {error}"), Span::empty(offset));
    Err(BridgeError::ExpansionFailed {
        name: name.to_owned(),
    })
}

/// Runs macro implementations, always turning a panic into an error
///
/// With `catch_panics` unset the first panic is also kept, and
/// [`PanicGuard::finish`] resumes it once diagnostics have been relayed.
struct PanicGuard {
    catch_panics: bool,
    escaped: Option<Box<dyn Any + Send>>,
}

impl PanicGuard {
    fn new(catch_panics: bool) -> Self {
        Self {
            catch_panics,
            escaped: None,
        }
    }

    fn run<T>(
        &mut self,
        expand: impl FnOnce() -> Result<T, MacroExpansionError>,
    ) -> Result<T, MacroExpansionError> {
        panic::catch_unwind(AssertUnwindSafe(expand)).unwrap_or_else(|payload| {
            let error = MacroExpansionError::custom(format!(
                "macro implementation panicked: {}",
                panic_message(payload.as_ref())
            ));
            if !self.catch_panics && self.escaped.is_none() {
                self.escaped = Some(payload);
            }
            Err(error)
        })
    }

    fn finish(self) {
        if let Some(payload) = self.escaped {
            panic::resume_unwind(payload);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

/// Records a failed expansion as one error diagnostic
fn settle<T>(
    result: Result<T, MacroExpansionError>,
    anchor: Span,
    name: &str,
    context: &mut MacroExpansionContext,
) -> Result<T, BridgeError> {
    result.map_err(|error| {
        tracing::debug!(macro_name = name, %error, "macro implementation failed");
        context.error(error.to_string(), error.span().unwrap_or(anchor));
        BridgeError::ExpansionFailed {
            name: name.to_owned(),
        }
    })
}

fn join_trimmed(nodes: &[SyntaxNode], separator: &str) -> String {
    nodes
        .iter()
        .map(SyntaxNode::trimmed_text)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Wraps generated declarations into one block item list, one per line
fn join_block_items(items: Vec<SyntaxNode>) -> String {
    let children = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let on_own_line = index == 0
                || item
                    .first_token()
                    .is_some_and(|token| token.leading_trivia().contains('\n'));
            let item = if on_own_line { item } else { item.with_leading_trivia("\n") };
            SyntaxElement::Node(item)
        })
        .collect();
    SyntaxNode::new(SyntaxKind::CodeBlockItemList, children).trimmed_text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BUILTIN_MODULE, MacroRegistry, MacroTypeIdentity};
    use kt_macro::{DeclarationMacro, Diagnostic, ExpressionMacro, MacroDescriptor};
    use kt_parser::parse_declaration;

    fn handle(type_name: &str) -> Box<MacroHandle> {
        let registry = MacroRegistry::with_builtins();
        let Some(handle) = registry.resolve(&MacroTypeIdentity::new(BUILTIN_MODULE, type_name)) else {
            panic!("missing builtin {type_name}");
        };
        handle
    }

    fn custom(descriptor: MacroDescriptor) -> Box<MacroHandle> {
        let mut registry = MacroRegistry::new();
        let identity = MacroTypeIdentity::new("Test", descriptor.name().to_owned());
        registry.register(identity.clone(), descriptor);
        let Some(handle) = registry.resolve(&identity) else {
            panic!("custom macro did not resolve");
        };
        handle
    }

    fn at<'f>(file: &'f ExportedSourceFile, source: &str, needle: &str) -> Site<'f> {
        let offset = source.find(needle).unwrap_or_else(|| panic!("`{needle}` not in source"));
        let address = file.address_of(u32::try_from(offset).unwrap()).unwrap();
        Site::new(file, address)
    }

    fn messages(sink: &[Diagnostic]) -> Vec<String> {
        sink.iter().map(ToString::to_string).collect()
    }

    struct Failing;

    impl ExpressionMacro for Failing {
        fn expansion(
            &self,
            _node: FreestandingMacroExpansion<'_>,
            _context: &mut MacroExpansionContext,
        ) -> Result<SyntaxNode, MacroExpansionError> {
            Err(MacroExpansionError::custom("boom"))
        }
    }

    struct Panicking;

    impl DeclarationMacro for Panicking {
        fn expansion(
            &self,
            _node: FreestandingMacroExpansion<'_>,
            _context: &mut MacroExpansionContext,
        ) -> Result<Vec<SyntaxNode>, MacroExpansionError> {
            panic!("boom")
        }
    }

    #[test]
    fn expression_expansion_returns_trimmed_text() {
        let source = "#stringify(1 + 2)";
        let file = ExportedSourceFile::from_text("App", "main.kt", source);
        let mut sink = Vec::new();
        let result = evaluate(&handle("StringifyMacro"), at(&file, source, "#"), ExpansionConfig::default(), &mut sink);
        assert_eq!(result.map(|buffer| buffer.as_str().to_owned()), Ok("\"1 + 2\"".to_owned()));
        assert!(sink.is_empty());
    }

    #[test]
    fn warnings_are_relayed_on_success() {
        let source = "let x = #warning(\"careful\")";
        let file = ExportedSourceFile::from_text("App", "main.kt", source);
        let mut sink = Vec::new();
        let result = evaluate(&handle("WarningMacro"), at(&file, source, "#"), ExpansionConfig::default(), &mut sink);
        assert_eq!(result.map(|buffer| buffer.as_str().to_owned()), Ok("()".to_owned()));
        assert_eq!(messages(&sink), ["warning: careful (from macro 'warning')"]);
        assert_eq!(sink[0].span, Span::new(8, 27));
    }

    #[test]
    fn declarations_are_joined_one_per_line() {
        let source = "#declareStructs(\"A\", \"B\")";
        let file = ExportedSourceFile::from_text("App", "main.kt", source);
        let mut sink = Vec::new();
        let result = evaluate(&handle("DeclareStructsMacro"), at(&file, source, "#"), ExpansionConfig::default(), &mut sink);
        assert_eq!(result.map(|buffer| buffer.as_str().to_owned()), Ok("struct A {}\nstruct B {}".to_owned()));
    }

    #[test]
    fn later_declarations_start_on_their_own_line() {
        let items = [("let a = 1", ""), ("let b = 2", " "), ("let c = 3", "\n\n")]
            .into_iter()
            .map(|(source, trivia)| parse_declaration(source).unwrap().with_leading_trivia(trivia))
            .collect();
        assert_eq!(join_block_items(items), "let a = 1\nlet b = 2\n\nlet c = 3");
    }

    #[test]
    fn implementation_errors_become_one_diagnostic() {
        let source = "#explode()";
        let file = ExportedSourceFile::from_text("App", "main.kt", source);
        let mut sink = Vec::new();
        let failing = custom(MacroDescriptor::new("explode").expression(Failing));
        let result = evaluate(&failing, at(&file, source, "#"), ExpansionConfig::default(), &mut sink);
        assert_eq!(result, Err(BridgeError::ExpansionFailed { name: "explode".to_owned() }));
        assert_eq!(messages(&sink), ["error: boom (from macro 'explode')"]);
        assert_eq!(sink[0].span, Span::new(0, 10));
    }

    #[test]
    fn panics_become_one_diagnostic() {
        let source = "#explode()";
        let file = ExportedSourceFile::from_text("App", "main.kt", source);
        let mut sink = Vec::new();
        let panicking = custom(MacroDescriptor::new("explode").declaration(Panicking));
        let result = evaluate(&panicking, at(&file, source, "#"), ExpansionConfig::default(), &mut sink);
        assert!(result.is_err());
        assert_eq!(
            messages(&sink),
            ["error: macro implementation panicked: boom (from macro 'explode')"]
        );
    }

    #[test]
    fn malformed_arguments_fail_with_one_diagnostic() {
        for (source, offset) in [("#stringify(1 + )", 15), ("#stringify(1 + 2 *)", 17), ("#stringify(a = )", 15)] {
            let file = ExportedSourceFile::from_text("App", "main.kt", source);
            let mut sink = Vec::new();
            let result = evaluate(&handle("StringifyMacro"), at(&file, source, "#"), ExpansionConfig::default(), &mut sink);
            assert_eq!(result, Err(BridgeError::ExpansionFailed { name: "stringify".to_owned() }), "{source}");
            assert_eq!(sink.len(), 1, "{source}: {:?}", messages(&sink));
            assert!(sink[0].message.starts_with("malformed macro expansion: "), "{source}");
            assert_eq!(sink[0].span, Span::empty(offset), "{source}");
        }
    }

    #[test]
    fn uncaught_panics_resume_after_relay() {
        let source = "#explode()";
        let file = ExportedSourceFile::from_text("App", "main.kt", source);
        let mut sink = Vec::new();
        let panicking = custom(MacroDescriptor::new("explode").declaration(Panicking));
        let config = ExpansionConfig {
            catch_panics: false,
            ..ExpansionConfig::default()
        };
        let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
            evaluate(&panicking, at(&file, source, "#"), config, &mut sink)
        }));
        assert!(unwound.is_err());
        assert_eq!(
            messages(&sink),
            ["error: macro implementation panicked: boom (from macro 'explode')"]
        );
    }

    #[test]
    fn attached_macros_are_not_freestanding() {
        let source = "#DictionaryStorage()";
        let file = ExportedSourceFile::from_text("App", "main.kt", source);
        let mut sink = Vec::new();
        let result = evaluate(&handle("DictionaryStorageMacro"), at(&file, source, "#"), ExpansionConfig::default(), &mut sink);
        assert!(matches!(result, Err(BridgeError::UnsupportedRole { role: MacroRole::Expression, .. })));
        assert!(sink.is_empty());
    }

    const STORAGE: &str = "@DictionaryStorage\nstruct Point {\n  var x: Int = 1\n  @DictionaryStorageProperty var y: Int\n}\n";

    #[test]
    fn accessor_expansion() {
        let file = ExportedSourceFile::from_text("App", "point.kt", STORAGE);
        let mut sink = Vec::new();
        let result = expand_attached(
            &handle("DictionaryStoragePropertyMacro"),
            MacroRole::Accessor,
            at(&file, STORAGE, "@DictionaryStorageProperty"),
            at(&file, STORAGE, "var y"),
            None,
            ExpansionConfig::default(),
            &mut sink,
        );
        assert_eq!(
            result.map(|buffer| buffer.as_str().to_owned()),
            Ok("get { _storage.get(\"y\") }\n\nset { _storage.set(\"y\", newValue) }".to_owned())
        );
    }

    #[test]
    fn member_and_member_attribute_expansion() {
        let file = ExportedSourceFile::from_text("App", "point.kt", STORAGE);
        let storage = handle("DictionaryStorageMacro");
        let mut sink = Vec::new();

        let members = expand_attached(
            &storage,
            MacroRole::Member,
            at(&file, STORAGE, "@"),
            at(&file, STORAGE, "struct"),
            None,
            ExpansionConfig::default(),
            &mut sink,
        );
        assert_eq!(
            members.map(|buffer| buffer.as_str().to_owned()),
            Ok("var _storage: Storage = Storage()".to_owned())
        );

        let attributes = expand_attached(
            &storage,
            MacroRole::MemberAttribute,
            at(&file, STORAGE, "@"),
            at(&file, STORAGE, "var x"),
            Some(at(&file, STORAGE, "struct")),
            ExpansionConfig::default(),
            &mut sink,
        );
        assert_eq!(
            attributes.map(|buffer| buffer.as_str().to_owned()),
            Ok("@DictionaryStorageProperty".to_owned())
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn member_attribute_needs_a_parent() {
        let file = ExportedSourceFile::from_text("App", "point.kt", STORAGE);
        let mut sink = Vec::new();
        let end = file.buffer().base_address() + STORAGE.len();
        for parent in [None, Some(Site::new(&file, end))] {
            let result = expand_attached(
                &handle("DictionaryStorageMacro"),
                MacroRole::MemberAttribute,
                at(&file, STORAGE, "@"),
                at(&file, STORAGE, "var x"),
                parent,
                ExpansionConfig::default(),
                &mut sink,
            );
            assert!(matches!(result, Err(BridgeError::MissingParentGroup { .. })));
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn member_role_needs_a_group() {
        let file = ExportedSourceFile::from_text("App", "point.kt", STORAGE);
        let mut sink = Vec::new();
        let result = expand_attached(
            &handle("DictionaryStorageMacro"),
            MacroRole::Member,
            at(&file, STORAGE, "@"),
            at(&file, STORAGE, "var x"),
            None,
            ExpansionConfig::default(),
            &mut sink,
        );
        assert!(matches!(result, Err(BridgeError::NotADeclGroup { .. })));
    }

    #[test]
    fn attached_failures_point_at_the_declaration() {
        let file = ExportedSourceFile::from_text("App", "point.kt", STORAGE);
        let mut sink = Vec::new();
        let result = expand_attached(
            &handle("DictionaryStoragePropertyMacro"),
            MacroRole::Accessor,
            at(&file, STORAGE, "@"),
            at(&file, STORAGE, "struct"),
            None,
            ExpansionConfig::default(),
            &mut sink,
        );
        assert!(matches!(result, Err(BridgeError::ExpansionFailed { .. })));
        assert_eq!(sink.len(), 1);
        // the struct's span starts at its own attribute list
        assert_eq!(sink[0].span.start, 0);
        assert!(sink[0].message.ends_with("(from macro 'DictionaryStorageProperty')"));
    }

    #[test]
    fn every_mismatched_pair_is_rejected() {
        let implementations = [
            MacroDescriptor::new("m").expression(kt_macro::builtins::StringifyMacro),
            MacroDescriptor::new("m").declaration(kt_macro::builtins::DeclareStructsMacro),
            MacroDescriptor::new("m").accessor(kt_macro::builtins::DictionaryStoragePropertyMacro),
            MacroDescriptor::new("m").member_attribute(kt_macro::builtins::DictionaryStorageMacro),
            MacroDescriptor::new("m").member(kt_macro::builtins::DictionaryStorageMacro),
        ];
        for descriptor in &implementations {
            let implementation = &descriptor.implementations()[0];
            for role in MacroRole::ALL {
                let paired = pair(implementation, role).is_some();
                let expected = implementation.role() == role && role.is_attached();
                assert_eq!(paired, expected, "{:?} as {role}", implementation);
            }
        }
    }
}
