//! Builtin macro implementations

use crate::context::MacroExpansionContext;
use crate::error::MacroExpansionError;
use crate::protocols::{
    AccessorMacro, DeclarationMacro, ExpressionMacro, MemberAttributeMacro, MemberMacro,
};
use kt_parser::{parse_accessor, parse_attribute, parse_declaration, parse_expression};
use kt_syntax::ast::{
    AstNode, Attribute, Decl, DeclGroup, Expr, FreestandingMacroExpansion, StringLiteralExpr,
    VariableDecl,
};
use kt_syntax::{SyntaxKind, SyntaxNode};

/// Name of the member added by `@DictionaryStorage`
const STORAGE_MEMBER: &str = "_storage";
/// Attribute `@DictionaryStorage` marks stored properties with
const PROPERTY_ATTRIBUTE: &str = "DictionaryStorageProperty";

/// The only argument of `node`
fn single_argument(node: FreestandingMacroExpansion<'_>) -> Result<Expr<'_>, MacroExpansionError> {
    let mut arguments = node.arguments().filter_map(|argument| argument.expression());
    match (arguments.next(), arguments.count()) {
        (Some(argument), 0) => Ok(argument),
        (first, rest) => Err(MacroExpansionError::ArgumentCount {
            name: node.macro_name().unwrap_or_default().to_owned(),
            expected: 1,
            found: usize::from(first.is_some()) + rest,
        }),
    }
}

/// The value of a string literal argument
fn string_argument(argument: Expr<'_>) -> Result<String, MacroExpansionError> {
    StringLiteralExpr::cast(argument.syntax())
        .and_then(StringLiteralExpr::value)
        .ok_or_else(|| MacroExpansionError::UnexpectedArgument {
            expected: "a string literal",
            found: argument.syntax().trimmed_text(),
            span: argument.syntax().trimmed_span(),
        })
}

/// Source text of a string literal holding `value`
fn string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for ch in value.chars() {
        match ch {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\t' => literal.push_str("\\t"),
            '\r' => literal.push_str("\\r"),
            _ => literal.push(ch),
        }
    }
    literal.push('"');
    literal
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

/// `#stringify(expr)`: the argument's source text as a string literal
#[derive(Debug, Clone, Copy, Default)]
pub struct StringifyMacro;

impl ExpressionMacro for StringifyMacro {
    fn expansion(
        &self,
        node: FreestandingMacroExpansion<'_>,
        _context: &mut MacroExpansionContext,
    ) -> Result<SyntaxNode, MacroExpansionError> {
        let argument = single_argument(node)?;
        let text = argument.syntax().trimmed_text();
        Ok(parse_expression(&string_literal(&text))?)
    }
}

/// `#warning("message")`: emits a warning and expands to `()`
#[derive(Debug, Clone, Copy, Default)]
pub struct WarningMacro;

impl ExpressionMacro for WarningMacro {
    fn expansion(
        &self,
        node: FreestandingMacroExpansion<'_>,
        context: &mut MacroExpansionContext,
    ) -> Result<SyntaxNode, MacroExpansionError> {
        let message = string_argument(single_argument(node)?)?;
        context.warning(message, node.syntax().trimmed_span());
        Ok(parse_expression("()")?)
    }
}

/// `#declareStructs("A", "B")`: one empty struct per argument
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclareStructsMacro;

impl DeclarationMacro for DeclareStructsMacro {
    fn expansion(
        &self,
        node: FreestandingMacroExpansion<'_>,
        _context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError> {
        let mut declarations = Vec::new();
        for argument in node.arguments().filter_map(|argument| argument.expression()) {
            let name = string_argument(argument)?;
            if !is_identifier(&name) {
                return Err(MacroExpansionError::UnexpectedArgument {
                    expected: "a type name",
                    found: name,
                    span: argument.syntax().trimmed_span(),
                });
            }
            declarations.push(parse_declaration(&format!("struct {name} {{}}"))?);
        }
        Ok(declarations)
    }
}

/// `@DictionaryStorage` on a type
///
/// Adds a `_storage` member and marks every stored instance property with
/// `@DictionaryStorageProperty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DictionaryStorageMacro;

impl MemberMacro for DictionaryStorageMacro {
    fn expansion(
        &self,
        attribute: Attribute<'_>,
        group: DeclGroup<'_>,
        _context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError> {
        if group.syntax().kind() == SyntaxKind::ProtocolDecl {
            return Err(MacroExpansionError::InvalidAttachment {
                name: attribute.name().unwrap_or_default().to_owned(),
                expected: "a struct, class, enum or extension",
                span: group.syntax().trimmed_span(),
            });
        }
        let has_storage = group
            .members()
            .filter_map(|member| VariableDecl::cast(member.syntax()))
            .any(|variable| variable.binding_name() == Some(STORAGE_MEMBER));
        if has_storage {
            return Ok(Vec::new());
        }
        Ok(vec![parse_declaration(&format!("var {STORAGE_MEMBER}: Storage = Storage()"))?])
    }
}

impl MemberAttributeMacro for DictionaryStorageMacro {
    fn expansion(
        &self,
        _attribute: Attribute<'_>,
        _group: DeclGroup<'_>,
        member: Decl<'_>,
        _context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError> {
        let Some(variable) = VariableDecl::cast(member.syntax()) else {
            return Ok(Vec::new());
        };
        let wants_attribute = variable.is_stored()
            && !variable.is_static()
            && !variable.is_let()
            && variable.binding_name() != Some(STORAGE_MEMBER)
            && !member.has_attribute(PROPERTY_ATTRIBUTE);
        if !wants_attribute {
            return Ok(Vec::new());
        }
        Ok(vec![parse_attribute(&format!("@{PROPERTY_ATTRIBUTE}"))?])
    }
}

/// `@DictionaryStorageProperty` on a stored `var`
///
/// Routes the property through the `_storage` member, falling back to the
/// initial value when the key is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DictionaryStoragePropertyMacro;

impl AccessorMacro for DictionaryStoragePropertyMacro {
    fn expansion(
        &self,
        attribute: Attribute<'_>,
        declaration: Decl<'_>,
        _context: &mut MacroExpansionContext,
    ) -> Result<Vec<SyntaxNode>, MacroExpansionError> {
        let invalid = || MacroExpansionError::InvalidAttachment {
            name: attribute.name().unwrap_or_default().to_owned(),
            expected: "a stored `var`",
            span: declaration.syntax().trimmed_span(),
        };
        let variable = VariableDecl::cast(declaration.syntax())
            .filter(|variable| variable.is_stored() && !variable.is_let())
            .ok_or_else(invalid)?;
        let name = variable.binding_name().ok_or_else(invalid)?;

        let key = string_literal(name);
        let getter = match variable.initializer() {
            Some(initial) => format!(
                "get {{ {STORAGE_MEMBER}.get({key}, default: {}) }}",
                initial.syntax().trimmed_text()
            ),
            None => format!("get {{ {STORAGE_MEMBER}.get({key}) }}"),
        };
        let setter = format!("set {{ {STORAGE_MEMBER}.set({key}, newValue) }}");
        Ok(vec![parse_accessor(&getter)?, parse_accessor(&setter)?])
    }
}
