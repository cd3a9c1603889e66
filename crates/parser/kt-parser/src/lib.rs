//! Parser for Kite source
//!
//! This crate turns source text into the lossless trees of `kt-syntax`.
//! Whole files go through [`parse_source`]; macro implementations build
//! their results from text with the fragment parsers
//! ([`parse_expression`], [`parse_declaration`], [`parse_attribute`],
//! [`parse_accessor`]). Operator chains come out unfolded and are grouped
//! by [`fold_all`].

pub mod error;
mod fold;
mod lexer;
mod parser;

pub use error::ParseError;
pub use fold::{Associativity, FoldError, OperatorTable, PrecedenceGroup, fold_all};

use kt_syntax::{SyntaxElement, SyntaxKind, SyntaxNode};
use parser::Parser;

/// Result of parsing a source file
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Lossless syntax tree; always present, with `Unexpected` nodes where
    /// recovery happened
    pub syntax: SyntaxNode,
    /// Parse errors with detailed diagnostics
    pub errors: Vec<ParseError>,
}

/// Parse a whole file
pub fn parse_source(source: &str) -> ParseResult {
    parse_named_source(source, "<input>")
}

/// Parse a whole file, naming it in diagnostics
pub fn parse_named_source(source: &str, file_name: &str) -> ParseResult {
    let mut parser = Parser::new(source, file_name);
    parser.code_block_item_list(true);
    parser.bump_eof();
    let (syntax, errors) = parser.finish(SyntaxKind::SourceFile);
    tracing::trace!(file = file_name, errors = errors.len(), "parsed source file");
    ParseResult { syntax, errors }
}

fn parse_fragment(
    source: &str,
    construct: &str,
    parse: impl FnOnce(&mut Parser<'_>) -> bool,
) -> Result<SyntaxNode, ParseError> {
    let mut parser = Parser::new(source, "<fragment>");
    let parsed = parse(&mut parser);
    let complete = parser.at(SyntaxKind::Eof);
    let (root, mut errors) = parser.finish(SyntaxKind::SourceFile);

    if !errors.is_empty() {
        return Err(errors.swap_remove(0));
    }
    if !parsed || !complete {
        return Err(ParseError::ParseFailed {
            construct: construct.to_owned(),
            reason: format!("`{}` is not a single {construct}", source.trim()),
        });
    }
    root.children()
        .iter()
        .find_map(|child| match child {
            SyntaxElement::Node(node) => Some(node.clone()),
            SyntaxElement::Token(_) => None,
        })
        .ok_or_else(|| ParseError::ParseFailed {
            construct: construct.to_owned(),
            reason: "fragment is empty".to_owned(),
        })
}

/// Parse a single expression
///
/// # Errors
///
/// Returns an error if the text is not exactly one well-formed expression
pub fn parse_expression(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, "expression", |parser| parser.expr())
}

/// Parse a single declaration
///
/// # Errors
///
/// Returns an error if the text is not exactly one well-formed declaration
pub fn parse_declaration(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, "declaration", |parser| {
        parser.decl();
        true
    })
}

/// Parse a single `@Name` or `@Name(args)` attribute
///
/// # Errors
///
/// Returns an error if the text is not exactly one well-formed attribute
pub fn parse_attribute(source: &str) -> Result<SyntaxNode, ParseError> {
    let list = parse_fragment(source, "attribute", |parser| {
        if !parser.at(SyntaxKind::At) {
            return false;
        }
        parser.attribute_list();
        true
    })?;
    let mut attributes = list.child_nodes();
    match (attributes.next(), attributes.next()) {
        (Some(attribute), None) => Ok(attribute.clone()),
        _ => Err(ParseError::ParseFailed {
            construct: "attribute".to_owned(),
            reason: "expected exactly one attribute".to_owned(),
        }),
    }
}

/// Parse a single accessor such as `get { value }`
///
/// # Errors
///
/// Returns an error if the text is not exactly one well-formed accessor
pub fn parse_accessor(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, "accessor", |parser| {
        parser.accessor_decl();
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use kt_syntax::ast::{AstNode, DeclGroup, VariableDecl};
    use kt_syntax::token_at;

    #[test]
    fn freestanding_expansion_tree() {
        let result = parse_source("#stringify(1 + 2)");
        assert!(result.errors.is_empty());
        expect![[r##"
            SourceFile@0..17
              CodeBlockItemList@0..17
                MacroExpansionExpr@0..17
                  Pound@0..1 "#"
                  Identifier@1..10 "stringify"
                  LParen@10..11 "("
                  LabeledExprList@11..16
                    LabeledExpr@11..16
                      SequenceExpr@11..16
                        IntegerLiteralExpr@11..13
                          IntegerLiteral@11..13 "1"
                        BinaryOperatorExpr@13..15
                          Operator@13..15 "+"
                        IntegerLiteralExpr@15..16
                          IntegerLiteral@15..16 "2"
                  RParen@16..17 ")"
              Eof@17..17 ""
        "##]]
        .assert_eq(&result.syntax.debug_dump());
    }

    #[test]
    fn attached_declarations() {
        let source = "@DictionaryStorage\nstruct Point {\n  var x: Int = 1\n  var y: Int { get { 2 } }\n}\n";
        let result = parse_source(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.syntax.text(), source);
        let Some(group) = result
            .syntax
            .child_node(SyntaxKind::CodeBlockItemList)
            .and_then(|items| items.child_nodes().next())
            .and_then(DeclGroup::cast)
        else {
            panic!("expected a struct");
        };
        assert_eq!(group.name(), Some("Point"));
        assert!(group.as_decl().has_attribute("DictionaryStorage"));
        let members: Vec<_> = group
            .members()
            .filter_map(|member| VariableDecl::cast(member.syntax()))
            .map(|variable| (variable.binding_name(), variable.is_stored()))
            .collect();
        assert_eq!(members, vec![(Some("x"), true), (Some("y"), false)]);
        let struct_keyword = source.find("struct").map(|offset| offset as u32);
        let located = struct_keyword.and_then(|offset| token_at(&result.syntax, offset).ok().flatten());
        assert_eq!(
            located.and_then(|found| found.parent()).map(SyntaxNode::kind),
            Some(SyntaxKind::StructDecl)
        );
    }

    #[test]
    fn every_offset_maps_to_a_token() {
        let source = "import Foundation\n@attr(x: 1) public var value: Int? = [1, 2][0]\nfunc f(_ a: Int) -> Int { return -a }\n";
        let result = parse_source(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.syntax.text(), source);
        for offset in 0..source.len() as u32 {
            let located = token_at(&result.syntax, offset);
            assert!(matches!(located, Ok(Some(ref found)) if found.token().span().contains(offset)));
        }
        assert!(matches!(token_at(&result.syntax, source.len() as u32), Ok(None)));
    }

    #[test]
    fn recovery_keeps_the_tree_lossless() {
        let source = "var = 3\n) struct S { 4 }";
        let result = parse_source(source);
        assert!(!result.errors.is_empty());
        assert_eq!(result.syntax.text(), source);
    }

    #[test]
    fn fragment_parsers() {
        let expr = parse_expression("\"1 + 2\"").map(|node| node.kind()).ok();
        assert_eq!(expr, Some(SyntaxKind::StringLiteralExpr));

        let decl = parse_declaration("var _storage: Storage = Storage()").map(|node| node.kind()).ok();
        assert_eq!(decl, Some(SyntaxKind::VariableDecl));

        let attribute = parse_attribute("@Published").map(|node| node.trimmed_text()).ok();
        assert_eq!(attribute.as_deref(), Some("@Published"));

        let accessor = parse_accessor("set { _storage.set(\"x\", newValue) }").map(|node| node.kind()).ok();
        assert_eq!(accessor, Some(SyntaxKind::AccessorDecl));

        assert!(parse_expression("1 +").is_err());
        assert!(parse_expression("a b").is_err());
        assert!(parse_declaration("1 + 2").is_err());
        assert!(parse_attribute("@A @B").is_err());
    }
}
