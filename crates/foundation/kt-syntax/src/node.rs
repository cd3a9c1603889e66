//! Lossless syntax tree
//!
//! Every byte of the source belongs to exactly one token, either as token
//! text or as the token's leading/trailing trivia. A node's span is the
//! union of its children's spans and the children tile it without gaps.

use crate::kind::SyntaxKind;
use kt_span::Span;
use std::fmt::{self, Write as _};

/// A leaf of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    kind: SyntaxKind,
    span: Span,
    leading_trivia: String,
    text: String,
    trailing_trivia: String,
}

impl SyntaxToken {
    /// Creates a token whose full text (trivia included) starts at `start`
    pub fn new(
        kind: SyntaxKind,
        start: u32,
        leading_trivia: impl Into<String>,
        text: impl Into<String>,
        trailing_trivia: impl Into<String>,
    ) -> Self {
        let mut token = Self {
            kind,
            span: Span::empty(start),
            leading_trivia: leading_trivia.into(),
            text: text.into(),
            trailing_trivia: trailing_trivia.into(),
        };
        token.span = Span::new(start, start + token.full_len());
        token
    }

    /// The token kind
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// Span of the token including its trivia
    pub fn span(&self) -> Span {
        self.span
    }

    /// Span of the token text without trivia
    pub fn text_span(&self) -> Span {
        let start = self.span.start + self.leading_trivia.len() as u32;
        Span::new(start, start + self.text.len() as u32)
    }

    /// The token text without trivia
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trivia preceding the token text
    pub fn leading_trivia(&self) -> &str {
        &self.leading_trivia
    }

    /// Trivia following the token text on the same line
    pub fn trailing_trivia(&self) -> &str {
        &self.trailing_trivia
    }

    fn full_len(&self) -> u32 {
        (self.leading_trivia.len() + self.text.len() + self.trailing_trivia.len()) as u32
    }

    fn write_full_text(&self, out: &mut String) {
        out.push_str(&self.leading_trivia);
        out.push_str(&self.text);
        out.push_str(&self.trailing_trivia);
    }
}

/// A child of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxElement {
    /// Interior node
    Node(SyntaxNode),
    /// Leaf token
    Token(SyntaxToken),
}

impl SyntaxElement {
    /// Kind of the wrapped node or token
    pub fn kind(&self) -> SyntaxKind {
        match self {
            Self::Node(node) => node.kind(),
            Self::Token(token) => token.kind(),
        }
    }

    /// Span of the wrapped node or token
    pub fn span(&self) -> Span {
        match self {
            Self::Node(node) => node.span(),
            Self::Token(token) => token.span(),
        }
    }

    /// The wrapped node, if this is one
    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Token(_) => None,
        }
    }

    /// The wrapped token, if this is one
    pub fn as_token(&self) -> Option<&SyntaxToken> {
        match self {
            Self::Node(_) => None,
            Self::Token(token) => Some(token),
        }
    }

    fn relayout(&mut self, start: u32) -> u32 {
        match self {
            Self::Node(node) => node.relayout(start),
            Self::Token(token) => {
                token.span = Span::new(start, start + token.full_len());
                token.span.end
            }
        }
    }
}

/// Interior node of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    span: Span,
    children: Vec<SyntaxElement>,
}

impl SyntaxNode {
    /// Builds a standalone node, laying its children out from offset zero
    pub fn new(kind: SyntaxKind, children: Vec<SyntaxElement>) -> Self {
        let mut node = Self {
            kind,
            span: Span::empty(0),
            children,
        };
        node.relayout(0);
        node
    }

    /// Builds a node from children that are already positioned and
    /// contiguous; a node without children sits at `empty_at`
    pub fn from_positioned(kind: SyntaxKind, children: Vec<SyntaxElement>, empty_at: u32) -> Self {
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => Span::new(first.span().start, last.span().end),
            _ => Span::empty(empty_at),
        };
        Self {
            kind,
            span,
            children,
        }
    }

    /// The node kind
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// Span of the node including the trivia of its first and last token
    pub fn span(&self) -> Span {
        self.span
    }

    /// Direct children in source order
    pub fn children(&self) -> &[SyntaxElement] {
        &self.children
    }

    /// Direct child nodes in source order
    pub fn child_nodes(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(SyntaxElement::as_node)
    }

    /// Direct child tokens in source order
    pub fn child_tokens(&self) -> impl Iterator<Item = &SyntaxToken> {
        self.children.iter().filter_map(SyntaxElement::as_token)
    }

    /// First direct child node of the given kind
    pub fn child_node(&self, kind: SyntaxKind) -> Option<&Self> {
        self.child_nodes().find(|node| node.kind == kind)
    }

    /// First direct child token of the given kind
    pub fn child_token(&self, kind: SyntaxKind) -> Option<&SyntaxToken> {
        self.child_tokens().find(|token| token.kind == kind)
    }

    /// All tokens of the subtree in source order
    pub fn tokens(&self) -> Vec<&SyntaxToken> {
        let mut tokens = Vec::new();
        self.collect_tokens(&mut tokens);
        tokens
    }

    fn collect_tokens<'tree>(&'tree self, out: &mut Vec<&'tree SyntaxToken>) {
        for child in &self.children {
            match child {
                SyntaxElement::Node(node) => node.collect_tokens(out),
                SyntaxElement::Token(token) => out.push(token),
            }
        }
    }

    /// First token of the subtree
    pub fn first_token(&self) -> Option<&SyntaxToken> {
        self.children.iter().find_map(|child| match child {
            SyntaxElement::Node(node) => node.first_token(),
            SyntaxElement::Token(token) => Some(token),
        })
    }

    /// Last token of the subtree
    pub fn last_token(&self) -> Option<&SyntaxToken> {
        self.children.iter().rev().find_map(|child| match child {
            SyntaxElement::Node(node) => node.last_token(),
            SyntaxElement::Token(token) => Some(token),
        })
    }

    fn first_token_mut(&mut self) -> Option<&mut SyntaxToken> {
        self.children.iter_mut().find_map(|child| match child {
            SyntaxElement::Node(node) => node.first_token_mut(),
            SyntaxElement::Token(token) => Some(token),
        })
    }

    /// Full source text of the subtree, trivia included
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.span.len() as usize);
        for token in self.tokens() {
            token.write_full_text(&mut out);
        }
        out
    }

    /// Source text without the leading trivia of the first token and the
    /// trailing trivia of the last token
    pub fn trimmed_text(&self) -> String {
        let text = self.text();
        let leading = self.first_token().map_or(0, |token| token.leading_trivia.len());
        let trailing = self.last_token().map_or(0, |token| token.trailing_trivia.len());
        if leading + trailing >= text.len() {
            return String::new();
        }
        text[leading..text.len() - trailing].to_owned()
    }

    /// Span of [`Self::trimmed_text`]
    pub fn trimmed_span(&self) -> Span {
        match (self.first_token(), self.last_token()) {
            (Some(first), Some(last)) => Span::new(first.text_span().start, last.text_span().end),
            _ => Span::empty(self.span.start),
        }
    }

    /// Copies the subtree out of its tree
    ///
    /// The copy keeps absolute positions, so diagnostics anchored in it
    /// still point into the original buffer, but it has no access to
    /// anything outside the subtree.
    #[must_use]
    pub fn detached(&self) -> Self {
        self.clone()
    }

    /// Copies the subtree out of its tree and re-labels its root
    #[must_use]
    pub fn detached_as(&self, kind: SyntaxKind) -> Self {
        let mut node = self.clone();
        node.kind = kind;
        node
    }

    /// Replaces the leading trivia of the first token
    #[must_use]
    pub fn with_leading_trivia(mut self, trivia: &str) -> Self {
        let start = self.span.start;
        if let Some(token) = self.first_token_mut() {
            trivia.clone_into(&mut token.leading_trivia);
        }
        self.relayout(start);
        self
    }

    fn relayout(&mut self, start: u32) -> u32 {
        let mut offset = start;
        for child in &mut self.children {
            offset = child.relayout(offset);
        }
        self.span = Span::new(start, offset);
        offset
    }

    /// Renders the tree one element per line, for tests and logging
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0).map_or_else(|_| String::new(), |()| out)
    }

    fn dump_into(&self, out: &mut String, depth: usize) -> fmt::Result {
        writeln!(out, "{:indent$}{}@{}", "", self.kind, self.span, indent = depth * 2)?;
        for child in &self.children {
            match child {
                SyntaxElement::Node(node) => node.dump_into(out, depth + 1)?,
                SyntaxElement::Token(token) => {
                    writeln!(
                        out,
                        "{:indent$}{}@{} {:?}",
                        "",
                        token.kind,
                        token.span,
                        token.text,
                        indent = (depth + 1) * 2
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn sample() -> SyntaxNode {
        SyntaxNode::new(
            SyntaxKind::InfixOperatorExpr,
            vec![
                SyntaxElement::Node(SyntaxNode::new(
                    SyntaxKind::IntegerLiteralExpr,
                    vec![SyntaxElement::Token(SyntaxToken::new(
                        SyntaxKind::IntegerLiteral,
                        0,
                        "  ",
                        "1",
                        " ",
                    ))],
                )),
                SyntaxElement::Token(SyntaxToken::new(SyntaxKind::Operator, 0, "", "+", " ")),
                SyntaxElement::Token(SyntaxToken::new(
                    SyntaxKind::IntegerLiteral,
                    0,
                    "",
                    "2",
                    " // two",
                )),
            ],
        )
    }

    #[test]
    fn new_lays_children_out_contiguously() {
        let node = sample();
        assert_eq!(node.span(), Span::new(0, 14));
        let spans: Vec<_> = node.children().iter().map(SyntaxElement::span).collect();
        assert_eq!(spans, vec![Span::new(0, 4), Span::new(4, 6), Span::new(6, 14)]);
    }

    #[test]
    fn trimmed_text_strips_outer_trivia_only() {
        let node = sample();
        assert_eq!(node.text(), "  1 + 2 // two");
        assert_eq!(node.trimmed_text(), "1 + 2");
        assert_eq!(node.trimmed_span(), Span::new(2, 7));
    }

    #[test]
    fn leading_trivia_replacement_relayouts() {
        let node = sample().with_leading_trivia("\n");
        assert_eq!(node.text(), "\n1 + 2 // two");
        assert_eq!(node.span(), Span::new(0, 13));
        expect![[r#"
            InfixOperatorExpr@0..13
              IntegerLiteralExpr@0..3
                IntegerLiteral@0..3 "1"
              Operator@3..5 "+"
              IntegerLiteral@5..13 "2"
        "#]]
        .assert_eq(&node.debug_dump());
    }

    #[test]
    fn detached_as_relabels_root_only() {
        let node = sample().detached_as(SyntaxKind::SequenceExpr);
        assert_eq!(node.kind(), SyntaxKind::SequenceExpr);
        assert_eq!(node.child_nodes().next().map(SyntaxNode::kind), Some(SyntaxKind::IntegerLiteralExpr));
    }

    #[test]
    fn debug_dump_shows_every_element() {
        expect![[r#"
            InfixOperatorExpr@0..14
              IntegerLiteralExpr@0..4
                IntegerLiteral@0..4 "1"
              Operator@4..6 "+"
              IntegerLiteral@6..14 "2"
        "#]]
        .assert_eq(&sample().debug_dump());
    }

    #[test]
    fn empty_node_trims_to_nothing() {
        let node = SyntaxNode::new(SyntaxKind::LabeledExprList, Vec::new());
        assert_eq!(node.trimmed_text(), "");
        assert!(node.span().is_empty());
    }
}
