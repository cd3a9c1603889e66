//! Incremental tree construction used by the parser

use crate::kind::SyntaxKind;
use crate::node::{SyntaxElement, SyntaxNode, SyntaxToken};

/// Position in the child list that a node can later be started at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Builds a tree bottom-up from already positioned tokens
///
/// Nodes are opened with [`TreeBuilder::start_node`] (or retroactively with
/// [`TreeBuilder::start_node_at`]) and closed with
/// [`TreeBuilder::finish_node`]; tokens are appended in source order.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    parents: Vec<(SyntaxKind, usize)>,
    children: Vec<SyntaxElement>,
    offset: u32,
}

impl TreeBuilder {
    /// Creates an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a node that will own everything pushed until the matching
    /// [`TreeBuilder::finish_node`]
    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.parents.push((kind, self.children.len()));
    }

    /// Records the current position so a node can wrap what follows it
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.children.len())
    }

    /// Opens a node that also owns everything pushed since `checkpoint`
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        debug_assert!(
            self.parents.last().is_none_or(|&(_, first)| first <= checkpoint.0),
            "checkpoint precedes the innermost open node"
        );
        self.parents.push((kind, checkpoint.0));
    }

    /// Appends a token to the innermost open node
    pub fn token(&mut self, token: SyntaxToken) {
        self.offset = token.span().end;
        self.children.push(SyntaxElement::Token(token));
    }

    /// Closes the innermost open node
    pub fn finish_node(&mut self) {
        let Some((kind, first)) = self.parents.pop() else {
            debug_assert!(false, "finish_node without an open node");
            return;
        };
        let children = self.children.split_off(first);
        let node = SyntaxNode::from_positioned(kind, children, self.offset);
        self.children.push(SyntaxElement::Node(node));
    }

    /// Closes any nodes left open and wraps everything in a root of `kind`
    pub fn finish(mut self, kind: SyntaxKind) -> SyntaxNode {
        while !self.parents.is_empty() {
            self.finish_node();
        }
        SyntaxNode::from_positioned(kind, self.children, self.offset)
    }
}
