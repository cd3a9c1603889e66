//! Finding the token that covers a byte offset

use crate::kind::SyntaxKind;
use crate::node::{SyntaxElement, SyntaxNode, SyntaxToken};
use kt_span::Span;

/// The tree does not partition its byte range the way every parsed tree must
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed syntax tree: {kind} at {span} covers offset {position} but none of its children do")]
pub struct TreeInvariantViolation {
    /// Kind of the node whose children leave a gap
    pub kind: SyntaxKind,
    /// Span of that node
    pub span: Span,
    /// Offset that fell into the gap
    pub position: u32,
}

/// A token together with the chain of nodes leading to it
#[derive(Debug, Clone)]
pub struct TokenAtOffset<'tree> {
    token: &'tree SyntaxToken,
    ancestors: Vec<&'tree SyntaxNode>,
}

impl<'tree> TokenAtOffset<'tree> {
    /// The covering token
    pub fn token(&self) -> &'tree SyntaxToken {
        self.token
    }

    /// The token's syntactic parent
    pub fn parent(&self) -> Option<&'tree SyntaxNode> {
        self.ancestors.last().copied()
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = &'tree SyntaxNode> + '_ {
        self.ancestors.iter().rev().copied()
    }
}

/// Finds the leaf token whose span covers `position`
///
/// Returns `Ok(None)` when `position` lies outside `node`. A node that
/// covers `position` while none of its children do violates the partition
/// invariant and is reported as [`TreeInvariantViolation`].
///
/// # Errors
///
/// Returns an error if the tree does not partition its byte range.
pub fn token_at(
    node: &SyntaxNode,
    position: u32,
) -> Result<Option<TokenAtOffset<'_>>, TreeInvariantViolation> {
    let mut ancestors = Vec::new();
    Ok(locate(node, position, &mut ancestors)?.map(|token| TokenAtOffset { token, ancestors }))
}

fn locate<'tree>(
    node: &'tree SyntaxNode,
    position: u32,
    ancestors: &mut Vec<&'tree SyntaxNode>,
) -> Result<Option<&'tree SyntaxToken>, TreeInvariantViolation> {
    if !node.span().contains(position) {
        return Ok(None);
    }
    ancestors.push(node);

    for child in node.children() {
        match child {
            SyntaxElement::Token(token) => {
                if token.span().contains(position) {
                    return Ok(Some(token));
                }
            }
            SyntaxElement::Node(child) => {
                if let Some(token) = locate(child, position, ancestors)? {
                    return Ok(Some(token));
                }
            }
        }
    }

    Err(TreeInvariantViolation {
        kind: node.kind(),
        span: node.span(),
        position,
    })
}
