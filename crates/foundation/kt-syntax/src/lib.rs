//! Lossless syntax trees
//!
//! This crate provides the tree the parser produces and the macro bridge
//! inspects: positioned tokens with their trivia, interior nodes whose
//! children tile their byte range, typed views for the shapes macros are
//! anchored on, and the span locator that maps a byte offset back to the
//! token covering it.

pub mod ast;
mod builder;
mod kind;
mod locate;
mod node;

pub use ast::AstNode;
pub use builder::{Checkpoint, TreeBuilder};
pub use kind::SyntaxKind;
pub use locate::{TokenAtOffset, TreeInvariantViolation, token_at};
pub use node::{SyntaxElement, SyntaxNode, SyntaxToken};
