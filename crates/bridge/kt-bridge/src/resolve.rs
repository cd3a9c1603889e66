//! Mapping host addresses to syntax nodes

use crate::source_file::ExportedSourceFile;
use kt_syntax::{AstNode, SyntaxKind, TreeInvariantViolation, token_at};

/// Failure to find the node a host address denotes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The address does not point into the file's buffer
    #[error("address {address:#x} is outside `{file}` ({len} bytes at {base:#x})")]
    OutOfBounds {
        /// File name
        file: String,
        /// Address supplied by the host
        address: usize,
        /// Start of the buffer
        base: usize,
        /// Length of the buffer
        len: usize,
    },
    /// The tree does not reach the offset
    #[error("no token of `{file}` covers offset {offset}")]
    NoToken {
        /// File name
        file: String,
        /// Offset into the buffer
        offset: u32,
    },
    /// The node above the token has the wrong shape
    #[error("expected {expected} at offset {offset}, found {found}")]
    ShapeMismatch {
        /// Requested shape
        expected: &'static str,
        /// Kind of the token's parent
        found: SyntaxKind,
        /// Offset into the buffer
        offset: u32,
    },
    /// The tree does not partition its byte range
    #[error(transparent)]
    Invariant(#[from] TreeInvariantViolation),
}

/// Finds the node of shape `S` anchored at `address`
///
/// The anchor is always the parent of the token covering the address:
/// `#` for a freestanding expansion, `@` for an attribute and the
/// introducing keyword for a declaration.
///
/// # Errors
///
/// Returns an error if the address is outside the file, if the parent of
/// the covering token is not an `S`, or if the tree is malformed.
pub fn find_node<'file, S: AstNode<'file>>(
    file: &'file ExportedSourceFile,
    address: usize,
) -> Result<S, ResolveError> {
    let buffer = file.buffer();
    let offset = buffer.offset_of(address).ok_or_else(|| ResolveError::OutOfBounds {
        file: file.file_name().to_owned(),
        address,
        base: buffer.base_address(),
        len: buffer.len(),
    })?;

    let located = token_at(file.tree(), offset)?.ok_or_else(|| ResolveError::NoToken {
        file: file.file_name().to_owned(),
        offset,
    })?;
    let parent = located.parent().ok_or_else(|| ResolveError::NoToken {
        file: file.file_name().to_owned(),
        offset,
    })?;

    let node = S::cast(parent).ok_or(ResolveError::ShapeMismatch {
        expected: S::SHAPE,
        found: parent.kind(),
        offset,
    })?;
    tracing::trace!(shape = S::SHAPE, kind = %parent.kind(), span = %parent.span(), "resolved node");
    Ok(node)
}
