//! Source files exported by the host

use kt_parser::{ParseError, parse_named_source};
use kt_syntax::SyntaxNode;
use std::fmt;

/// A host-owned byte range holding one file's contents
///
/// The bridge never reads through the address; it only uses it to turn
/// host pointers into offsets and back.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceBuffer {
    base_address: usize,
    len: usize,
}

impl SourceBuffer {
    /// Describes `len` bytes starting at `base_address`
    pub fn new(base_address: usize, len: usize) -> Self {
        Self { base_address, len }
    }

    /// Describes the memory of `text`
    pub fn of_text(text: &str) -> Self {
        Self::new(text.as_ptr() as usize, text.len())
    }

    /// Address of the first byte
    pub fn base_address(&self) -> usize {
        self.base_address
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of `address`, if it points at a byte of the buffer
    pub fn offset_of(&self, address: usize) -> Option<u32> {
        address
            .checked_sub(self.base_address)
            .filter(|&offset| offset < self.len)
            .and_then(|offset| u32::try_from(offset).ok())
    }

    /// Address of the byte at `offset`, if the buffer has one
    pub fn address_of(&self, offset: u32) -> Option<usize> {
        let offset = offset as usize;
        (offset < self.len).then(|| self.base_address + offset)
    }
}

impl fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceBuffer({:#x}, {} bytes)", self.base_address, self.len)
    }
}

/// A parsed file together with the buffer it was parsed from
#[derive(Debug, Clone)]
pub struct ExportedSourceFile {
    module_name: String,
    file_name: String,
    buffer: SourceBuffer,
    tree: SyntaxNode,
    parse_errors: Vec<ParseError>,
}

impl ExportedSourceFile {
    /// Parses `text`, the contents of `buffer`
    pub fn parse(
        module_name: impl Into<String>,
        file_name: impl Into<String>,
        buffer: SourceBuffer,
        text: &str,
    ) -> Self {
        debug_assert_eq!(buffer.len(), text.len(), "buffer and text disagree on length");
        let file_name = file_name.into();
        let result = parse_named_source(text, &file_name);
        if !result.errors.is_empty() {
            tracing::warn!(
                file = %file_name,
                errors = result.errors.len(),
                "exported source file has syntax errors"
            );
        }
        Self {
            module_name: module_name.into(),
            file_name,
            buffer,
            tree: result.syntax,
            parse_errors: result.errors,
        }
    }

    /// Parses `text`, addressing it by its own memory
    pub fn from_text(module_name: impl Into<String>, file_name: impl Into<String>, text: &str) -> Self {
        Self::parse(module_name, file_name, SourceBuffer::of_text(text), text)
    }

    /// Module the file belongs to
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// File name used in diagnostics
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The host buffer
    pub fn buffer(&self) -> SourceBuffer {
        self.buffer
    }

    /// Root of the syntax tree
    pub fn tree(&self) -> &SyntaxNode {
        &self.tree
    }

    /// Errors recovered from while parsing
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    /// Host address of the byte at `offset`
    pub fn address_of(&self, offset: u32) -> Option<usize> {
        self.buffer.address_of(offset)
    }
}
