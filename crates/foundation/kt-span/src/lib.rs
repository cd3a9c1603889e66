//! Byte spans into source buffers

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A byte offset span in a source file
///
/// Spans are half-open: `start` is covered, `end` is not.
#[derive(Copy, Clone, Debug, Default, Display, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[display("{start}..{end}")]
pub struct Span {
    /// First byte covered by the span
    pub start: u32,
    /// One past the last byte covered by the span
    pub end: u32,
}

impl Span {
    /// Creates a span from its bounds
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start {start} is past its end {end}");
        Self { start, end }
    }

    /// Creates an empty span positioned at `offset`
    pub fn empty(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    /// Number of bytes covered
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span covers no bytes
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` lies in `[start, end)`
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}
