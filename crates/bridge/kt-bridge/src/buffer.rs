//! Result buffers handed to the host
//!
//! A result is a boxed `len + 1` byte slice ending in NUL. The host receives
//! the pointer and `len` and gives both back to `kt_free_expansion_text`,
//! which rebuilds the box with [`ResultBuffer::from_raw_parts`].

use std::ptr;

/// Expansion text owned by the bridge until handed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBuffer {
    bytes: Box<[u8]>,
}

impl ResultBuffer {
    /// Copies `text` into a fresh NUL-terminated buffer
    pub fn new(text: &str) -> Self {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Length of the text, without the terminator
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    /// Whether the text is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The text
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len()]).unwrap_or_default()
    }

    /// The text with its terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    /// Gives up ownership, returning the pointer and text length
    pub fn into_raw_parts(self) -> (*mut u8, usize) {
        let len = self.len();
        (Box::into_raw(self.bytes).cast::<u8>(), len)
    }

    /// Takes back a buffer released by [`ResultBuffer::into_raw_parts`]
    ///
    /// # Safety
    ///
    /// `text` and `len` must come from one call to `into_raw_parts` and
    /// must not have been passed here before.
    #[allow(unsafe_code, reason = "rebuilds the box handed to the host")]
    pub unsafe fn from_raw_parts(text: *mut u8, len: usize) -> Self {
        // SAFETY: the caller guarantees the pointer came from `into_raw_parts`,
        // which leaked a `Box<[u8]>` of exactly `len + 1` bytes.
        let bytes = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(text, len + 1)) };
        Self { bytes }
    }
}

/// The host's `(text, len)` out-parameters
///
/// Creating one resets both to "no buffer", so a failing request leaves
/// them null and zero.
#[derive(Debug)]
pub struct OutText<'out> {
    text: &'out mut *mut u8,
    len: &'out mut usize,
}

impl<'out> OutText<'out> {
    /// Resets the out-parameters and wraps them
    pub fn reset(text: &'out mut *mut u8, len: &'out mut usize) -> Self {
        *text = ptr::null_mut();
        *len = 0;
        Self { text, len }
    }

    /// Hands `buffer` to the host
    pub fn deliver(self, buffer: ResultBuffer) {
        let (text, len) = buffer.into_raw_parts();
        *self.text = text;
        *self.len = len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_nul_terminated() {
        let buffer = ResultBuffer::new("\"1 + 2\"");
        assert_eq!(buffer.len(), 7);
        assert_eq!(buffer.as_str(), "\"1 + 2\"");
        assert_eq!(buffer.as_bytes_with_nul().last(), Some(&0));
        assert!(ResultBuffer::new("").is_empty());
    }

    #[test]
    #[allow(unsafe_code, reason = "exercises the raw hand-off")]
    fn raw_parts_round_trip() {
        let (text, len) = ResultBuffer::new("get { 1 }").into_raw_parts();
        // SAFETY: the parts come straight from `into_raw_parts`.
        let buffer = unsafe { ResultBuffer::from_raw_parts(text, len) };
        assert_eq!(buffer.as_str(), "get { 1 }");
    }

    #[test]
    fn out_text_is_reset_then_delivered() {
        let mut storage = [0_u8; 1];
        let mut text: *mut u8 = storage.as_mut_ptr();
        let mut len = 42;
        let out = OutText::reset(&mut text, &mut len);
        drop(out);
        assert!(text.is_null());
        assert_eq!(len, 0);

        OutText::reset(&mut text, &mut len).deliver(ResultBuffer::new("abc"));
        assert!(!text.is_null());
        assert_eq!(len, 3);
        #[allow(unsafe_code, reason = "returns the delivered buffer")]
        // SAFETY: `text`/`len` were just delivered from a `ResultBuffer`.
        let buffer = unsafe { ResultBuffer::from_raw_parts(text, len) };
        assert_eq!(buffer.as_str(), "abc");
    }
}
