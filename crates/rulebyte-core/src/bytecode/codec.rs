//! Operand encoding
//!
//! Integers and floats are 4 bytes little-endian, booleans a single `0`/`1`
//! byte, and strings a little-endian `u16` byte length followed by UTF-8
//! bytes with no terminator.

use thiserror::Error;

/// Maximum encodable string length in bytes
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Errors raised while encoding or decoding operands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of operands: needed {needed} bytes at offset {offset}, {available} available")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("string of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    #[error("string operand at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

/// Append a 32-bit integer
pub fn encode_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append a 32-bit float
pub fn encode_f32(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append a boolean
pub fn encode_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(u8::from(value));
}

/// Append a length-prefixed string
///
/// Strings over [`MAX_STRING_LEN`] bytes are rejected, never truncated.
pub fn encode_str(buf: &mut Vec<u8>, value: &str) -> Result<(), CodecError> {
    let len = u16::try_from(value.len()).map_err(|_| CodecError::StringTooLong(value.len()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

/// A read cursor over an operand byte sequence
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    /// Create a decoder positioned at the start of `bytes`
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Current read position
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Returns true if every byte has been consumed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume `n` raw bytes
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEnd {
                offset: self.offset,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.take_array().map(i32::from_le_bytes)
    }

    /// Read a 32-bit float
    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        self.take_array().map(f32::from_le_bytes)
    }

    /// Read a boolean; any byte other than 0 or 1 is an error
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }

    /// Read a length-prefixed string
    pub fn read_str(&mut self) -> Result<&'a str, CodecError> {
        let len = u16::from_le_bytes(self.take_array()?) as usize;
        let start = self.offset;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8(start))
    }

    /// Skip a length-prefixed string without validating its contents
    pub fn skip_str(&mut self) -> Result<(), CodecError> {
        let len = u16::from_le_bytes(self.take_array()?) as usize;
        self.take(len).map(|_| ())
    }
}
