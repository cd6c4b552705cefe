// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use bytes::Bytes;

use crate::{Encoding, Result};

/// An immutable byte sequence tagged with the encoding it is meant to be read in.
///
/// All data handed out by a [`BufferedStream`][crate::BufferedStream] is tagged with the stream's
/// external encoding at the time it was read. The tag never changes the bytes themselves.
///
/// Dereferences to `[u8]` and compares equal to byte slices, byte arrays and string slices
/// with the same content, regardless of the tag.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct EncodedBytes {
    bytes: Bytes,
    encoding: Encoding,
}

impl EncodedBytes {
    /// Tags `bytes` with `encoding`.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, encoding: Encoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
        }
    }

    /// Returns an empty byte sequence with the given tag.
    #[must_use]
    pub const fn empty(encoding: Encoding) -> Self {
        Self {
            bytes: Bytes::new(),
            encoding,
        }
    }

    /// The encoding this byte sequence is tagged with.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Returns the same bytes under a different tag.
    #[must_use]
    pub fn with_encoding(self, encoding: Encoding) -> Self {
        Self { encoding, ..self }
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the value, returning the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Views the bytes as text if they are valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Views the bytes as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Decodes the bytes as a single character of the tagged encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidByteSequence`][crate::Error::InvalidByteSequence] if the bytes are not
    /// exactly one valid character.
    pub fn codepoint(&self) -> Result<u32> {
        self.encoding.decode_char(&self.bytes)
    }
}

impl Deref for EncodedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for EncodedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<EncodedBytes> for Bytes {
    fn from(value: EncodedBytes) -> Self {
        value.bytes
    }
}

impl From<EncodedBytes> for Vec<u8> {
    fn from(value: EncodedBytes) -> Self {
        value.bytes.into()
    }
}

impl PartialEq<[u8]> for EncodedBytes {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

impl PartialEq<&[u8]> for EncodedBytes {
    fn eq(&self, other: &&[u8]) -> bool {
        self.bytes == *other
    }
}

impl<const N: usize> PartialEq<[u8; N]> for EncodedBytes {
    fn eq(&self, other: &[u8; N]) -> bool {
        self.bytes == other[..]
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for EncodedBytes {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.bytes == other[..]
    }
}

impl PartialEq<str> for EncodedBytes {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for EncodedBytes {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl fmt::Debug for EncodedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedBytes")
            .field("bytes", &self.bytes)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl fmt::Display for EncodedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}
