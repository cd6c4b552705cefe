// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A text encoding tag.
///
/// Streams never transcode data. An `Encoding` only describes how the bytes handed out by a stream
/// are meant to be interpreted, which in turn decides how many bytes make up one character.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Encoding {
    /// Raw bytes with no text interpretation. Also known as `BINARY`.
    Binary,
    /// 7-bit ASCII.
    UsAscii,
    /// UTF-8.
    #[default]
    Utf8,
    /// UTF-7.
    Utf7,
    /// UTF-16, big-endian.
    Utf16Be,
    /// UTF-16, little-endian.
    Utf16Le,
    /// UTF-32, big-endian.
    Utf32Be,
    /// UTF-32, little-endian.
    Utf32Le,
    /// ISO-8859-1 (Latin-1).
    Iso8859_1,
    /// Windows code page 1252.
    Windows1252,
}

const NAMES: &[(&str, Encoding)] = &[
    ("ASCII-8BIT", Encoding::Binary),
    ("BINARY", Encoding::Binary),
    ("US-ASCII", Encoding::UsAscii),
    ("ASCII", Encoding::UsAscii),
    ("UTF-8", Encoding::Utf8),
    ("UTF8", Encoding::Utf8),
    ("UTF-7", Encoding::Utf7),
    ("UTF-16BE", Encoding::Utf16Be),
    ("UTF-16LE", Encoding::Utf16Le),
    ("UTF-32BE", Encoding::Utf32Be),
    ("UTF-32LE", Encoding::Utf32Le),
    ("ISO-8859-1", Encoding::Iso8859_1),
    ("ISO8859-1", Encoding::Iso8859_1),
    ("Windows-1252", Encoding::Windows1252),
    ("CP1252", Encoding::Windows1252),
];

impl Encoding {
    /// The canonical name of the encoding.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "ASCII-8BIT",
            Self::UsAscii => "US-ASCII",
            Self::Utf8 => "UTF-8",
            Self::Utf7 => "UTF-7",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf32Be => "UTF-32BE",
            Self::Utf32Le => "UTF-32LE",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Windows1252 => "Windows-1252",
        }
    }

    /// Looks up an encoding by name or alias, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the name is not known.
    pub fn find(name: &str) -> Result<Self> {
        let name = name.trim();

        NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, encoding)| *encoding)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown encoding name - {name}")))
    }

    /// The number of bytes in the smallest character of this encoding.
    ///
    /// Character reads consume at least this many bytes before deciding the character's full length.
    #[must_use]
    pub const fn min_char_len(self) -> usize {
        match self {
            Self::Utf16Be | Self::Utf16Le => 2,
            Self::Utf32Be | Self::Utf32Le => 4,
            _ => 1,
        }
    }

    /// The total length of the character that starts with `prefix`.
    ///
    /// `prefix` must hold at least [`min_char_len()`][Self::min_char_len] bytes. Lead units that do
    /// not start a valid character are treated as characters of their own.
    #[must_use]
    pub fn char_len(self, prefix: &[u8]) -> usize {
        match self {
            Self::Utf8 => match prefix.first() {
                Some(0xC2..=0xDF) => 2,
                Some(0xE0..=0xEF) => 3,
                Some(0xF0..=0xF4) => 4,
                _ => 1,
            },
            Self::Utf16Be | Self::Utf16Le => match utf16_unit(self, prefix) {
                Some(0xD800..=0xDBFF) => 4,
                _ => 2,
            },
            _ => self.min_char_len(),
        }
    }

    /// The length of each unit that follows the lead of a multi-unit character.
    pub(crate) const fn trail_unit_len(self) -> usize {
        match self {
            Self::Utf16Be | Self::Utf16Le => 2,
            _ => 1,
        }
    }

    /// Whether `unit` can continue a character begun by an earlier unit.
    pub(crate) fn is_trail_unit(self, unit: &[u8]) -> bool {
        match self {
            Self::Utf8 => matches!(unit.first(), Some(0x80..=0xBF)),
            Self::Utf16Be | Self::Utf16Le => matches!(utf16_unit(self, unit), Some(0xDC00..=0xDFFF)),
            _ => true,
        }
    }

    /// Decodes one complete character into its Unicode scalar value.
    ///
    /// Single-byte encodings other than ASCII yield the byte value itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidByteSequence`] if `bytes` is not exactly one valid character.
    pub fn decode_char(self, bytes: &[u8]) -> Result<u32> {
        let invalid = || Error::InvalidByteSequence { encoding: self };

        match self {
            Self::Utf8 => {
                let text = std::str::from_utf8(bytes).map_err(|_ignored| invalid())?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(u32::from(c)),
                    _ => Err(invalid()),
                }
            }
            Self::UsAscii => match bytes {
                [b] if b.is_ascii() => Ok(u32::from(*b)),
                _ => Err(invalid()),
            },
            Self::Utf16Be | Self::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| utf16_unit(self, pair).unwrap_or_default())
                    .collect();

                if bytes.len() % 2 != 0 {
                    return Err(invalid());
                }

                let mut decoded = char::decode_utf16(units);
                match (decoded.next(), decoded.next()) {
                    (Some(Ok(c)), None) => Ok(u32::from(c)),
                    _ => Err(invalid()),
                }
            }
            Self::Utf32Be | Self::Utf32Le => {
                let array: [u8; 4] = bytes.try_into().map_err(|_ignored| invalid())?;
                let value = if self == Self::Utf32Be {
                    u32::from_be_bytes(array)
                } else {
                    u32::from_le_bytes(array)
                };
                char::from_u32(value).map(u32::from).ok_or_else(invalid)
            }
            Self::Binary | Self::Utf7 | Self::Iso8859_1 | Self::Windows1252 => match bytes {
                [b] => Ok(u32::from(*b)),
                _ => Err(invalid()),
            },
        }
    }

    /// Encodes a character in this encoding.
    ///
    /// Encodings that cannot represent arbitrary characters fall back to UTF-8, which is what
    /// conventional push-back of a character does with its string representation.
    #[must_use]
    pub fn encode_char(self, c: char) -> Vec<u8> {
        match self {
            Self::Utf16Be | Self::Utf16Le => {
                let mut units = [0_u16; 2];
                c.encode_utf16(&mut units)
                    .iter()
                    .flat_map(|unit| if self == Self::Utf16Be { unit.to_be_bytes() } else { unit.to_le_bytes() })
                    .collect()
            }
            Self::Utf32Be => u32::from(c).to_be_bytes().to_vec(),
            Self::Utf32Le => u32::from(c).to_le_bytes().to_vec(),
            _ => c.to_string().into_bytes(),
        }
    }
}

fn utf16_unit(encoding: Encoding, bytes: &[u8]) -> Option<u16> {
    let pair: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
    Some(if encoding == Encoding::Utf16Be {
        u16::from_be_bytes(pair)
    } else {
        u16::from_le_bytes(pair)
    })
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::find(s)
    }
}

/// Parses an encoding argument in the conventional `"external"`, `"external:internal"` or
/// `"external,internal"` form.
///
/// Returns the external encoding and, if one was named, the internal encoding.
pub(crate) fn parse_encoding_pair(names: &str) -> Result<(Encoding, Option<Encoding>)> {
    if names.trim().is_empty() {
        return Err(Error::InvalidArgument("encoding name must not be empty".to_owned()));
    }

    match names.split_once([':', ',']) {
        Some((external, internal)) => Ok((Encoding::find(external)?, Some(Encoding::find(internal.trim_start())?))),
        None => Ok((Encoding::find(names)?, None)),
    }
}
