// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tracing::{Level, event};

use crate::{BufferedStream, Encoding, Resource, Result};

/// Byte order marks, keyed by their first byte. The remaining bytes of the mark follow.
const MARKS: [(u8, &[u8], Encoding); 5] = [
    (0x00, &[0x00, 0xFE, 0xFF], Encoding::Utf32Be),
    (0x28, &[0x2F, 0x76], Encoding::Utf7),
    (0xEF, &[0xBB, 0xBF], Encoding::Utf8),
    (0xFE, &[0xFF], Encoding::Utf16Be),
    (0xFF, &[0xFE], Encoding::Utf16Le),
];

impl<R: Resource> BufferedStream<R> {
    /// Detects a byte order mark at the current position and makes the encoding it names the
    /// external encoding.
    ///
    /// A recognized mark is consumed. Anything else is pushed back byte by byte, so the stream reads
    /// exactly as it would have without the detection attempt. A first byte of `0xFF` is always
    /// taken to start a UTF-16LE mark, so UTF-32LE input is not recognized.
    ///
    /// Returns the detected encoding, or `None` if there was no mark.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    ///
    /// # Example
    ///
    /// ```
    /// use chunk_stream::{BufferedStream, Encoding};
    /// # use bytes::Bytes;
    /// # use chunk_stream::{ChunkResult, Resource};
    /// # struct Chunks(Vec<&'static [u8]>);
    /// # impl Resource for Chunks {
    /// #     fn fetch_chunk(&mut self) -> chunk_stream::Result<ChunkResult> {
    /// #         Ok(match self.0.is_empty() {
    /// #             true => ChunkResult::EndOfStream,
    /// #             false => ChunkResult::Data(Bytes::from_static(self.0.remove(0))),
    /// #         })
    /// #     }
    /// # }
    ///
    /// let mut stream = BufferedStream::new(Chunks(vec![&b"\xEF\xBB"[..], b"\xBFhello"]))?;
    ///
    /// assert_eq!(stream.set_encoding_by_bom()?, Some(Encoding::Utf8));
    /// assert_eq!(stream.read(None)?.unwrap(), "hello");
    /// # Ok::<(), chunk_stream::Error>(())
    /// ```
    pub fn set_encoding_by_bom(&mut self) -> Result<Option<Encoding>> {
        let Some(first) = self.get_byte()? else {
            return Ok(None);
        };

        let Some((_, rest, encoding)) = MARKS.iter().find(|(lead, _, _)| *lead == first) else {
            self.unget_byte(first);
            return Ok(None);
        };

        let mut probe = vec![first];
        for _ in 0..rest.len() {
            if let Some(byte) = self.get_byte()? {
                probe.push(byte);
            }
        }

        if probe.get(1..) == Some(*rest) {
            event!(Level::DEBUG, message = "byte order mark detected", encoding = encoding.name());
            self.external_encoding = *encoding;
            return Ok(Some(*encoding));
        }

        for byte in probe.into_iter().rev() {
            self.unget_byte(byte);
        }

        Ok(None)
    }
}
