// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

use bytes::Bytes;
use tracing::{Level, event};

use crate::{BufferedStream, EncodedBytes, Error, Resource, Result};

impl<R: Resource> BufferedStream<R> {
    pub(crate) fn write_data(&mut self, data: &[u8]) -> Result<usize> {
        if !self.writable {
            return Err(Error::ClosedForWriting);
        }

        let encoding = self.internal_encoding.unwrap_or(self.external_encoding);
        let written = self.resource.write_chunk(EncodedBytes::new(Bytes::copy_from_slice(data), encoding))?;

        event!(Level::TRACE, message = "wrote chunk", len = data.len(), written);
        Ok(written)
    }

    /// Hands `data` to the resource, returning how many bytes it accepted.
    ///
    /// The data is tagged with the internal encoding if one is set, otherwise with the external
    /// encoding. Writing does not move the read position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClosedForWriting`] if the write direction was closed, or any error reported
    /// by the resource.
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> Result<usize> {
        self.write_data(data.as_ref())
    }

    /// Writes `data` at `offset`, leaving the position unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`seek()`][Self::seek] and [`write()`][Self::write].
    pub fn pwrite(&mut self, data: impl AsRef<[u8]>, offset: i64) -> Result<usize> {
        self.at_offset(offset, |stream| stream.write_data(data.as_ref()))
    }

    /// Writes the display form of each item, one write per item.
    ///
    /// # Errors
    ///
    /// Same as [`write()`][Self::write]. Items after a failed write are not written.
    pub fn print<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Display,
    {
        for item in items {
            self.write_data(item.to_string().as_bytes())?;
        }

        Ok(())
    }

    /// Writes the display form of each item followed by the line separator.
    ///
    /// # Errors
    ///
    /// Same as [`write()`][Self::write]. Items after a failed write are not written.
    pub fn puts<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Display,
    {
        for item in items {
            let mut line = item.to_string().into_bytes();
            line.extend_from_slice(&self.line_separator);
            self.write_data(&line)?;
        }

        Ok(())
    }

    /// Writes a single byte, returning it.
    ///
    /// # Errors
    ///
    /// Same as [`write()`][Self::write].
    pub fn putc(&mut self, byte: u8) -> Result<u8> {
        self.write_data(&[byte])?;
        Ok(byte)
    }

    /// Writes a single character, encoded in the external encoding, returning it.
    ///
    /// # Errors
    ///
    /// Same as [`write()`][Self::write].
    pub fn putc_char(&mut self, c: char) -> Result<char> {
        let encoded = self.external_encoding.encode_char(c);
        self.write_data(&encoded)?;
        Ok(c)
    }

    /// Does nothing, as the stream holds no written data.
    ///
    /// # Errors
    ///
    /// This call never fails.
    pub fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Does nothing, as the stream holds no written data.
    ///
    /// # Errors
    ///
    /// This call never fails.
    pub fn fsync(&mut self) -> Result<()> {
        Ok(())
    }
}
