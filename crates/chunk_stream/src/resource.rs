// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::Bytes;

use crate::{EncodedBytes, Error, Result};

/// The outcome of asking a [`Resource`] for its next chunk of data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkResult {
    /// A chunk of data. An empty chunk is treated as a short read that ends the stream.
    Data(Bytes),

    /// No data is available right now. The stream will wait and ask again.
    NoDataYet,

    /// The resource has no more data.
    EndOfStream,
}

impl From<Bytes> for ChunkResult {
    fn from(value: Bytes) -> Self {
        Self::Data(value)
    }
}

impl From<Option<Bytes>> for ChunkResult {
    /// `None` maps to [`ChunkResult::NoDataYet`].
    fn from(value: Option<Bytes>) -> Self {
        value.map_or(Self::NoDataYet, Self::Data)
    }
}

/// Reference point of a seek.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Whence {
    /// Relative to the start of the resource.
    Set,
    /// Relative to the current position of the stream.
    Current,
    /// Relative to the end of the resource.
    End,
    /// To the next data region at or after the offset.
    Data,
    /// To the next hole at or after the offset.
    Hole,
}

/// The primitive operations of a resource adapted by a [`BufferedStream`][crate::BufferedStream].
///
/// Every hook has a default, so an implementation only provides what the resource supports:
///
/// * a resource without [`fetch_chunk()`][Self::fetch_chunk] behaves as if it were always at its end,
/// * a resource without [`write_chunk()`][Self::write_chunk] reports zero bytes written,
/// * a resource without [`seek()`][Self::seek] fails any positioning with [`Error::NotSupported`].
///
/// The stream calls the hooks one at a time from the thread that drives it.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use chunk_stream::{BufferedStream, ChunkResult, Resource, Result};
///
/// struct Countdown(u8);
///
/// impl Resource for Countdown {
///     fn fetch_chunk(&mut self) -> Result<ChunkResult> {
///         if self.0 == 0 {
///             return Ok(ChunkResult::EndOfStream);
///         }
///
///         self.0 -= 1;
///         Ok(ChunkResult::Data(Bytes::from(format!("{}\n", self.0))))
///     }
/// }
///
/// let mut stream = BufferedStream::new(Countdown(3))?;
/// assert_eq!(stream.gets()?, "2\n");
/// assert_eq!(stream.read(None)?.unwrap(), "1\n0\n");
/// # Ok::<(), chunk_stream::Error>(())
/// ```
pub trait Resource {
    /// Opens the resource, returning an optional descriptor that the stream exposes as
    /// [`fileno()`][crate::BufferedStream::fileno].
    ///
    /// Called once when the stream is constructed.
    ///
    /// # Errors
    ///
    /// Any error returned here fails the construction of the stream.
    fn open(&mut self) -> Result<Option<i64>> {
        Ok(None)
    }

    /// Produces the next chunk of data.
    ///
    /// # Errors
    ///
    /// Errors are surfaced to the caller of the read operation that requested the chunk.
    fn fetch_chunk(&mut self) -> Result<ChunkResult> {
        Ok(ChunkResult::EndOfStream)
    }

    /// Accepts a chunk of data, returning how many bytes were written.
    ///
    /// The data is tagged with the stream's internal encoding if one is set, otherwise with its
    /// external encoding.
    ///
    /// # Errors
    ///
    /// Errors are surfaced to the caller of the write operation.
    fn write_chunk(&mut self, data: EncodedBytes) -> Result<usize> {
        let _ = data;
        Ok(0)
    }

    /// Moves the resource to `offset` relative to `whence`, returning the new absolute position.
    ///
    /// The stream never passes [`Whence::Current`]; it resolves relative seeks against its own
    /// logical position first, because that position accounts for buffered and pushed-back bytes.
    ///
    /// # Errors
    ///
    /// The default implementation fails with [`Error::NotSupported`].
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let _ = (offset, whence);
        Err(Error::not_supported("seek"))
    }

    /// Closes the resource. Called at most once.
    ///
    /// # Errors
    ///
    /// Errors are surfaced to the caller of [`close()`][crate::BufferedStream::close].
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: Resource + ?Sized> Resource for Box<R> {
    fn open(&mut self) -> Result<Option<i64>> {
        (**self).open()
    }

    fn fetch_chunk(&mut self) -> Result<ChunkResult> {
        (**self).fetch_chunk()
    }

    fn write_chunk(&mut self, data: EncodedBytes) -> Result<usize> {
        (**self).write_chunk(data)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        (**self).seek(offset, whence)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
