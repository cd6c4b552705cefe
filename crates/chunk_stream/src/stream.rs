// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{Level, event, warn};

use crate::chunk_source::next_chunk;
use crate::encoding::parse_encoding_pair;
use crate::pushback::PushbackBuffer;
use crate::{EncodedBytes, Encoding, Error, Resource, Result, StreamOptions, Whence};

/// Access pattern hints accepted by [`BufferedStream::advise()`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Advice {
    /// No particular access pattern.
    Normal,
    /// Data will be read from lower to higher offsets.
    Sequential,
    /// Data will be read in random order.
    Random,
    /// Data will be read in the near future.
    WillNeed,
    /// Data will not be read in the near future.
    DontNeed,
    /// Data will be read only once.
    NoReuse,
}

/// A complete byte, character and line oriented stream over a [`Resource`] that only produces
/// and accepts chunks of bytes.
///
/// Reads are byte-exact no matter how the resource sizes its chunks: any part of a chunk that a
/// read does not need is kept in a push-back buffer and returned by the next read. Data can be
/// returned to the stream with [`unget_bytes()`][Self::unget_bytes] and friends, which place it in
/// front of everything else.
///
/// The stream tracks a signed byte position, a line counter and an end-of-stream flag. All data it
/// hands out is tagged with its external encoding.
///
/// # Blocking
///
/// When the resource reports that it has no data yet, the stream sleeps for the configured
/// [retry delay][crate::StreamOptionsBuilder::retry_delay] and asks again, blocking the calling
/// thread until data or the end of the stream arrives.
///
/// # Standard I/O traits
///
/// The stream implements [`std::io::Read`], [`std::io::BufRead`], [`std::io::Write`] and
/// [`std::io::Seek`]. Some inherent methods share names with trait methods but have different
/// signatures; inherent methods take precedence, so call the trait versions through the trait,
/// e.g. `std::io::Read::read(&mut stream, &mut buf)`. The exceptions are
/// [`bytes()`][Self::bytes] and [`lines()`][Self::lines], which lose to the by-value trait methods
/// of the same name while `std::io::Read` or `std::io::BufRead` is imported. Call those as
/// `BufferedStream::bytes(&mut stream)`.
///
/// # Example
///
/// ```
/// use chunk_stream::BufferedStream;
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
/// let mut stream = BufferedStream::new(Chunks(vec![&b"one\n"[..], b"two\nthree\n", b"four\n"]))?;
///
/// assert_eq!(stream.read(Some(4))?.unwrap(), "one\n");
/// assert_eq!(stream.read(Some(1))?.unwrap(), "t");
/// assert_eq!(stream.gets()?, "wo\n");
/// assert_eq!(stream.position(), 8);
/// # Ok::<(), chunk_stream::Error>(())
/// ```
pub struct BufferedStream<R: Resource> {
    pub(crate) resource: R,

    pub(crate) line_separator: Bytes,
    pub(crate) retry_delay: Duration,
    tty: bool,
    pid: Option<u32>,

    descriptor: Option<i64>,
    position: i64,
    line_number: i64,
    pub(crate) eof: bool,

    pub(crate) readable: bool,
    pub(crate) writable: bool,
    closed: bool,

    pub(crate) external_encoding: Encoding,
    pub(crate) internal_encoding: Option<Encoding>,

    binmode: bool,
    sync: bool,
    autoclose: bool,
    close_on_exec: bool,

    pub(crate) pushback: PushbackBuffer,
}

impl<R: Resource> BufferedStream<R> {
    /// Opens a stream over `resource` with the default options.
    ///
    /// # Errors
    ///
    /// Returns any error reported by the resource's open hook.
    pub fn new(resource: R) -> Result<Self> {
        Self::with_options(resource, StreamOptions::default())
    }

    /// Opens a stream over `resource` with the given options.
    ///
    /// # Errors
    ///
    /// Returns any error reported by the resource's open hook.
    pub fn with_options(resource: R, options: StreamOptions) -> Result<Self> {
        let mut stream = Self {
            resource,
            line_separator: options.line_separator,
            retry_delay: options.retry_delay,
            tty: options.tty,
            pid: options.pid,
            descriptor: None,
            position: 0,
            line_number: 0,
            eof: false,
            readable: true,
            writable: true,
            closed: true,
            external_encoding: options.external_encoding,
            internal_encoding: options.internal_encoding,
            binmode: false,
            sync: options.sync,
            // Not armed until the stream is open, so a failed open is not followed by a close.
            autoclose: false,
            close_on_exec: options.close_on_exec,
            pushback: PushbackBuffer::default(),
        };

        stream.open()?;
        stream.autoclose = options.autoclose;

        Ok(stream)
    }

    fn open(&mut self) -> Result<()> {
        self.position = 0;
        self.line_number = 0;
        self.eof = false;
        self.pushback.clear();

        self.descriptor = self.resource.open()?;
        self.closed = false;

        event!(Level::DEBUG, message = "stream opened", descriptor = ?self.descriptor);
        Ok(())
    }

    /// References the adapted resource.
    #[must_use]
    pub const fn get_ref(&self) -> &R {
        &self.resource
    }

    /// Mutably references the adapted resource.
    ///
    /// Reading from or seeking the resource directly bypasses the stream's buffering and position
    /// tracking.
    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    // ---------------------------------------------------------------------------------------------
    // Read engine
    // ---------------------------------------------------------------------------------------------

    pub(crate) fn ensure_readable(&self) -> Result<()> {
        if self.readable { Ok(()) } else { Err(Error::ClosedForReading) }
    }

    pub(crate) fn tag(&self, bytes: Bytes) -> EncodedBytes {
        EncodedBytes::new(bytes, self.external_encoding)
    }

    fn advance_position(&mut self, len: usize) {
        self.position = self.position.saturating_add(offset_of(len));
    }

    /// Takes up to `limit` bytes from the push-back buffer or, if it is empty, the next chunk
    /// from the resource, which may be longer than `limit`.
    ///
    /// Returns `None` at the end of the stream. Does not move the position.
    fn next_piece(&mut self, limit: usize) -> Result<Option<Bytes>> {
        if !self.pushback.is_empty() {
            return Ok(Some(self.pushback.take_up_to(limit)));
        }

        if self.eof {
            return Ok(None);
        }

        let chunk = next_chunk(&mut self.resource, self.retry_delay)?;
        if chunk.is_none() {
            self.eof = true;
        }

        Ok(chunk)
    }

    /// Ensures the push-back buffer holds data, fetching a chunk into it if it is empty and the
    /// stream has not ended. Does not move the position.
    pub(crate) fn fill_pushback(&mut self) -> Result<()> {
        self.ensure_readable()?;

        if self.pushback.is_empty() && !self.eof {
            match next_chunk(&mut self.resource, self.retry_delay)? {
                Some(chunk) => self.pushback.append(&chunk),
                None => self.eof = true,
            }
        }

        Ok(())
    }

    /// Marks `amount` bytes at the front of the push-back buffer as delivered.
    pub(crate) fn consume_pushback(&mut self, amount: usize) {
        let amount = amount.min(self.pushback.len());
        self.pushback.advance(amount);
        self.advance_position(amount);
    }

    /// Reads exactly `len` bytes, or fewer if the stream ends first.
    ///
    /// With `len` of `None`, reads everything up to the end of the stream.
    ///
    /// Buffered and pushed-back bytes are returned before any new chunk is fetched. If the last
    /// chunk needed holds more than was asked for, the rest is kept for the next read. The position
    /// advances by the number of bytes returned.
    ///
    /// Returns `None` if nothing at all could be read because the stream is at its end, which is
    /// different from an empty result. Asking for zero bytes always returns an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClosedForReading`] if the read direction was closed, or any error reported
    /// by the resource.
    pub fn read(&mut self, len: Option<usize>) -> Result<Option<EncodedBytes>> {
        self.ensure_readable()?;

        if len == Some(0) {
            return Ok(Some(EncodedBytes::empty(self.external_encoding)));
        }

        let mut remaining = len.unwrap_or(usize::MAX);
        let mut result: Option<Bytes> = None;
        let mut accumulated = BytesMut::new();

        while remaining > 0 {
            let Some(mut piece) = self.next_piece(remaining)? else {
                break;
            };

            if piece.len() > remaining {
                let rest = piece.split_off(remaining);
                event!(Level::TRACE, message = "split chunk", kept = piece.len(), buffered = rest.len());
                self.pushback.append(&rest);
            }

            remaining -= piece.len();
            self.advance_position(piece.len());

            // The common case is a read satisfied by a single piece, which needs no copying.
            match result.take() {
                None if accumulated.is_empty() => result = Some(piece),
                first => {
                    if let Some(first) = first {
                        accumulated.put(first);
                    }
                    accumulated.put(piece);
                }
            }
        }

        let data = result.unwrap_or_else(|| accumulated.freeze());
        if data.is_empty() {
            return Ok(None);
        }

        Ok(Some(self.tag(data)))
    }

    /// Reads like [`read()`][Self::read] and appends the result to `buffer`.
    ///
    /// Returns the number of bytes appended, or `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn read_into(&mut self, len: Option<usize>, buffer: &mut Vec<u8>) -> Result<Option<usize>> {
        Ok(self.read(len)?.map(|data| {
            buffer.extend_from_slice(&data);
            data.len()
        }))
    }

    /// Reads at most `len` bytes.
    ///
    /// This waits for data like [`read()`][Self::read] does and returns `len` bytes unless the
    /// stream ends first.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn read_partial(&mut self, len: usize) -> Result<Option<EncodedBytes>> {
        self.read(Some(len))
    }

    /// Returns the push-back buffer if it holds anything, otherwise the next chunk from the
    /// resource, advancing the position past it.
    ///
    /// Returns `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClosedForReading`] if the read direction was closed, or any error reported
    /// by the resource.
    pub fn read_chunk(&mut self) -> Result<Option<EncodedBytes>> {
        self.ensure_readable()?;

        let Some(piece) = self.next_piece(usize::MAX)? else {
            return Ok(None);
        };

        self.advance_position(piece.len());
        Ok(Some(self.tag(piece)))
    }

    /// Reads one byte, returning `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn get_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.read(Some(1))?.and_then(|data| data.first().copied()))
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] at the end of the stream, otherwise same as
    /// [`read()`][Self::read].
    pub fn read_byte(&mut self) -> Result<u8> {
        self.get_byte()?.ok_or(Error::EndOfStream)
    }

    /// Reads one character of the external encoding, returning `None` at the end of the stream.
    ///
    /// The character's length is derived from its first bytes. A lead byte that cannot start a
    /// character is returned on its own, as is a lead byte whose sequence is broken off by a byte
    /// that cannot continue it. That byte starts the next character. A character cut short by the
    /// end of the stream is returned with the bytes that were available.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn get_char(&mut self) -> Result<Option<EncodedBytes>> {
        let encoding = self.external_encoding;

        let Some(head) = self.read(Some(encoding.min_char_len()))? else {
            return Ok(None);
        };

        let full_len = encoding.char_len(&head);
        if full_len <= head.len() {
            return Ok(Some(head));
        }

        let unit_len = encoding.trail_unit_len();
        let mut data = BytesMut::from(head.as_bytes());
        while data.len() < full_len {
            let Some(unit) = self.read(Some(unit_len))? else {
                break;
            };

            if unit.len() == unit_len && !encoding.is_trail_unit(&unit) {
                self.unget_bytes(&unit);
                break;
            }

            data.extend_from_slice(&unit);
        }

        Ok(Some(self.tag(data.freeze())))
    }

    /// Reads one character of the external encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] at the end of the stream, otherwise same as
    /// [`read()`][Self::read].
    pub fn read_char(&mut self) -> Result<EncodedBytes> {
        self.get_char()?.ok_or(Error::EndOfStream)
    }

    /// Reads one line ending in the configured line separator.
    ///
    /// # Errors
    ///
    /// Same as [`read_line()`][Self::read_line].
    pub fn gets(&mut self) -> Result<EncodedBytes> {
        let separator = self.line_separator.clone();
        self.read_line(Some(&separator))
    }

    /// Reads one line ending in `separator`.
    ///
    /// The line includes the separator, unless the stream ended before one was found. With a
    /// `separator` of `None`, reads everything up to the end of the stream. An empty separator
    /// never matches, so it also reads to the end.
    ///
    /// Every call increments the [line number][Self::line_number], even one that fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] if the stream is at its end, otherwise same as
    /// [`read()`][Self::read].
    pub fn read_line(&mut self, separator: Option<&[u8]>) -> Result<EncodedBytes> {
        self.line_number = self.line_number.saturating_add(1);

        let Some(separator) = separator else {
            return self.read(None)?.ok_or(Error::EndOfStream);
        };

        let mut line = BytesMut::new();

        while let Some(byte) = self.get_byte()? {
            line.put_u8(byte);

            if !separator.is_empty() && line.ends_with(separator) {
                break;
            }
        }

        if line.is_empty() {
            return Err(Error::EndOfStream);
        }

        Ok(self.tag(line.freeze()))
    }

    /// Puts `data` back in front of the stream, so it is the next data read.
    ///
    /// The position moves back by the length of `data`. Nothing checks that `data` was read from
    /// the stream before, so the position may become negative.
    pub fn unget_bytes(&mut self, data: impl AsRef<[u8]>) {
        let data = data.as_ref();

        self.pushback.prepend(data);
        self.position = self.position.saturating_sub(offset_of(data.len()));
    }

    /// Puts one byte back in front of the stream.
    pub fn unget_byte(&mut self, byte: u8) {
        self.unget_bytes([byte]);
    }

    /// Puts one character back in front of the stream, encoded in the external encoding.
    pub fn unget_char(&mut self, c: char) {
        let encoded = self.external_encoding.encode_char(c);
        self.unget_bytes(encoded);
    }

    /// Whether a read has found the resource at its end.
    ///
    /// Data pushed back after that point is still returned by reads. The flag is cleared by
    /// seeking.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    // ---------------------------------------------------------------------------------------------
    // Positioning
    // ---------------------------------------------------------------------------------------------

    /// The offset of the next byte to be read.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    /// Moves the stream to `offset` relative to `whence`, returning the new absolute position.
    ///
    /// Discards all buffered and pushed-back data and clears the end-of-stream flag.
    /// [`Whence::Current`] is relative to [`position()`][Self::position].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the resource cannot seek, or any other error it reports.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let (offset, whence) = match whence {
            Whence::Current => {
                let absolute = self
                    .position
                    .checked_add(offset)
                    .ok_or_else(|| Error::InvalidArgument(format!("seek offset {offset} overflows the position")))?;
                (absolute, Whence::Set)
            }
            other => (offset, other),
        };

        let new_position = self.resource.seek(offset, whence)?;

        self.pushback.clear();
        self.eof = false;
        self.position = i64::try_from(new_position).unwrap_or(i64::MAX);

        event!(Level::TRACE, message = "seek", offset, whence = ?whence, position = new_position);
        Ok(new_position)
    }

    /// Moves the stream to the absolute `position`.
    ///
    /// # Errors
    ///
    /// Same as [`seek()`][Self::seek].
    pub fn set_position(&mut self, position: i64) -> Result<()> {
        self.seek(position, Whence::Set)?;
        self.position = position;
        Ok(())
    }

    /// Moves the stream to its start and resets the line number.
    ///
    /// # Errors
    ///
    /// Same as [`seek()`][Self::seek].
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(0, Whence::Set)?;

        self.position = 0;
        self.line_number = 0;
        Ok(())
    }

    /// Reads like [`read()`][Self::read] at `offset`, leaving the position unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`seek()`][Self::seek] and [`read()`][Self::read].
    pub fn pread(&mut self, len: Option<usize>, offset: i64) -> Result<Option<EncodedBytes>> {
        self.at_offset(offset, |stream| stream.read(len))
    }

    /// Runs `op` with the stream moved to `offset`, then puts the stream back as it was.
    ///
    /// Buffered and pushed-back bytes survive the round trip. The resource itself sits at the
    /// logical position plus everything buffered, so that is where it is sent back to.
    pub(crate) fn at_offset<T>(&mut self, offset: i64, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let previous = self.position;
        let eof = self.eof;
        let buffered = Bytes::copy_from_slice(self.pushback.peek());

        self.set_position(offset)?;
        let outcome = op(self);

        self.seek(previous.saturating_add(offset_of(buffered.len())), Whence::Set)?;
        self.pushback.append(&buffered);
        self.position = previous;
        self.eof = eof;

        outcome
    }

    /// How many line reads have been performed since the stream was opened or rewound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpenedForReading`] if the read direction was closed.
    pub fn line_number(&self) -> Result<i64> {
        if !self.readable {
            return Err(Error::NotOpenedForReading);
        }

        Ok(self.line_number)
    }

    /// Overrides the line number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpenedForReading`] if the read direction was closed.
    pub fn set_line_number(&mut self, line_number: i64) -> Result<()> {
        if !self.readable {
            return Err(Error::NotOpenedForReading);
        }

        self.line_number = line_number;
        Ok(())
    }

    /// The separator used by [`gets()`][Self::gets] and the other line reads that do not name one.
    #[must_use]
    pub fn line_separator(&self) -> &[u8] {
        &self.line_separator
    }

    // ---------------------------------------------------------------------------------------------
    // Encodings
    // ---------------------------------------------------------------------------------------------

    /// The encoding all data read from the stream is tagged with.
    #[must_use]
    pub const fn external_encoding(&self) -> Encoding {
        self.external_encoding
    }

    /// The encoding written data is tagged with, if it differs from the external encoding.
    #[must_use]
    pub const fn internal_encoding(&self) -> Option<Encoding> {
        self.internal_encoding
    }

    /// Sets the external encoding.
    pub fn set_external_encoding(&mut self, encoding: Encoding) {
        self.external_encoding = encoding;
    }

    /// Sets or clears the internal encoding.
    pub fn set_internal_encoding(&mut self, encoding: Option<Encoding>) {
        self.internal_encoding = encoding;
    }

    /// Sets encodings from a name in the form `"external"`, `"external:internal"` or
    /// `"external,internal"`.
    ///
    /// Without an internal part, only the external encoding changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the argument is empty or names an unknown encoding.
    /// Neither encoding changes in that case.
    pub fn set_encoding(&mut self, names: &str) -> Result<()> {
        let (external, internal) = parse_encoding_pair(names)?;

        self.external_encoding = external;
        if internal.is_some() {
            self.internal_encoding = internal;
        }

        Ok(())
    }

    /// Sets both encodings.
    pub fn set_encodings(&mut self, external: Encoding, internal: Option<Encoding>) {
        self.external_encoding = external;
        self.internal_encoding = internal;
    }

    // ---------------------------------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------------------------------

    /// Closes the read direction, or the whole stream if the write direction is already closed.
    ///
    /// # Errors
    ///
    /// Returns any error reported by the resource's close hook.
    pub fn close_read(&mut self) -> Result<()> {
        if self.writable {
            self.readable = false;
            Ok(())
        } else {
            self.close()
        }
    }

    /// Closes the write direction, or the whole stream if the read direction is already closed.
    ///
    /// # Errors
    ///
    /// Returns any error reported by the resource's close hook.
    pub fn close_write(&mut self) -> Result<()> {
        if self.readable {
            self.writable = false;
            Ok(())
        } else {
            self.close()
        }
    }

    /// Closes the stream and the resource.
    ///
    /// Closing a closed stream does nothing.
    ///
    /// # Errors
    ///
    /// Returns any error reported by the resource's close hook. The stream is closed regardless.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let result = self.resource.close();

        self.descriptor = None;
        self.readable = false;
        self.writable = false;
        self.closed = true;
        self.pushback.clear();

        event!(Level::DEBUG, message = "stream closed", failed = result.is_err());
        result
    }

    /// Whether the stream has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reopening a stream over a different resource is not supported.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotSupported`].
    pub fn reopen(&mut self) -> Result<()> {
        Err(Error::not_supported("reopen"))
    }

    /// The descriptor returned by the resource's open hook, until the stream is closed.
    #[must_use]
    pub const fn fileno(&self) -> Option<i64> {
        self.descriptor
    }

    /// The process associated with the stream, if any.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the stream reports itself as attached to a terminal.
    #[must_use]
    pub const fn is_tty(&self) -> bool {
        self.tty
    }

    /// The sync flag. It is recorded but has no effect, as the stream buffers no written data.
    #[must_use]
    pub const fn sync(&self) -> bool {
        self.sync
    }

    /// Sets the sync flag.
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
    }

    /// Switches the stream to binary mode.
    pub fn binmode(&mut self) -> &mut Self {
        self.binmode = true;
        self
    }

    /// Whether the stream was switched to binary mode.
    #[must_use]
    pub const fn is_binmode(&self) -> bool {
        self.binmode
    }

    /// Whether dropping the stream closes it.
    #[must_use]
    pub const fn autoclose(&self) -> bool {
        self.autoclose
    }

    /// Sets whether dropping the stream closes it.
    pub fn set_autoclose(&mut self, autoclose: bool) {
        self.autoclose = autoclose;
    }

    /// The close-on-exec flag.
    #[must_use]
    pub const fn close_on_exec(&self) -> bool {
        self.close_on_exec
    }

    /// Sets the close-on-exec flag.
    pub fn set_close_on_exec(&mut self, close_on_exec: bool) {
        self.close_on_exec = close_on_exec;
    }

    /// Announces an intended access pattern. Accepted and ignored.
    ///
    /// # Errors
    ///
    /// This call never fails.
    pub fn advise(&mut self, advice: Advice, offset: u64, len: u64) -> Result<()> {
        event!(Level::TRACE, message = "advise ignored", advice = ?advice, offset, len);
        Ok(())
    }

    /// File metadata is not available for adapted resources.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotSupported`].
    pub fn stat(&self) -> Result<std::fs::Metadata> {
        Err(Error::not_supported("stat"))
    }

    /// Device control requests are not supported.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotSupported`].
    pub fn ioctl(&mut self, command: u64, argument: u64) -> Result<i64> {
        let _ = (command, argument);
        Err(Error::not_supported("ioctl"))
    }

    /// Descriptor control requests are not supported.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotSupported`].
    pub fn fcntl(&mut self, command: u64, argument: u64) -> Result<i64> {
        let _ = (command, argument);
        Err(Error::not_supported("fcntl"))
    }
}

impl<R: Resource> Drop for BufferedStream<R> {
    fn drop(&mut self) {
        if self.autoclose
            && !self.closed
            && let Err(error) = self.close()
        {
            warn!(%error, "failed to close stream on drop");
        }
    }
}

impl<R: Resource> fmt::Debug for BufferedStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedStream")
            .field("fd", &self.descriptor)
            .field("position", &self.position)
            .field("line_number", &self.line_number)
            .field("eof", &self.eof)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("closed", &self.closed)
            .field("external_encoding", &self.external_encoding)
            .field("internal_encoding", &self.internal_encoding)
            .field("buffered", &self.pushback.len())
            .finish_non_exhaustive()
    }
}

fn offset_of(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::testing::FakeResource;

    fn lines_stream() -> BufferedStream<FakeResource> {
        BufferedStream::new(FakeResource::builder().chunks(["one\n", "two\nthree\n", "four\n"]).build()).unwrap()
    }

    #[test]
    fn send_when_resource_is_send() {
        assert_impl_all!(BufferedStream<FakeResource>: Send);
    }

    #[test]
    fn opens_on_construction() {
        let stream = BufferedStream::new(FakeResource::builder().descriptor(3).build()).unwrap();

        assert!(!stream.is_closed());
        assert_eq!(stream.fileno(), Some(3));
        assert_eq!(stream.position(), 0);
        assert_eq!(stream.line_number().unwrap(), 0);
        assert!(!stream.is_eof());
        assert!(!stream.is_tty());
        assert_eq!(stream.pid(), None);
        assert!(!stream.sync());
        assert!(stream.autoclose());
        assert!(stream.close_on_exec());
        assert!(!stream.is_binmode());
        assert_eq!(stream.external_encoding(), Encoding::Utf8);
        assert_eq!(stream.internal_encoding(), None);
    }

    #[test]
    fn failed_open_is_surfaced() {
        struct Unopenable;

        impl Resource for Unopenable {
            fn open(&mut self) -> Result<Option<i64>> {
                Err(Error::StdIo(std::io::Error::from(std::io::ErrorKind::PermissionDenied)))
            }
        }

        let err = BufferedStream::new(Unopenable).unwrap_err();
        assert!(matches!(err, Error::StdIo(e) if e.kind() == std::io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn read_everything() {
        let mut stream = lines_stream();

        assert_eq!(stream.read(None).unwrap().unwrap(), "one\ntwo\nthree\nfour\n");
        assert_eq!(stream.position(), 19);
        assert!(stream.is_eof());
    }

    #[test]
    fn read_at_end_returns_no_data() {
        let mut stream = lines_stream();
        stream.read(None).unwrap();

        assert!(stream.read(None).unwrap().is_none());
        assert!(stream.read(Some(3)).unwrap().is_none());
    }

    #[test]
    fn read_keeps_overshoot_for_next_read() {
        let mut stream = lines_stream();

        assert_eq!(stream.read(Some(4)).unwrap().unwrap(), "one\n");
        assert_eq!(stream.read(Some(1)).unwrap().unwrap(), "t");
        assert_eq!(stream.position(), 5);
    }

    #[test]
    fn read_spans_chunks() {
        let mut stream = lines_stream();

        assert_eq!(stream.read(Some(3)).unwrap().unwrap(), "one");
        assert_eq!(stream.read(Some(6)).unwrap().unwrap(), "\ntwo\nt");
        assert_eq!(stream.read(Some(100)).unwrap().unwrap(), "hree\nfour\n");
        assert_eq!(stream.position(), 19);
    }

    #[test]
    fn read_zero_bytes_is_empty_not_none() {
        let mut stream = lines_stream();

        let data = stream.read(Some(0)).unwrap().unwrap();
        assert!(data.is_empty());
        assert_eq!(stream.get_ref().fetch_count(), 0);
    }

    #[test]
    fn read_is_byte_exact_inside_multibyte_characters() {
        let chunks = ["Σὲ ", "γνωρίζω ἀπὸ", " τὴν κόψη"];
        let text = chunks.concat();
        let mut stream = BufferedStream::new(FakeResource::builder().chunks(chunks).build()).unwrap();

        let first = stream.read(Some(1)).unwrap().unwrap();
        assert_eq!(first.as_bytes(), &text.as_bytes()[..1]);
        assert_eq!(first.encoding(), Encoding::Utf8);
    }

    #[test]
    fn successive_reads_reassemble_multibyte_text() {
        let chunks = ["Σὲ ", "γνωρίζω ἀπὸ", " τὴν κόψη"];
        let text = chunks.concat();

        for k in 1..=8 {
            let mut stream = BufferedStream::new(FakeResource::builder().chunks(chunks).build()).unwrap();
            let mut collected = Vec::new();
            while let Some(piece) = stream.read(Some(k)).unwrap() {
                assert!(piece.len() <= k);
                collected.extend_from_slice(&piece);
            }

            assert_eq!(collected, text.as_bytes(), "read size {k}");
            assert_eq!(stream.position(), offset_of(text.len()));
        }
    }

    #[test]
    fn read_into_appends() {
        let mut stream = lines_stream();
        let mut buffer = b"> ".to_vec();

        assert_eq!(stream.read_into(Some(3), &mut buffer).unwrap(), Some(3));
        assert_eq!(stream.read_into(Some(1), &mut buffer).unwrap(), Some(1));
        assert_eq!(buffer, b"> one\n");
    }

    #[test]
    fn read_partial_reads_up_to_len() {
        let mut stream = lines_stream();

        assert_eq!(stream.read_partial(3).unwrap().unwrap(), "one");
        assert_eq!(stream.read_partial(3).unwrap().unwrap(), "\ntw");
    }

    #[test]
    fn read_chunk_returns_buffered_data_first() {
        let mut stream = lines_stream();

        stream.read(Some(2)).unwrap();
        assert_eq!(stream.read_chunk().unwrap().unwrap(), "e\n");
        assert_eq!(stream.read_chunk().unwrap().unwrap(), "two\nthree\n");
        assert_eq!(stream.position(), 14);
    }

    #[test]
    fn bytes_and_chars() {
        let mut stream = lines_stream();

        assert_eq!(stream.get_byte().unwrap(), Some(b'o'));
        assert_eq!(stream.read_byte().unwrap(), b'n');
        assert_eq!(stream.get_char().unwrap().unwrap(), "e");
        assert_eq!(stream.read_char().unwrap(), "\n");
    }

    #[test]
    fn char_reads_follow_external_encoding() {
        let resource = FakeResource::builder().chunks([&b"\xCE"[..], b"\xA3x"]).build();
        let mut stream = BufferedStream::new(resource).unwrap();

        assert_eq!(stream.read_char().unwrap(), "Σ");
        assert_eq!(stream.read_char().unwrap(), "x");
        assert!(stream.get_char().unwrap().is_none());
    }

    #[test]
    fn char_reads_in_utf16() {
        let options = StreamOptions::builder().external_encoding(Encoding::Utf16Le).build();
        let resource = FakeResource::builder().chunk(&[0x41_u8, 0x00, 0x3E, 0xD8, 0x80, 0xDD][..]).build();
        let mut stream = BufferedStream::with_options(resource, options).unwrap();

        let a = stream.read_char().unwrap();
        assert_eq!(a.codepoint().unwrap(), u32::from('A'));

        let crab = stream.read_char().unwrap();
        assert_eq!(crab.len(), 4);
        assert_eq!(crab.encoding(), Encoding::Utf16Le);
    }

    #[test]
    fn truncated_character_returns_available_bytes() {
        let resource = FakeResource::builder().chunk(&b"\xE1\xBD"[..]).build();
        let mut stream = BufferedStream::new(resource).unwrap();

        assert_eq!(stream.read_char().unwrap(), &b"\xE1\xBD"[..]);
        assert!(matches!(stream.read_char(), Err(Error::EndOfStream)));
    }

    #[test]
    fn broken_utf8_sequence_keeps_following_characters() {
        let resource = FakeResource::builder().chunk(&b"\xE3ab\n"[..]).build();
        let mut stream = BufferedStream::new(resource).unwrap();

        let chars: Vec<_> = stream.chars().map(Result::unwrap).collect();
        assert_eq!(chars, [&b"\xE3"[..], b"a", b"b", b"\n"]);
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn broken_utf8_sequence_across_chunks() {
        let resource = FakeResource::builder().chunks([&b"\xE2\x82"[..], b"x\xE2\x82\xAC"]).build();
        let mut stream = BufferedStream::new(resource).unwrap();

        assert_eq!(stream.read_char().unwrap(), &b"\xE2\x82"[..]);
        assert_eq!(stream.read_char().unwrap(), "x");
        assert_eq!(stream.read_char().unwrap(), "€");
    }

    #[test]
    fn lone_high_surrogate_in_utf16() {
        let options = StreamOptions::builder().external_encoding(Encoding::Utf16Le).build();
        let resource = FakeResource::builder().chunk(&[0x3E_u8, 0xD8, 0x41, 0x00][..]).build();
        let mut stream = BufferedStream::with_options(resource, options).unwrap();

        assert_eq!(stream.read_char().unwrap(), [0x3E_u8, 0xD8]);
        assert_eq!(stream.position(), 2);

        let a = stream.read_char().unwrap();
        assert_eq!(a.codepoint().unwrap(), u32::from('A'));
        assert!(stream.get_char().unwrap().is_none());
    }

    #[test]
    fn must_succeed_reads_fail_at_end() {
        let mut stream = BufferedStream::new(FakeResource::builder().build()).unwrap();

        assert!(matches!(stream.read_byte(), Err(Error::EndOfStream)));
        assert!(matches!(stream.read_char(), Err(Error::EndOfStream)));
        assert!(matches!(stream.gets(), Err(Error::EndOfStream)));
        assert_eq!(stream.get_byte().unwrap(), None);
    }

    #[test]
    fn gets_reads_lines_and_counts_them() {
        let mut stream = lines_stream();

        assert_eq!(stream.gets().unwrap(), "one\n");
        assert_eq!(stream.gets().unwrap(), "two\n");
        assert_eq!(stream.gets().unwrap(), "three\n");
        assert_eq!(stream.line_number().unwrap(), 3);
        assert_eq!(stream.position(), 14);
    }

    #[test]
    fn read_line_without_separator_reads_everything_and_counts() {
        let mut stream = lines_stream();

        assert_eq!(stream.read_line(None).unwrap(), "one\ntwo\nthree\nfour\n");
        assert_eq!(stream.line_number().unwrap(), 1);
    }

    #[test]
    fn failed_line_reads_still_count() {
        let mut stream = BufferedStream::new(FakeResource::builder().build()).unwrap();

        assert!(stream.read_line(Some(&b"\n"[..])).is_err());
        assert!(stream.read_line(None).is_err());
        assert_eq!(stream.line_number().unwrap(), 2);
    }

    #[test]
    fn read_line_with_multibyte_separator() {
        let resource = FakeResource::builder().chunks(["GET / HTTP/1.1\r", "\nHost: x\r\n\r\n"]).build();
        let mut stream = BufferedStream::new(resource).unwrap();

        assert_eq!(stream.read_line(Some(&b"\r\n"[..])).unwrap(), "GET / HTTP/1.1\r\n");
        assert_eq!(stream.read_line(Some(&b"\r\n"[..])).unwrap(), "Host: x\r\n");
        assert_eq!(stream.read_line(Some(&b"\r\n"[..])).unwrap(), "\r\n");
    }

    #[test]
    fn last_line_without_separator() {
        let resource = FakeResource::builder().chunk("tail").build();
        let mut stream = BufferedStream::new(resource).unwrap();

        assert_eq!(stream.gets().unwrap(), "tail");
        assert!(matches!(stream.gets(), Err(Error::EndOfStream)));
    }

    #[test]
    fn configured_line_separator() {
        let options = StreamOptions::builder().line_separator("|").build();
        let resource = FakeResource::builder().chunk("a|b|").build();
        let mut stream = BufferedStream::with_options(resource, options).unwrap();

        assert_eq!(stream.line_separator(), b"|");
        assert_eq!(stream.gets().unwrap(), "a|");
        assert_eq!(stream.gets().unwrap(), "b|");
    }

    #[test]
    fn unget_round_trip() {
        let mut stream = lines_stream();

        let data = stream.read(Some(4)).unwrap().unwrap();
        for c in data.as_str().unwrap().chars().rev() {
            stream.unget_char(c);
        }

        assert_eq!(stream.position(), 0);
        assert_eq!(stream.read(Some(4)).unwrap().unwrap(), data);
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn unget_goes_before_buffered_overshoot() {
        let mut stream = lines_stream();

        stream.read(Some(2)).unwrap();
        stream.unget_bytes("XY");

        assert_eq!(stream.read(Some(4)).unwrap().unwrap(), "XYe\n");
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn unget_without_read_makes_position_negative() {
        let mut stream = lines_stream();

        stream.unget_byte(b'>');
        assert_eq!(stream.position(), -1);
        assert_eq!(stream.read(Some(2)).unwrap().unwrap(), ">o");
        assert_eq!(stream.position(), 1);
    }

    #[test]
    fn pushed_back_data_is_readable_after_end() {
        let mut stream = lines_stream();

        stream.read(None).unwrap();
        assert!(stream.is_eof());

        stream.unget_bytes("again");
        assert_eq!(stream.read(None).unwrap().unwrap(), "again");
        assert!(stream.read(None).unwrap().is_none());
    }

    #[test]
    fn waits_for_data() {
        let resource = FakeResource::builder().no_data_yet().chunk("a").no_data_yet().no_data_yet().chunk("b").build();
        let options = StreamOptions::builder().retry_delay(Duration::from_millis(1)).build();
        let mut stream = BufferedStream::with_options(resource, options).unwrap();

        assert_eq!(stream.read(None).unwrap().unwrap(), "ab");
        assert_eq!(stream.get_ref().fetch_count(), 6);
    }

    #[test]
    fn empty_chunk_ends_the_stream() {
        let resource = FakeResource::builder().chunk("a").empty_chunk().chunk("never").build();
        let mut stream = BufferedStream::new(resource).unwrap();

        assert_eq!(stream.read(None).unwrap().unwrap(), "a");
        assert!(stream.is_eof());
        assert!(stream.read(None).unwrap().is_none());
        assert_eq!(stream.get_ref().fetch_count(), 2);
    }

    #[test]
    fn closed_for_reading() {
        let mut stream = lines_stream();
        stream.close_read().unwrap();

        assert!(!stream.is_closed());
        assert!(matches!(stream.read(None), Err(Error::ClosedForReading)));
        assert!(matches!(stream.read_chunk(), Err(Error::ClosedForReading)));
        assert!(matches!(stream.gets(), Err(Error::ClosedForReading)));
        assert!(matches!(stream.line_number(), Err(Error::NotOpenedForReading)));
        assert!(matches!(stream.set_line_number(5), Err(Error::NotOpenedForReading)));
    }

    #[test]
    fn closing_both_directions_closes_the_stream() {
        let mut stream = lines_stream();

        stream.close_read().unwrap();
        stream.close_write().unwrap();

        assert!(stream.is_closed());
        assert_eq!(stream.get_ref().close_count(), 1);
    }

    #[test]
    fn close_is_idempotent() {
        let mut stream = BufferedStream::new(FakeResource::builder().descriptor(3).build()).unwrap();

        stream.close().unwrap();
        stream.close().unwrap();

        assert!(stream.is_closed());
        assert_eq!(stream.fileno(), None);
        assert_eq!(stream.get_ref().close_count(), 1);
    }

    #[test]
    fn seek_requires_resource_support() {
        let mut stream = lines_stream();

        assert!(matches!(stream.seek(0, Whence::Set), Err(Error::NotSupported { operation: "seek" })));
        assert!(matches!(stream.rewind(), Err(Error::NotSupported { .. })));
    }

    #[test]
    fn seek_discards_buffered_data() {
        let resource = FakeResource::builder().chunks(["one\n", "two\nthree\n", "four\n"]).seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        stream.read(Some(6)).unwrap();
        stream.unget_bytes("junk");

        assert_eq!(stream.seek(8, Whence::Set).unwrap(), 8);
        assert_eq!(stream.position(), 8);
        assert_eq!(stream.gets().unwrap(), "three\n");
    }

    #[test]
    fn seek_relative_to_logical_position() {
        let resource = FakeResource::builder().chunks(["one\n", "two\nthree\n", "four\n"]).seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        // The resource has handed out "one\ntwo\nthree\n", the stream only "one\nt".
        stream.read(Some(5)).unwrap();
        assert_eq!(stream.seek(-1, Whence::Current).unwrap(), 4);
        assert_eq!(stream.read(Some(3)).unwrap().unwrap(), "two");
    }

    #[test]
    fn seek_clears_end_of_stream() {
        let resource = FakeResource::builder().chunks(["ab", "cd"]).seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        stream.read(None).unwrap();
        assert!(stream.is_eof());

        stream.seek(-1, Whence::End).unwrap();
        assert!(!stream.is_eof());
        assert_eq!(stream.read(None).unwrap().unwrap(), "d");
    }

    #[test]
    fn rewind_resets_position_and_line_number() {
        let resource = FakeResource::builder().chunks(["one\n", "two\n"]).seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        stream.gets().unwrap();
        stream.gets().unwrap();
        stream.rewind().unwrap();

        assert_eq!(stream.position(), 0);
        assert_eq!(stream.line_number().unwrap(), 0);
        assert_eq!(stream.gets().unwrap(), "one\n");
    }

    #[test]
    fn pread_leaves_position_unchanged() {
        let resource = FakeResource::builder().chunks(["one\n", "two\nthree\n", "four\n"]).seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        stream.read(Some(2)).unwrap();

        assert_eq!(stream.pread(Some(5), 8).unwrap().unwrap(), "three");
        assert_eq!(stream.position(), 2);
        assert_eq!(stream.read(Some(2)).unwrap().unwrap(), "e\n");
    }

    #[test]
    fn pread_keeps_pushed_back_bytes() {
        let resource = FakeResource::builder().chunk("abcdef").seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        stream.unget_bytes("X");

        assert_eq!(stream.pread(Some(2), 2).unwrap().unwrap(), "cd");
        assert_eq!(stream.position(), -1);
        assert_eq!(stream.read(None).unwrap().unwrap(), "Xabcdef");
    }

    #[test]
    fn pread_at_end_keeps_end_of_stream() {
        let resource = FakeResource::builder().chunk("abc").seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        assert_eq!(stream.read(None).unwrap().unwrap(), "abc");
        stream.unget_byte(b'c');

        assert_eq!(stream.pread(Some(1), 0).unwrap().unwrap(), "a");
        assert!(stream.is_eof());
        assert_eq!(stream.position(), 2);
        assert_eq!(stream.read(None).unwrap().unwrap(), "c");
        assert!(stream.read(None).unwrap().is_none());
    }

    #[test]
    fn failed_pread_leaves_stream_untouched() {
        let resource = FakeResource::builder().chunk("abcdef").seekable().build();
        let mut stream = BufferedStream::new(resource).unwrap();

        stream.read(Some(1)).unwrap();
        stream.unget_bytes("XY");

        assert!(stream.pread(Some(1), -5).is_err());
        assert_eq!(stream.position(), -1);
        assert_eq!(stream.read(None).unwrap().unwrap(), "XYbcdef");
    }

    #[test]
    fn set_encoding_forms() {
        let mut stream = lines_stream();

        stream.set_encoding("ASCII-8BIT").unwrap();
        assert_eq!(stream.external_encoding(), Encoding::Binary);
        assert_eq!(stream.internal_encoding(), None);

        stream.set_encoding("UTF-16LE:UTF-8").unwrap();
        assert_eq!(stream.external_encoding(), Encoding::Utf16Le);
        assert_eq!(stream.internal_encoding(), Some(Encoding::Utf8));

        stream.set_encodings(Encoding::Utf8, None);
        assert_eq!(stream.internal_encoding(), None);

        assert!(matches!(stream.set_encoding("bogus"), Err(Error::InvalidArgument(_))));
        assert_eq!(stream.external_encoding(), Encoding::Utf8);
    }

    #[test]
    fn reads_are_tagged_with_external_encoding() {
        let mut stream = lines_stream();
        stream.set_external_encoding(Encoding::Binary);

        assert_eq!(stream.gets().unwrap().encoding(), Encoding::Binary);
        assert_eq!(stream.read_char().unwrap().encoding(), Encoding::Binary);
        assert_eq!(stream.read(Some(2)).unwrap().unwrap().encoding(), Encoding::Binary);
    }

    #[test]
    fn compatibility_flags() {
        let mut stream = lines_stream();

        stream.binmode();
        stream.set_sync(true);
        stream.set_autoclose(false);
        stream.set_close_on_exec(false);

        assert!(stream.is_binmode());
        assert!(stream.sync());
        assert!(!stream.autoclose());
        assert!(!stream.close_on_exec());
        stream.advise(Advice::Sequential, 0, 0).unwrap();
    }

    #[test]
    fn unsupported_operations() {
        let mut stream = lines_stream();

        assert!(matches!(stream.stat(), Err(Error::NotSupported { operation: "stat" })));
        assert!(matches!(stream.ioctl(1, 2), Err(Error::NotSupported { operation: "ioctl" })));
        assert!(matches!(stream.fcntl(1, 2), Err(Error::NotSupported { operation: "fcntl" })));
        assert!(matches!(stream.reopen(), Err(Error::NotSupported { operation: "reopen" })));
    }

    #[test]
    fn drop_closes_when_autoclose_is_set() {
        let closes = FakeResource::close_counter();

        drop(BufferedStream::new(FakeResource::builder().close_counter(closes.clone()).build()).unwrap());
        assert_eq!(closes.get(), 1);

        let mut stream = BufferedStream::new(FakeResource::builder().close_counter(closes.clone()).build()).unwrap();
        stream.set_autoclose(false);
        drop(stream);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn debug_shows_descriptor() {
        let stream = BufferedStream::new(FakeResource::builder().descriptor(3).build()).unwrap();
        let debug = format!("{stream:?}");

        assert!(debug.starts_with("BufferedStream { fd: Some(3)"), "{debug}");
    }
}
