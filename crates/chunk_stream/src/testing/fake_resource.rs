// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;

use crate::{ChunkResult, EncodedBytes, Error, Resource, Result, Whence};

#[derive(Debug)]
enum Step {
    Data(Bytes),
    NoDataYet,
    EmptyChunk,
}

/// Counts how often the close hook of one or more [`FakeResource`]s was called.
///
/// Clones share the count, so a test can keep a clone to inspect after the stream that owns the
/// resource has been dropped.
#[derive(Clone, Debug, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    /// The number of close calls so far.
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// A [`Resource`] that plays back a script of chunks and records everything written to it.
///
/// This is for test and example purposes only and is not optimized for performance.
///
/// # Example
///
/// ```
/// use chunk_stream::BufferedStream;
/// use chunk_stream::testing::FakeResource;
///
/// let resource = FakeResource::builder().chunk("hello\n").descriptor(3).build();
/// let mut stream = BufferedStream::new(resource)?;
///
/// assert_eq!(stream.fileno(), Some(3));
/// assert_eq!(stream.gets()?, "hello\n");
///
/// stream.write("bye")?;
/// assert_eq!(stream.get_ref().written_bytes(), b"bye");
/// # Ok::<(), chunk_stream::Error>(())
/// ```
#[derive(Debug)]
pub struct FakeResource {
    steps: VecDeque<Step>,

    // Every data chunk in script order, used to rebuild the script when seeking.
    chunks: Vec<Bytes>,
    seekable: bool,

    descriptor: Option<i64>,
    reject_writes: bool,
    fail_close: bool,

    written: Vec<EncodedBytes>,
    fetch_count: usize,
    closes: CloseCounter,
}

impl FakeResource {
    /// Starts building a new `FakeResource`.
    #[must_use]
    pub fn builder() -> FakeResourceBuilder {
        FakeResourceBuilder {
            steps: VecDeque::new(),
            seekable: false,
            descriptor: None,
            reject_writes: false,
            fail_close: false,
            closes: CloseCounter::default(),
        }
    }

    /// Creates a new `FakeResource` that produces the given chunks and then ends.
    #[must_use]
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self::builder().chunks(chunks).build()
    }

    /// Creates a shared close counter to pass to [`FakeResourceBuilder::close_counter()`].
    #[must_use]
    pub fn close_counter() -> CloseCounter {
        CloseCounter::default()
    }

    /// Everything written so far, one entry per write.
    #[must_use]
    pub fn written(&self) -> &[EncodedBytes] {
        &self.written
    }

    /// Everything written so far, concatenated.
    #[must_use]
    pub fn written_bytes(&self) -> Vec<u8> {
        self.written.iter().flat_map(|data| data.iter().copied()).collect()
    }

    /// How many times a chunk was requested, including requests answered with "no data yet" or
    /// with the end of the stream.
    #[must_use]
    pub const fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    /// How many times the resource was closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.get()
    }

    fn total_len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }
}

impl Resource for FakeResource {
    fn open(&mut self) -> Result<Option<i64>> {
        Ok(self.descriptor)
    }

    fn fetch_chunk(&mut self) -> Result<ChunkResult> {
        self.fetch_count += 1;

        Ok(match self.steps.pop_front() {
            Some(Step::Data(chunk)) => ChunkResult::Data(chunk),
            Some(Step::NoDataYet) => ChunkResult::NoDataYet,
            Some(Step::EmptyChunk) => ChunkResult::Data(Bytes::new()),
            None => ChunkResult::EndOfStream,
        })
    }

    fn write_chunk(&mut self, data: EncodedBytes) -> Result<usize> {
        if self.reject_writes {
            return Ok(0);
        }

        let len = data.len();
        self.written.push(data);
        Ok(len)
    }

    /// Repositions playback. The rest of the script is replaced by the data chunks from the new
    /// position on, keeping their original boundaries.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        if !self.seekable {
            return Err(Error::not_supported("seek"));
        }

        let base = match whence {
            Whence::Set => 0,
            Whence::End => i64::try_from(self.total_len()).unwrap_or(i64::MAX),
            Whence::Current | Whence::Data | Whence::Hole => {
                return Err(Error::InvalidArgument(format!("unsupported whence {whence:?}")));
            }
        };

        let target = base
            .checked_add(offset)
            .and_then(|target| usize::try_from(target).ok())
            .ok_or_else(|| Error::InvalidArgument(format!("cannot seek to {offset} from {whence:?}")))?;

        self.steps.clear();

        let mut start = 0;
        for chunk in &self.chunks {
            let end = start + chunk.len();

            if end > target {
                let skip = target.saturating_sub(start);
                self.steps.push_back(Step::Data(chunk.slice(skip..)));
            }

            start = end;
        }

        Ok(target as u64)
    }

    fn close(&mut self) -> Result<()> {
        self.closes.increment();

        if self.fail_close {
            return Err(Error::StdIo(std::io::Error::other("close failed")));
        }

        Ok(())
    }
}

/// Creates an instance of [`FakeResource`].
///
/// Access through [`FakeResource::builder()`].
#[derive(Debug)]
pub struct FakeResourceBuilder {
    steps: VecDeque<Step>,
    seekable: bool,
    descriptor: Option<i64>,
    reject_writes: bool,
    fail_close: bool,
    closes: CloseCounter,
}

impl FakeResourceBuilder {
    /// Appends a data chunk to the script.
    #[must_use]
    pub fn chunk(mut self, chunk: impl Into<Bytes>) -> Self {
        self.steps.push_back(Step::Data(chunk.into()));
        self
    }

    /// Appends data chunks to the script.
    #[must_use]
    pub fn chunks<I>(mut self, chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        self.steps.extend(chunks.into_iter().map(|chunk| Step::Data(chunk.into())));
        self
    }

    /// Appends a "no data yet" answer to the script.
    #[must_use]
    pub fn no_data_yet(mut self) -> Self {
        self.steps.push_back(Step::NoDataYet);
        self
    }

    /// Appends an empty chunk to the script.
    #[must_use]
    pub fn empty_chunk(mut self) -> Self {
        self.steps.push_back(Step::EmptyChunk);
        self
    }

    /// Allows seeking relative to the start or the end of the data chunks.
    ///
    /// Optional. Without this, seeking fails with [`Error::NotSupported`].
    #[must_use]
    pub const fn seekable(mut self) -> Self {
        self.seekable = true;
        self
    }

    /// The descriptor returned when the resource is opened.
    ///
    /// Optional. Defaults to none.
    #[must_use]
    pub const fn descriptor(mut self, descriptor: i64) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Makes every write accept zero bytes.
    #[must_use]
    pub const fn reject_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    /// Makes the close hook fail after counting the call.
    #[must_use]
    pub const fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Counts close calls in a counter shared with the caller.
    ///
    /// Optional. Defaults to a counter private to the resource.
    #[must_use]
    pub fn close_counter(mut self, counter: CloseCounter) -> Self {
        self.closes = counter;
        self
    }

    /// Builds the `FakeResource` with the provided configuration.
    #[must_use]
    pub fn build(self) -> FakeResource {
        let chunks = self
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Data(chunk) => Some(chunk.clone()),
                Step::NoDataYet | Step::EmptyChunk => None,
            })
            .collect();

        FakeResource {
            steps: self.steps,
            chunks,
            seekable: self.seekable,
            descriptor: self.descriptor,
            reject_writes: self.reject_writes,
            fail_close: self.fail_close,
            written: Vec::new(),
            fetch_count: 0,
            closes: self.closes,
        }
    }
}
