// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Iteration over the data of a [`BufferedStream`].
//!
//! Each iterator yields `Result` items. The first error ends the iteration.

use std::iter::FusedIterator;

use crate::{BufferedStream, EncodedBytes, Error, Resource, Result};

macro_rules! stream_iterator {
    ($(#[$meta:meta])* $name:ident, $item:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        #[must_use = "iterators are lazy and do nothing unless consumed"]
        pub struct $name<'a, R: Resource> {
            stream: &'a mut BufferedStream<R>,
            done: bool,
        }

        impl<'a, R: Resource> $name<'a, R> {
            fn new(stream: &'a mut BufferedStream<R>) -> Self {
                Self { stream, done: false }
            }

            fn yield_next(&mut self, next: Result<Option<$item>>) -> Option<Result<$item>> {
                match next {
                    Ok(Some(item)) => Some(Ok(item)),
                    Ok(None) => {
                        self.done = true;
                        None
                    }
                    Err(error) => {
                        self.done = true;
                        Some(Err(error))
                    }
                }
            }
        }

        impl<R: Resource> FusedIterator for $name<'_, R> {}
    };
}

stream_iterator!(
    /// Yields the push-back buffer, then the resource's chunks. Created by [`BufferedStream::chunks()`].
    Chunks,
    EncodedBytes
);

stream_iterator!(
    /// Yields single bytes. Created by [`BufferedStream::bytes()`].
    Bytes,
    u8
);

stream_iterator!(
    /// Yields characters of the external encoding. Created by [`BufferedStream::chars()`].
    Chars,
    EncodedBytes
);

stream_iterator!(
    /// Yields the code points of characters of the external encoding. Created by
    /// [`BufferedStream::codepoints()`].
    Codepoints,
    u32
);

impl<R: Resource> Iterator for Chunks<'_, R> {
    type Item = Result<EncodedBytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.stream.read_chunk();
        self.yield_next(next)
    }
}

impl<R: Resource> Iterator for Bytes<'_, R> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.stream.get_byte();
        self.yield_next(next)
    }
}

impl<R: Resource> Iterator for Chars<'_, R> {
    type Item = Result<EncodedBytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.stream.get_char();
        self.yield_next(next)
    }
}

impl<R: Resource> Iterator for Codepoints<'_, R> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.stream.get_char().and_then(|c| c.map(|c| c.codepoint()).transpose());
        self.yield_next(next)
    }
}

/// Yields lines. Created by [`BufferedStream::lines()`] and [`BufferedStream::lines_with()`].
#[derive(Debug)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Lines<'a, R: Resource> {
    stream: &'a mut BufferedStream<R>,
    separator: Option<bytes::Bytes>,
    done: bool,
}

impl<R: Resource> Iterator for Lines<'_, R> {
    type Item = Result<EncodedBytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.stream.read_line(self.separator.as_deref()) {
            Ok(line) => Some(Ok(line)),
            Err(Error::EndOfStream) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

impl<R: Resource> FusedIterator for Lines<'_, R> {}

impl<R: Resource> BufferedStream<R> {
    /// Iterates over the push-back buffer and then the resource's chunks as they arrive.
    pub fn chunks(&mut self) -> Chunks<'_, R> {
        Chunks::new(self)
    }

    /// Iterates over single bytes.
    pub fn bytes(&mut self) -> Bytes<'_, R> {
        Bytes::new(self)
    }

    /// Iterates over characters of the external encoding.
    pub fn chars(&mut self) -> Chars<'_, R> {
        Chars::new(self)
    }

    /// Iterates over the code points of characters of the external encoding.
    ///
    /// A character that does not decode yields [`Error::InvalidByteSequence`] and ends the
    /// iteration.
    pub fn codepoints(&mut self) -> Codepoints<'_, R> {
        Codepoints::new(self)
    }

    /// Iterates over lines ending in the configured line separator.
    pub fn lines(&mut self) -> Lines<'_, R> {
        Lines {
            separator: Some(self.line_separator.clone()),
            stream: self,
            done: false,
        }
    }

    /// Iterates over lines ending in `separator`, or over a single line holding everything up to
    /// the end of the stream if `separator` is `None`.
    ///
    /// Each line read increments the [line number][Self::line_number].
    pub fn lines_with(&mut self, separator: Option<&[u8]>) -> Lines<'_, R> {
        Lines {
            separator: separator.map(bytes::Bytes::copy_from_slice),
            stream: self,
            done: false,
        }
    }

    /// Reads all remaining lines ending in the configured line separator.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn read_lines(&mut self) -> Result<Vec<EncodedBytes>> {
        self.lines().collect()
    }

    /// Reads all remaining lines ending in `separator`.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn read_lines_with(&mut self, separator: Option<&[u8]>) -> Result<Vec<EncodedBytes>> {
        self.lines_with(separator).collect()
    }

    /// Calls `f` with the push-back buffer and then each chunk of the resource.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn each_chunk(&mut self, mut f: impl FnMut(EncodedBytes)) -> Result<()> {
        self.chunks().try_for_each(|chunk| chunk.map(&mut f))
    }

    /// Calls `f` with each byte.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn each_byte(&mut self, mut f: impl FnMut(u8)) -> Result<()> {
        self.bytes().try_for_each(|byte| byte.map(&mut f))
    }

    /// Calls `f` with each character.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn each_char(&mut self, mut f: impl FnMut(EncodedBytes)) -> Result<()> {
        self.chars().try_for_each(|c| c.map(&mut f))
    }

    /// Calls `f` with the code point of each character.
    ///
    /// # Errors
    ///
    /// Same as [`codepoints()`][Self::codepoints].
    pub fn each_codepoint(&mut self, mut f: impl FnMut(u32)) -> Result<()> {
        self.codepoints().try_for_each(|c| c.map(&mut f))
    }

    /// Calls `f` with each line ending in the configured line separator.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn each_line(&mut self, mut f: impl FnMut(EncodedBytes)) -> Result<()> {
        self.lines().try_for_each(|line| line.map(&mut f))
    }

    /// Calls `f` with each line ending in `separator`.
    ///
    /// # Errors
    ///
    /// Same as [`read()`][Self::read].
    pub fn each_line_with(&mut self, separator: Option<&[u8]>, mut f: impl FnMut(EncodedBytes)) -> Result<()> {
        self.lines_with(separator).try_for_each(|line| line.map(&mut f))
    }
}
