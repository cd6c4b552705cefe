// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;

use crate::{BufferedStream, Error, Resource, Whence};

impl<R: Resource> io::Read for BufferedStream<R> {
    /// Reads from the push-back buffer or, if it is empty, from at most one new chunk.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let available = io::BufRead::fill_buf(self)?;
        let len = available.len().min(buf.len());

        buf[..len].copy_from_slice(&available[..len]);
        io::BufRead::consume(self, len);

        Ok(len)
    }
}

impl<R: Resource> io::BufRead for BufferedStream<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.fill_pushback()?;
        Ok(self.pushback.peek())
    }

    fn consume(&mut self, amount: usize) {
        self.consume_pushback(amount);
    }
}

impl<R: Resource> io::Write for BufferedStream<R> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_data(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Resource> io::Seek for BufferedStream<R> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset)
                    .map_err(|_ignored| Error::InvalidArgument(format!("seek offset {offset} is too large")))?;
                (offset, Whence::Set)
            }
            io::SeekFrom::Current(offset) => (offset, Whence::Current),
            io::SeekFrom::End(offset) => (offset, Whence::End),
        };

        Ok(Self::seek(self, offset, whence)?)
    }
}
