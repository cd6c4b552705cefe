// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Buffered byte, character and line streams over resources that only produce or accept chunks.
//!
//! Many data sources cannot read an exact number of bytes. A socket, a pipe or a decoder hands out
//! whatever it has. A [`Resource`] describes such a source with a few primitive hooks: fetch the
//! next chunk, write a chunk, seek, open and close. [`BufferedStream`] turns that into a complete
//! stream with exact-length reads, line and character reads, push-back, iteration, positioning
//! and encoding tags.
//!
//! Whatever part of a chunk a read does not need is kept and returned first by the next read, so
//! reads are byte-exact no matter how the resource sizes its chunks. A resource that has no data
//! yet makes the stream wait and retry.
//!
//! # Example
//!
//! ```
//! use chunk_stream::BufferedStream;
//! # use bytes::Bytes;
//! # use chunk_stream::{ChunkResult, Resource};
//! # struct Chunks(Vec<&'static [u8]>);
//! # impl Resource for Chunks {
//! #     fn fetch_chunk(&mut self) -> chunk_stream::Result<ChunkResult> {
//! #         Ok(match self.0.is_empty() {
//! #             true => ChunkResult::EndOfStream,
//! #             false => ChunkResult::Data(Bytes::from_static(self.0.remove(0))),
//! #         })
//! #     }
//! # }
//!
//! let mut stream = BufferedStream::new(Chunks(vec![&b"one\n"[..], b"two\nthree\n", b"four\n"]))?;
//!
//! assert_eq!(stream.gets()?, "one\n");
//! assert_eq!(stream.read(Some(6))?.unwrap(), "two\nth");
//!
//! stream.unget_bytes("TH");
//! assert_eq!(stream.read_lines()?, ["THree\n", "four\n"]);
//! # Ok::<(), chunk_stream::Error>(())
//! ```
//!
//! The `test-util` feature enables a scripted [`Resource`] for testing code that uses streams.
//! It is in the `testing` module.

mod bom;
mod chunk_source;
mod encoded;
mod encoding;
mod error;
pub mod iter;
mod options;
mod pushback;
mod resource;
mod std_io;
mod stream;
mod write;

pub use encoded::EncodedBytes;
pub use encoding::Encoding;
pub use error::{Error, Result};
pub use options::{DEFAULT_LINE_SEPARATOR, DEFAULT_RETRY_DELAY, StreamOptions, StreamOptionsBuilder};
pub use resource::{ChunkResult, Resource, Whence};
pub use stream::{Advice, BufferedStream};

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
