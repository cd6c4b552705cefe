// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

use crate::Encoding;

/// Any error surfaced by a [`BufferedStream`][crate::BufferedStream] or by the hooks of the
/// [`Resource`][crate::Resource] it adapts.
///
/// The transient "no data yet" condition reported by a resource is handled inside the stream by
/// waiting and retrying. It is never surfaced as an error.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A read operation was attempted after the read direction of the stream was closed.
    #[error("closed for reading")]
    ClosedForReading,

    /// A write operation was attempted after the write direction of the stream was closed.
    #[error("closed for writing")]
    ClosedForWriting,

    /// The line number was accessed on a stream that is not open for reading.
    #[error("not opened for reading")]
    NotOpenedForReading,

    /// A read that must produce data found the stream at its end.
    #[error("end of file reached")]
    EndOfStream,

    /// The adapted resource does not implement the requested operation.
    #[error("{operation} is not supported by this resource")]
    NotSupported {
        /// Name of the operation that was attempted.
        operation: &'static str,
    },

    /// An argument did not have the expected shape, e.g. an unknown encoding name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Data could not be decoded as a character of the stream's external encoding.
    #[error("invalid byte sequence in {encoding}")]
    InvalidByteSequence {
        /// The encoding the data was decoded as.
        encoding: Encoding,
    },

    /// We are forwarding an error received from the standard library's I/O APIs.
    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    /// We are forwarding an error of unknown type from a resource hook.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) const fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    /// Whether this error signals that the stream has no more data.
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// A specialized `Result` for stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a stream error as a standard I/O error, for use through the `std::io` traits.
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::StdIo(error) => error,
            Error::EndOfStream => Self::new(std::io::ErrorKind::UnexpectedEof, value),
            Error::NotSupported { .. } => Self::new(std::io::ErrorKind::Unsupported, value),
            Error::InvalidArgument(_) => Self::new(std::io::ErrorKind::InvalidInput, value),
            Error::InvalidByteSequence { .. } => Self::new(std::io::ErrorKind::InvalidData, value),
            _ => Self::other(value),
        }
    }
}
