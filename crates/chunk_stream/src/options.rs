// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bytes::Bytes;

use crate::Encoding;

/// The line separator used when none is given explicitly.
pub const DEFAULT_LINE_SEPARATOR: &[u8] = b"\n";

/// How long a stream waits before asking a resource again after it reported that no data is
/// available yet.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Configuration of a [`BufferedStream`][crate::BufferedStream].
///
/// Create an instance via [`StreamOptions::builder()`] or use [`StreamOptions::default()`].
#[derive(Clone, Debug)]
pub struct StreamOptions {
    pub(crate) line_separator: Bytes,
    pub(crate) retry_delay: Duration,
    pub(crate) external_encoding: Encoding,
    pub(crate) internal_encoding: Option<Encoding>,
    pub(crate) tty: bool,
    pub(crate) pid: Option<u32>,
    pub(crate) sync: bool,
    pub(crate) autoclose: bool,
    pub(crate) close_on_exec: bool,
}

impl StreamOptions {
    /// Starts building a new `StreamOptions`.
    #[must_use]
    pub fn builder() -> StreamOptionsBuilder {
        StreamOptionsBuilder { options: Self::default() }
    }

    /// The separator used by line reads that do not name one.
    #[must_use]
    pub fn line_separator(&self) -> &[u8] {
        &self.line_separator
    }

    /// The delay between attempts to fetch data from a resource that has none yet.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// The external encoding a stream starts with.
    #[must_use]
    pub const fn external_encoding(&self) -> Encoding {
        self.external_encoding
    }

    /// The internal encoding a stream starts with.
    #[must_use]
    pub const fn internal_encoding(&self) -> Option<Encoding> {
        self.internal_encoding
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            line_separator: Bytes::from_static(DEFAULT_LINE_SEPARATOR),
            retry_delay: DEFAULT_RETRY_DELAY,
            external_encoding: Encoding::default(),
            internal_encoding: None,
            tty: false,
            pid: None,
            sync: false,
            autoclose: true,
            close_on_exec: true,
        }
    }
}

/// Creates an instance of [`StreamOptions`].
///
/// Access through [`StreamOptions::builder()`].
#[derive(Debug)]
pub struct StreamOptionsBuilder {
    options: StreamOptions,
}

impl StreamOptionsBuilder {
    /// The separator used by line reads that do not name one.
    ///
    /// Optional. Defaults to [`DEFAULT_LINE_SEPARATOR`].
    #[must_use]
    pub fn line_separator(mut self, separator: impl Into<Bytes>) -> Self {
        self.options.line_separator = separator.into();
        self
    }

    /// The delay between attempts to fetch data from a resource that has none yet.
    ///
    /// Optional. Defaults to [`DEFAULT_RETRY_DELAY`].
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.options.retry_delay = delay;
        self
    }

    /// The encoding all data read from the stream is tagged with.
    ///
    /// Optional. Defaults to UTF-8.
    #[must_use]
    pub fn external_encoding(mut self, encoding: Encoding) -> Self {
        self.options.external_encoding = encoding;
        self
    }

    /// The encoding data written to the stream is tagged with before it reaches the resource.
    ///
    /// Optional. Defaults to none, in which case written data carries the external encoding.
    #[must_use]
    pub fn internal_encoding(mut self, encoding: Encoding) -> Self {
        self.options.internal_encoding = Some(encoding);
        self
    }

    /// Whether the stream reports itself as attached to a terminal.
    ///
    /// Optional. Defaults to `false`.
    #[must_use]
    pub fn tty(mut self, tty: bool) -> Self {
        self.options.tty = tty;
        self
    }

    /// The process associated with the stream.
    ///
    /// Optional. Defaults to none.
    #[must_use]
    pub fn pid(mut self, pid: u32) -> Self {
        self.options.pid = Some(pid);
        self
    }

    /// The initial sync flag.
    ///
    /// Optional. Defaults to `false`.
    #[must_use]
    pub fn sync(mut self, sync: bool) -> Self {
        self.options.sync = sync;
        self
    }

    /// Whether dropping the stream closes it.
    ///
    /// Optional. Defaults to `true`.
    #[must_use]
    pub fn autoclose(mut self, autoclose: bool) -> Self {
        self.options.autoclose = autoclose;
        self
    }

    /// The initial close-on-exec flag.
    ///
    /// Optional. Defaults to `true`.
    #[must_use]
    pub fn close_on_exec(mut self, close_on_exec: bool) -> Self {
        self.options.close_on_exec = close_on_exec;
        self
    }

    /// Builds the `StreamOptions` with the provided configuration.
    #[must_use]
    pub fn build(self) -> StreamOptions {
        self.options
    }
}
