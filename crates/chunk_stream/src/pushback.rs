// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Bytes that were taken from the stream but not yet delivered to the caller.
///
/// Holds explicitly pushed-back data at the front and leftovers of split chunks at the back.
/// This type does not know about stream positions; the stream adjusts its position when it
/// pushes data back, never when it stores leftovers.
#[derive(Debug, Default)]
pub(crate) struct PushbackBuffer {
    data: BytesMut,
}

impl PushbackBuffer {
    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    /// Places `bytes` in front of everything buffered, so they are the next bytes read.
    pub(crate) fn prepend(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let mut data = BytesMut::with_capacity(bytes.len() + self.data.len());
        data.put_slice(bytes);
        data.put(self.data.split());
        self.data = data;
    }

    /// Places `bytes` behind everything buffered.
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Removes and returns at most `limit` bytes from the front.
    pub(crate) fn take_up_to(&mut self, limit: usize) -> Bytes {
        let len = limit.min(self.data.len());
        self.data.split_to(len).freeze()
    }

    /// The buffered bytes, without removing them.
    pub(crate) fn peek(&self) -> &[u8] {
        &self.data
    }

    /// Drops the first `amount` buffered bytes.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `amount` bytes are buffered.
    pub(crate) fn advance(&mut self, amount: usize) {
        self.data.advance(amount);
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
    }
}
