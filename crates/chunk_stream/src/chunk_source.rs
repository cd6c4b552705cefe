// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tracing::{Level, event};

use crate::{ChunkResult, Resource, Result};

/// Asks `resource` for its next chunk, waiting out "no data yet" answers.
///
/// Returns `None` once the resource reports the end of its data, either explicitly or with an
/// empty chunk. A returned chunk is never empty.
///
/// While the resource has no data, this blocks the calling thread, sleeping `retry_delay` between
/// attempts. There is no retry limit and no way to cancel the wait.
#[cfg_attr(test, mutants::skip)] // Mutations easily lead to infinite loops, not worth the effort.
pub(crate) fn next_chunk<R>(resource: &mut R, retry_delay: Duration) -> Result<Option<Bytes>>
where
    R: Resource + ?Sized,
{
    let mut attempts: u64 = 0;

    loop {
        attempts = attempts.saturating_add(1);

        match resource.fetch_chunk()? {
            ChunkResult::Data(chunk) if chunk.is_empty() => {
                event!(Level::TRACE, message = "short read", attempts);
                return Ok(None);
            }
            ChunkResult::Data(chunk) => {
                event!(Level::TRACE, message = "fetched chunk", len = chunk.len(), attempts);
                return Ok(Some(chunk));
            }
            ChunkResult::EndOfStream => {
                event!(Level::TRACE, message = "end of stream", attempts);
                return Ok(None);
            }
            ChunkResult::NoDataYet => {
                event!(Level::TRACE, message = "no data yet, waiting", attempts, retry_delay = ?retry_delay);
                thread::sleep(retry_delay);
            }
        }
    }
}
