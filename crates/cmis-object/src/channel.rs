use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use cmis_types::ObjectRef;

use crate::error::{ObjectError, ObjectResult};

/// Lifecycle of a chunked upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    /// No chunk sent yet.
    Open,
    /// At least one non-final chunk sent.
    Appending,
    /// The final chunk was sent. No further appends are accepted.
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Appending => "appending",
            Self::Closed => "closed",
        })
    }
}

/// A caller-held, in-progress content upload for one document.
///
/// The channel tracks the concurrency pair between appends and refuses any
/// append after the final chunk without contacting the repository. It does
/// not serialize concurrent writers; a single writer per document is the
/// caller's responsibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentStreamChannel {
    object: ObjectRef,
    state: ChannelState,
    chunks: u64,
    bytes: u64,
}

impl ContentStreamChannel {
    /// Open a channel for `object`.
    pub fn new(object: ObjectRef) -> Self {
        Self {
            object,
            state: ChannelState::Open,
            chunks: 0,
            bytes: 0,
        }
    }

    /// The pair to present with the next append.
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ChannelState::Closed
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes
    }

    /// Consume the channel, returning the latest concurrency pair.
    pub fn into_object(self) -> ObjectRef {
        self.object
    }

    /// Fails with `StreamClosed` once the final chunk has been sent.
    pub(crate) fn ensure_open(&self) -> ObjectResult<()> {
        if self.is_closed() {
            return Err(ObjectError::StreamClosed {
                object_id: self.object.id.clone(),
            });
        }
        Ok(())
    }

    /// Record an accepted chunk.
    pub(crate) fn record(&mut self, successor: ObjectRef, chunk_len: u64, is_last_chunk: bool) {
        self.object = successor;
        self.chunks += 1;
        self.bytes += chunk_len;
        self.state = if is_last_chunk {
            ChannelState::Closed
        } else {
            ChannelState::Appending
        };
        trace!(
            object = %self.object.id,
            chunk = self.chunks,
            bytes = self.bytes,
            state = %self.state,
            "content chunk recorded"
        );
    }
}
