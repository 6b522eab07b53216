use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::ObjectId;

/// A binary payload plus its metadata.
///
/// When used as a chunk of a chunked upload, the stream holds just that
/// chunk's bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStream {
    pub filename: Option<String>,
    pub mime_type: String,
    /// Length announced by the producer; `None` when unknown.
    pub declared_length: Option<u64>,
    pub data: Bytes,
}

impl ContentStream {
    pub const DEFAULT_MIME_TYPE: &'static str = "application/octet-stream";

    /// A stream whose declared length is the payload length.
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            filename: None,
            mime_type: mime_type.into(),
            declared_length: Some(data.len() as u64),
            data,
        }
    }

    /// An `application/octet-stream` stream.
    pub fn octets(data: impl Into<Bytes>) -> Self {
        Self::new(Self::DEFAULT_MIME_TYPE, data)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Clear the declared length (producer does not know it up front).
    pub fn without_declared_length(mut self) -> Self {
        self.declared_length = None;
        self
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check that the declared length, if any, matches the payload.
    pub fn validate(&self) -> Result<(), TypeError> {
        match self.declared_length {
            Some(declared) if declared != self.len() => Err(TypeError::LengthMismatch {
                declared,
                actual: self.len(),
            }),
            _ => Ok(()),
        }
    }

    /// A partial copy starting at `offset` (default: start) spanning at most
    /// `length` bytes (default: to end). Ranges past the end are clamped.
    pub fn slice(&self, offset: Option<u64>, length: Option<u64>) -> ContentStream {
        let total = self.data.len();
        let start = offset.map_or(0, |o| usize::try_from(o).unwrap_or(usize::MAX).min(total));
        let end = match length {
            Some(len) => start.saturating_add(usize::try_from(len).unwrap_or(usize::MAX)).min(total),
            None => total,
        };
        let data = self.data.slice(start..end);
        ContentStream {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            declared_length: Some(data.len() as u64),
            data,
        }
    }
}

/// A read-only alternate representation of an object's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub stream_id: String,
    /// Rendition kind, e.g. `cmis:thumbnail`.
    pub kind: String,
    pub mime_type: String,
    pub length: Option<u64>,
    pub title: Option<String>,
    pub height: Option<u64>,
    pub width: Option<u64>,
    /// Set when the rendition is itself stored as a document.
    pub rendition_document_id: Option<ObjectId>,
}

impl Rendition {
    pub fn new(
        stream_id: impl Into<String>,
        kind: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            kind: kind.into(),
            mime_type: mime_type.into(),
            length: None,
            title: None,
            height: None,
            width: None,
            rendition_document_id: None,
        }
    }

    pub fn with_dimensions(mut self, width: u64, height: u64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }
}
