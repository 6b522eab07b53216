use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque vendor-extension payload.
///
/// The object service never interprets an extension; it forwards the bytes
/// unchanged on requests and surfaces them unchanged from responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extension(Bytes);

impl Extension {
    /// The empty extension.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self(payload.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_preserved() {
        let raw = vec![0u8, 159, 146, 150, 255];
        let ext = Extension::new(raw.clone());
        assert_eq!(ext.as_bytes(), raw.as_slice());
        assert!(Extension::none().is_empty());
    }
}
