use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failure reported by the repository itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    InvalidArgument,
    ObjectNotFound,
    FolderNotFound,
    ConstraintViolation,
    UpdateConflict,
    PermissionDenied,
    NotSupported,
    Storage,
    Runtime,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalidArgument",
            Self::ObjectNotFound => "objectNotFound",
            Self::FolderNotFound => "folderNotFound",
            Self::ConstraintViolation => "constraint",
            Self::UpdateConflict => "updateConflict",
            Self::PermissionDenied => "permissionDenied",
            Self::NotSupported => "notSupported",
            Self::Storage => "storage",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by a [`Transport`](crate::Transport).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The repository processed the request and refused it.
    #[error("repository fault ({kind}): {message}")]
    Fault { kind: FaultKind, message: String },

    /// The call could not be completed (network, timeout, closed channel).
    #[error("connectivity failure: {0}")]
    Connectivity(String),
}

impl TransportError {
    pub fn fault(kind: FaultKind, message: impl Into<String>) -> Self {
        Self::Fault {
            kind,
            message: message.into(),
        }
    }

    /// The fault kind, if this is a repository fault.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Fault { kind, .. } => Some(*kind),
            Self::Connectivity(_) => None,
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display_includes_kind() {
        let err = TransportError::fault(FaultKind::UpdateConflict, "stale token");
        assert_eq!(err.to_string(), "repository fault (updateConflict): stale token");
        assert_eq!(err.fault_kind(), Some(FaultKind::UpdateConflict));
    }

    #[test]
    fn connectivity_has_no_fault_kind() {
        let err = TransportError::Connectivity("timed out".into());
        assert!(err.fault_kind().is_none());
    }
}
