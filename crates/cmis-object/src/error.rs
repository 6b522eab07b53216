use thiserror::Error;

use cmis_transport::{FaultKind, TransportError};
use cmis_types::{ObjectId, TypeError};

/// Failures surfaced by the object service.
///
/// Partial failures of batch operations are not errors; they are reported
/// through [`crate::BulkUpdateReport`] and [`crate::TreeDeletionReport`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("update conflict: {0}")]
    UpdateConflict(String),

    /// An append was attempted after the final chunk. Raised locally.
    #[error("content stream of {object_id} is closed")]
    StreamClosed { object_id: ObjectId },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("connectivity failure: {0}")]
    Connectivity(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("unexpected {received} response to {operation}")]
    UnexpectedResponse {
        operation: &'static str,
        received: &'static str,
    },

    #[error("invalid value: {0}")]
    Type(#[from] TypeError),
}

impl ObjectError {
    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) | Self::Type(_) => "invalidArgument",
            Self::ObjectNotFound(_) => "objectNotFound",
            Self::FolderNotFound(_) => "folderNotFound",
            Self::ConstraintViolation(_) => "constraint",
            Self::UpdateConflict(_) => "updateConflict",
            Self::StreamClosed { .. } => "streamClosed",
            Self::PermissionDenied(_) => "permissionDenied",
            Self::NotSupported(_) => "notSupported",
            Self::Connectivity(_) => "connectivity",
            Self::Repository(_) => "runtime",
            Self::UnexpectedResponse { .. } => "unexpectedResponse",
        }
    }
}

impl From<TransportError> for ObjectError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connectivity(message) => Self::Connectivity(message),
            TransportError::Fault { kind, message } => match kind {
                FaultKind::InvalidArgument => Self::InvalidArgument(message),
                FaultKind::ObjectNotFound => Self::ObjectNotFound(message),
                FaultKind::FolderNotFound => Self::FolderNotFound(message),
                FaultKind::ConstraintViolation => Self::ConstraintViolation(message),
                FaultKind::UpdateConflict => Self::UpdateConflict(message),
                FaultKind::PermissionDenied => Self::PermissionDenied(message),
                FaultKind::NotSupported => Self::NotSupported(message),
                FaultKind::Storage | FaultKind::Runtime => {
                    Self::Repository(format!("{kind}: {message}"))
                }
            },
        }
    }
}

pub type ObjectResult<T> = Result<T, ObjectError>;
