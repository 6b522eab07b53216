use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cmis_types::BaseTypeId;

use crate::error::TransportResult;
use crate::operation::Request;
use crate::result::Response;

/// Dispatches object-service operations to a repository.
///
/// Calls are synchronous: `invoke` blocks until the repository answers or
/// the call fails. Implementations own timeouts and any retry policy; the
/// object service never retries.
pub trait Transport: Send + Sync {
    fn invoke(&self, request: Request) -> TransportResult<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn invoke(&self, request: Request) -> TransportResult<Response> {
        (**self).invoke(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn invoke(&self, request: Request) -> TransportResult<Response> {
        (**self).invoke(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn invoke(&self, request: Request) -> TransportResult<Response> {
        (**self).invoke(request)
    }
}

/// Whether documents of a type may, must, or must not carry content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStreamAllowed {
    NotAllowed,
    #[default]
    Allowed,
    Required,
}

/// The slice of a type definition the object service consults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub type_id: String,
    pub base_type: BaseTypeId,
    pub creatable: bool,
    pub fileable: bool,
    pub versionable: bool,
    pub content_stream_allowed: ContentStreamAllowed,
}

impl TypeSummary {
    /// A creatable type with the defaults of its base type.
    pub fn new(type_id: impl Into<String>, base_type: BaseTypeId) -> Self {
        Self {
            type_id: type_id.into(),
            base_type,
            creatable: base_type != BaseTypeId::Secondary,
            fileable: base_type.is_fileable(),
            versionable: base_type == BaseTypeId::Document,
            content_stream_allowed: if base_type == BaseTypeId::Document {
                ContentStreamAllowed::Allowed
            } else {
                ContentStreamAllowed::NotAllowed
            },
        }
    }

    pub fn not_creatable(mut self) -> Self {
        self.creatable = false;
        self
    }

    pub fn with_content(mut self, allowed: ContentStreamAllowed) -> Self {
        self.content_stream_allowed = allowed;
        self
    }

    pub fn with_versionable(mut self, versionable: bool) -> Self {
        self.versionable = versionable;
        self
    }
}

/// Read access to the repository's type constraints.
pub trait RepositoryMetadata: Send + Sync {
    /// Look up a type by id. `None` if the repository does not know it.
    fn type_summary(&self, type_id: &str) -> Option<TypeSummary>;
}

impl<M: RepositoryMetadata + ?Sized> RepositoryMetadata for Arc<M> {
    fn type_summary(&self, type_id: &str) -> Option<TypeSummary> {
        (**self).type_summary(type_id)
    }
}
