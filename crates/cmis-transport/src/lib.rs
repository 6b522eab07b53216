//! Transport contract for the CMIS object service.
//!
//! The object service never speaks a wire protocol itself. It hands each
//! operation to a [`Transport`] and decodes the [`RawResult`] it gets back.
//! Bindings (AtomPub, Browser/JSON, Web Services) implement [`Transport`];
//! this crate only fixes the vocabulary they exchange.
//!
//! # Modules
//!
//! - [`error`]: [`TransportError`] and repository [`FaultKind`]s
//! - [`operation`]: [`Request`] and the [`Operation`] vocabulary
//! - [`result`]: [`Response`], [`RawResult`], [`MutationAck`], [`TreeNode`]
//! - [`traits`]: the [`Transport`] and [`RepositoryMetadata`] collaborators
//! - [`memory`]: [`InMemoryRepository`], a complete in-process repository
//!   for tests and embedding

pub mod error;
pub mod memory;
pub mod operation;
pub mod result;
pub mod traits;

pub use error::{FaultKind, TransportError, TransportResult};
pub use memory::InMemoryRepository;
pub use operation::{ObjectReadRequest, Operation, Request};
pub use result::{MutationAck, RawResult, Response, TreeNode};
pub use traits::{ContentStreamAllowed, RepositoryMetadata, Transport, TypeSummary};
