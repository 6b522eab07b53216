//! Value types for the CMIS object service.
//!
//! This crate provides the immutable value containers exchanged between the
//! object service and a remote content repository. Nothing here talks to the
//! network; types only validate their own shape.
//!
//! # Key Types
//!
//! - [`ObjectId`] / [`ChangeToken`]: opaque repository identifiers
//! - [`ObjectRef`]: the optimistic-concurrency pair threaded through mutations
//! - [`Properties`] / [`PropertyValue`]: typed, multi-valued property sets
//! - [`Acl`] / [`AclDelta`]: access control entries and change sets
//! - [`ContentStream`] / [`Rendition`]: binary content and its alternates
//! - [`AllowableActions`]: the action set a caller may currently perform
//! - [`ObjectData`]: a read-only object snapshot
//! - [`Extension`]: opaque vendor payload, forwarded untouched

pub mod acl;
pub mod actions;
pub mod content;
pub mod error;
pub mod extension;
pub mod filter;
pub mod id;
pub mod kinds;
pub mod object;
pub mod property;

pub use acl::{Ace, Acl, AclDelta};
pub use actions::{Action, AllowableActions};
pub use content::{ContentStream, Rendition};
pub use error::TypeError;
pub use extension::Extension;
pub use filter::{PropertyFilter, RenditionFilter};
pub use id::{ChangeToken, ObjectId, ObjectRef};
pub use kinds::{BaseTypeId, IncludeRelationships, UnfileObject, VersioningState};
pub use object::ObjectData;
pub use property::{property_ids, Properties, PropertyValue};
