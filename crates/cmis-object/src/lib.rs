//! The CMIS Object Service.
//!
//! [`ObjectService`] is the client-side core of a CMIS 1.1 Object Service.
//! It turns object-lifecycle calls into [`cmis_transport::Operation`]s, sends
//! them through a caller-supplied [`cmis_transport::Transport`], and hands
//! back typed results.
//!
//! # Concurrency
//!
//! Every mutation takes an [`cmis_types::ObjectRef`] (id plus change token)
//! and returns its successor. Presenting a superseded pair fails with
//! [`ObjectError::UpdateConflict`]; the [`ChangeTokenGuard`] keeps the pair
//! current on the caller's side.
//!
//! # Key Types
//!
//! - [`ObjectService`]: the operations, one transport call each
//! - [`ObjectServiceConfig`] / [`OperationDefaults`]: defaults for optional
//!   parameters, loadable from TOML
//! - [`ContentStreamChannel`]: caller-held state of a chunked upload
//! - [`BulkUpdateReport`] / [`TreeDeletionReport`]: partial-failure results
//! - [`ObjectError`]: the error taxonomy every operation reports in

pub mod bulk;
pub mod channel;
pub mod config;
mod delta;
pub mod error;
pub mod guard;
pub mod options;
pub mod service;
pub mod tree;

pub use bulk::{BulkUpdateEntry, BulkUpdateReport};
pub use channel::{ChannelState, ContentStreamChannel};
pub use config::{ObjectServiceConfig, OperationDefaults};
pub use error::{ObjectError, ObjectResult};
pub use guard::ChangeTokenGuard;
pub use options::{
    BulkUpdateOptions, ContentRange, CreateOptions, DeleteOptions, DeleteTreeOptions,
    DocumentOptions, ReadOptions, RenditionPage, SetContentOptions,
};
pub use service::ObjectService;
pub use tree::TreeDeletionReport;
