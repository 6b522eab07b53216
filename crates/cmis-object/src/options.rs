//! Per-operation option values.
//!
//! Every optional parameter is an explicit field. `None` means "use the
//! configured default"; defaults are resolved by the service against
//! [`OperationDefaults`], never implied at the call site.

use cmis_transport::ObjectReadRequest;
use cmis_types::{
    AclDelta, ContentStream, Extension, IncludeRelationships, ObjectId, PropertyFilter,
    RenditionFilter, UnfileObject, VersioningState,
};

use crate::config::OperationDefaults;

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Options shared by every create operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateOptions {
    /// Policies to apply to the new object.
    pub policies: Vec<ObjectId>,
    /// ACEs to add and remove relative to the inherited ACL.
    pub acl: AclDelta,
    pub extension: Extension,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy_id: ObjectId) -> Self {
        self.policies.push(policy_id);
        self
    }

    pub fn with_acl(mut self, acl: AclDelta) -> Self {
        self.acl = acl;
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }
}

/// Options for `createDocument` and `createDocumentFromSource`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentOptions {
    /// Initial content. Not accepted when copying from a source document.
    pub content_stream: Option<ContentStream>,
    pub versioning_state: Option<VersioningState>,
    pub create: CreateOptions,
}

impl DocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: ContentStream) -> Self {
        self.content_stream = Some(content);
        self
    }

    pub fn with_versioning_state(mut self, state: VersioningState) -> Self {
        self.versioning_state = Some(state);
        self
    }

    pub fn with_create(mut self, create: CreateOptions) -> Self {
        self.create = create;
        self
    }

    pub(crate) fn resolve_versioning(&self, defaults: &OperationDefaults) -> VersioningState {
        self.versioning_state.unwrap_or(defaults.versioning_state)
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Options for `getObject` and `getObjectByPath`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadOptions {
    pub filter: Option<PropertyFilter>,
    pub include_allowable_actions: Option<bool>,
    pub include_relationships: Option<IncludeRelationships>,
    pub rendition_filter: Option<RenditionFilter>,
    pub include_policy_ids: Option<bool>,
    pub include_acl: Option<bool>,
    pub extension: Extension,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_allowable_actions(mut self, include: bool) -> Self {
        self.include_allowable_actions = Some(include);
        self
    }

    pub fn with_relationships(mut self, include: IncludeRelationships) -> Self {
        self.include_relationships = Some(include);
        self
    }

    pub fn with_renditions(mut self, filter: RenditionFilter) -> Self {
        self.rendition_filter = Some(filter);
        self
    }

    pub fn with_policy_ids(mut self, include: bool) -> Self {
        self.include_policy_ids = Some(include);
        self
    }

    pub fn with_acl(mut self, include: bool) -> Self {
        self.include_acl = Some(include);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }

    /// Fill every unset field from `defaults`.
    pub fn resolve(&self, defaults: &OperationDefaults) -> ObjectReadRequest {
        ObjectReadRequest {
            filter: self.filter.clone().or_else(|| defaults.property_filter.clone()),
            include_allowable_actions: self
                .include_allowable_actions
                .unwrap_or(defaults.include_allowable_actions),
            include_relationships: self
                .include_relationships
                .unwrap_or(defaults.include_relationships),
            rendition_filter: self
                .rendition_filter
                .clone()
                .unwrap_or_else(|| defaults.rendition_filter.clone()),
            include_policy_ids: self.include_policy_ids.unwrap_or(defaults.include_policy_ids),
            include_acl: self.include_acl.unwrap_or(defaults.include_acl),
        }
    }
}

/// Which part of a stream `getContentStream` returns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentRange {
    /// A rendition stream id; `None` selects the primary content.
    pub stream_id: Option<String>,
    /// Absent means "from the start".
    pub offset: Option<u64>,
    /// Absent means "to the end".
    pub length: Option<u64>,
}

impl ContentRange {
    /// The whole primary content stream.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn with_stream(mut self, stream_id: impl Into<String>) -> Self {
        self.stream_id = Some(stream_id.into());
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }
}

/// Filter and paging for `getRenditions`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenditionPage {
    pub filter: Option<RenditionFilter>,
    pub max_items: Option<u64>,
    pub skip_count: Option<u64>,
}

impl RenditionPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: RenditionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_skip_count(mut self, skip_count: u64) -> Self {
        self.skip_count = Some(skip_count);
        self
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Options for `setContentStream`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetContentOptions {
    pub overwrite: Option<bool>,
    pub extension: Extension,
}

impl SetContentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }
}

/// Options for `bulkUpdateProperties`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkUpdateOptions {
    pub add_secondary_type_ids: Vec<String>,
    pub remove_secondary_type_ids: Vec<String>,
    pub extension: Extension,
}

impl BulkUpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adding_secondary_type(mut self, type_id: impl Into<String>) -> Self {
        self.add_secondary_type_ids.push(type_id.into());
        self
    }

    pub fn removing_secondary_type(mut self, type_id: impl Into<String>) -> Self {
        self.remove_secondary_type_ids.push(type_id.into());
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }
}

/// Options for `deleteObject`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub all_versions: Option<bool>,
    pub extension: Extension,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all_versions(mut self, all_versions: bool) -> Self {
        self.all_versions = Some(all_versions);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }
}

/// Options for `deleteTree`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteTreeOptions {
    pub all_versions: Option<bool>,
    pub unfile_objects: Option<UnfileObject>,
    pub continue_on_failure: Option<bool>,
    pub extension: Extension,
}

impl DeleteTreeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all_versions(mut self, all_versions: bool) -> Self {
        self.all_versions = Some(all_versions);
        self
    }

    pub fn with_unfile_objects(mut self, unfile: UnfileObject) -> Self {
        self.unfile_objects = Some(unfile);
        self
    }

    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = Some(continue_on_failure);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_read_options_take_defaults() {
        let read = ReadOptions::new().resolve(&OperationDefaults::default());
        assert_eq!(read, ObjectReadRequest::default());
    }

    #[test]
    fn explicit_read_options_win() {
        let defaults = OperationDefaults {
            include_acl: true,
            rendition_filter: RenditionFilter::All,
            ..Default::default()
        };
        let read = ReadOptions::new()
            .with_acl(false)
            .with_relationships(IncludeRelationships::Both)
            .resolve(&defaults);
        assert!(!read.include_acl);
        assert_eq!(read.include_relationships, IncludeRelationships::Both);
        assert_eq!(read.rendition_filter, RenditionFilter::All);
    }

    #[test]
    fn configured_property_filter_applies() {
        let defaults = OperationDefaults {
            property_filter: Some(PropertyFilter::parse("cmis:name").unwrap()),
            ..Default::default()
        };
        let read = ReadOptions::new().resolve(&defaults);
        assert_eq!(read.filter, defaults.property_filter);

        let read = ReadOptions::new()
            .with_filter(PropertyFilter::All)
            .resolve(&defaults);
        assert_eq!(read.filter, Some(PropertyFilter::All));
    }

    #[test]
    fn versioning_state_default() {
        let defaults = OperationDefaults::default();
        assert_eq!(
            DocumentOptions::new().resolve_versioning(&defaults),
            VersioningState::Major
        );
        assert_eq!(
            DocumentOptions::new()
                .with_versioning_state(VersioningState::Minor)
                .resolve_versioning(&defaults),
            VersioningState::Minor
        );
    }
}
