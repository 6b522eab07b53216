use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use cmis_transport::{
    ContentStreamAllowed, MutationAck, Operation, RawResult, RepositoryMetadata, Request,
    Response, Transport, TreeNode, TypeSummary,
};
use cmis_types::{
    property_ids, AllowableActions, BaseTypeId, ChangeToken, ContentStream, Extension, ObjectData,
    ObjectId, ObjectRef, Properties, PropertyFilter, Rendition, VersioningState,
};

use crate::bulk::{run_bulk_update, BulkUpdateEntry, BulkUpdateReport};
use crate::channel::ContentStreamChannel;
use crate::config::ObjectServiceConfig;
use crate::delta::{check_secondary_types, dedup_policies};
use crate::error::{ObjectError, ObjectResult};
use crate::guard::ChangeTokenGuard;
use crate::options::{
    BulkUpdateOptions, ContentRange, CreateOptions, DeleteOptions, DeleteTreeOptions,
    DocumentOptions, ReadOptions, RenditionPage, SetContentOptions,
};
use crate::tree::{self, TreeDeletionReport, TreePlan};

// ---------------------------------------------------------------------------
// ObjectService
// ---------------------------------------------------------------------------

/// The CMIS Object Service.
///
/// Every operation resolves its optional parameters against the configured
/// [`crate::OperationDefaults`], applies local preconditions, and makes at
/// most one [`Transport`] call (batch operations make one per member). Calls
/// are never retried and nothing is cached.
///
/// Mutations take an [`ObjectRef`] and return its successor; callers must
/// use the returned pair for their next call on that object.
pub struct ObjectService<T> {
    transport: T,
    metadata: Option<Arc<dyn RepositoryMetadata>>,
    config: ObjectServiceConfig,
    guard: ChangeTokenGuard,
}

impl<T> fmt::Debug for ObjectService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectService")
            .field("repository_id", &self.config.repository_id)
            .field("metadata", &self.metadata.is_some())
            .field("guard", &self.guard)
            .finish()
    }
}

impl<T: Transport> ObjectService<T> {
    /// Create a service over `transport`. Fails if the configuration is
    /// invalid.
    pub fn new(transport: T, config: ObjectServiceConfig) -> ObjectResult<Self> {
        config.validate()?;
        Ok(Self {
            guard: ChangeTokenGuard::new(config.require_change_tokens),
            transport,
            metadata: None,
            config,
        })
    }

    /// Consult `metadata` for type constraints before create calls.
    pub fn with_metadata(mut self, metadata: Arc<dyn RepositoryMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn config(&self) -> &ObjectServiceConfig {
        &self.config
    }

    pub fn repository_id(&self) -> &str {
        &self.config.repository_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ---- Create operations ----

    pub fn create_document(
        &self,
        properties: Properties,
        folder_id: Option<&ObjectId>,
        options: DocumentOptions,
    ) -> ObjectResult<ObjectId> {
        let versioning_state = options.resolve_versioning(&self.config.defaults);
        if let Some(content) = &options.content_stream {
            content.validate()?;
        }
        self.check_create(CreateCheck {
            operation: "createDocument",
            base: BaseTypeId::Document,
            properties: &properties,
            folder_id,
            has_content: Some(options.content_stream.is_some()),
            versioning_state: Some(versioning_state),
        })?;

        let DocumentOptions {
            content_stream,
            create,
            ..
        } = options;
        let id = self.call(
            Operation::CreateDocument {
                properties,
                folder_id: folder_id.cloned(),
                content_stream,
                versioning_state,
                policies: dedup_policies(create.policies),
                acl: create.acl.normalized(),
            },
            create.extension,
            expect_object_id,
        )?;
        info!(object = %id, %versioning_state, "document created");
        Ok(id)
    }

    /// Create a document as a copy of `source_id`. `properties` override the
    /// copied ones.
    pub fn create_document_from_source(
        &self,
        source_id: &ObjectId,
        properties: Properties,
        folder_id: Option<&ObjectId>,
        options: DocumentOptions,
    ) -> ObjectResult<ObjectId> {
        if options.content_stream.is_some() {
            return Err(ObjectError::InvalidArgument(
                "createDocumentFromSource copies the source content; no content stream may be supplied"
                    .into(),
            ));
        }
        let versioning_state = options.resolve_versioning(&self.config.defaults);
        self.check_create(CreateCheck {
            operation: "createDocumentFromSource",
            base: BaseTypeId::Document,
            properties: &properties,
            folder_id,
            has_content: None,
            versioning_state: Some(versioning_state),
        })?;

        let create = options.create;
        let id = self.call(
            Operation::CreateDocumentFromSource {
                source_id: source_id.clone(),
                properties,
                folder_id: folder_id.cloned(),
                versioning_state,
                policies: dedup_policies(create.policies),
                acl: create.acl.normalized(),
            },
            create.extension,
            expect_object_id,
        )?;
        info!(object = %id, source = %source_id, "document copied");
        Ok(id)
    }

    pub fn create_folder(
        &self,
        properties: Properties,
        folder_id: &ObjectId,
        options: CreateOptions,
    ) -> ObjectResult<ObjectId> {
        self.check_create(CreateCheck::plain(
            "createFolder",
            BaseTypeId::Folder,
            &properties,
            Some(folder_id),
        ))?;
        let id = self.call(
            Operation::CreateFolder {
                properties,
                folder_id: folder_id.clone(),
                policies: dedup_policies(options.policies),
                acl: options.acl.normalized(),
            },
            options.extension,
            expect_object_id,
        )?;
        info!(object = %id, parent = %folder_id, "folder created");
        Ok(id)
    }

    pub fn create_item(
        &self,
        properties: Properties,
        folder_id: Option<&ObjectId>,
        options: CreateOptions,
    ) -> ObjectResult<ObjectId> {
        self.check_create(CreateCheck::plain(
            "createItem",
            BaseTypeId::Item,
            &properties,
            folder_id,
        ))?;
        let id = self.call(
            Operation::CreateItem {
                properties,
                folder_id: folder_id.cloned(),
                policies: dedup_policies(options.policies),
                acl: options.acl.normalized(),
            },
            options.extension,
            expect_object_id,
        )?;
        info!(object = %id, "item created");
        Ok(id)
    }

    pub fn create_policy(
        &self,
        properties: Properties,
        folder_id: Option<&ObjectId>,
        options: CreateOptions,
    ) -> ObjectResult<ObjectId> {
        self.check_create(CreateCheck::plain(
            "createPolicy",
            BaseTypeId::Policy,
            &properties,
            folder_id,
        ))?;
        let id = self.call(
            Operation::CreatePolicy {
                properties,
                folder_id: folder_id.cloned(),
                policies: dedup_policies(options.policies),
                acl: options.acl.normalized(),
            },
            options.extension,
            expect_object_id,
        )?;
        info!(object = %id, "policy created");
        Ok(id)
    }

    /// Create an unfiled relationship. `properties` must name
    /// `cmis:sourceId` and `cmis:targetId`.
    pub fn create_relationship(
        &self,
        properties: Properties,
        options: CreateOptions,
    ) -> ObjectResult<ObjectId> {
        self.check_create(CreateCheck::plain(
            "createRelationship",
            BaseTypeId::Relationship,
            &properties,
            None,
        ))?;
        let id = self.call(
            Operation::CreateRelationship {
                properties,
                policies: dedup_policies(options.policies),
                acl: options.acl.normalized(),
            },
            options.extension,
            expect_object_id,
        )?;
        info!(object = %id, "relationship created");
        Ok(id)
    }

    // ---- Read operations ----

    /// Snapshot of one object. The response extension is surfaced on
    /// [`ObjectData::extension`].
    pub fn get_object(&self, object_id: &ObjectId, options: &ReadOptions) -> ObjectResult<ObjectData> {
        let read = options.resolve(&self.config.defaults);
        self.call(
            Operation::GetObject {
                object_id: object_id.clone(),
                read,
            },
            options.extension.clone(),
            expect_object,
        )
    }

    /// Snapshot of the object at an absolute path such as `/F1/a.txt`.
    pub fn get_object_by_path(&self, path: &str, options: &ReadOptions) -> ObjectResult<ObjectData> {
        if !path.starts_with('/') {
            return Err(ObjectError::InvalidArgument(format!(
                "path must be absolute: {path:?}"
            )));
        }
        let read = options.resolve(&self.config.defaults);
        self.call(
            Operation::GetObjectByPath {
                path: path.to_string(),
                read,
            },
            options.extension.clone(),
            expect_object,
        )
    }

    /// Properties of an object. `None` uses the configured filter.
    pub fn get_properties(
        &self,
        object_id: &ObjectId,
        filter: Option<PropertyFilter>,
        extension: Extension,
    ) -> ObjectResult<Properties> {
        let filter = filter.or_else(|| self.config.defaults.property_filter.clone());
        self.call(
            Operation::GetProperties {
                object_id: object_id.clone(),
                filter,
            },
            extension,
            |r| match r.result {
                RawResult::Properties(properties) => Ok(properties),
                other => Err(other),
            },
        )
    }

    pub fn get_allowable_actions(
        &self,
        object_id: &ObjectId,
        extension: Extension,
    ) -> ObjectResult<AllowableActions> {
        self.call(
            Operation::GetAllowableActions {
                object_id: object_id.clone(),
            },
            extension,
            |r| match r.result {
                RawResult::AllowableActions(actions) => Ok(actions),
                other => Err(other),
            },
        )
    }

    pub fn get_content_stream(
        &self,
        object_id: &ObjectId,
        range: &ContentRange,
        extension: Extension,
    ) -> ObjectResult<ContentStream> {
        self.call(
            Operation::GetContentStream {
                object_id: object_id.clone(),
                stream_id: range.stream_id.clone(),
                offset: range.offset,
                length: range.length,
            },
            extension,
            |r| match r.result {
                RawResult::ContentStream(content) => Ok(content),
                other => Err(other),
            },
        )
    }

    pub fn get_renditions(
        &self,
        object_id: &ObjectId,
        page: &RenditionPage,
        extension: Extension,
    ) -> ObjectResult<Vec<Rendition>> {
        let rendition_filter = page
            .filter
            .clone()
            .unwrap_or_else(|| self.config.defaults.rendition_filter.clone());
        self.call(
            Operation::GetRenditions {
                object_id: object_id.clone(),
                rendition_filter,
                max_items: page.max_items,
                skip_count: page.skip_count,
            },
            extension,
            |r| match r.result {
                RawResult::Renditions(renditions) => Ok(renditions),
                other => Err(other),
            },
        )
    }

    /// The object's current concurrency pair, read from the repository.
    pub fn current_ref(&self, object_id: &ObjectId, extension: Extension) -> ObjectResult<ObjectRef> {
        let filter = PropertyFilter::Names(vec![
            property_ids::OBJECT_ID.to_string(),
            property_ids::CHANGE_TOKEN.to_string(),
        ]);
        let properties = self.get_properties(object_id, Some(filter), extension)?;
        let change_token = properties
            .first_str(property_ids::CHANGE_TOKEN)
            .map(ChangeToken::new)
            .transpose()?;
        Ok(ObjectRef {
            id: object_id.clone(),
            change_token,
        })
    }

    // ---- Update operations ----

    pub fn update_properties(
        &self,
        object: &ObjectRef,
        properties: Properties,
        extension: Extension,
    ) -> ObjectResult<ObjectRef> {
        self.guard.check(object)?;
        if properties.is_empty() {
            return Err(ObjectError::InvalidArgument(format!(
                "no properties to update on {}",
                object.id
            )));
        }
        self.mutate(
            object,
            Operation::UpdateProperties {
                object: object.clone(),
                properties,
                add_secondary_type_ids: Vec::new(),
                remove_secondary_type_ids: Vec::new(),
            },
            extension,
        )
    }

    /// Apply the same update to every entry, best effort.
    ///
    /// Only malformed input fails the whole call; per-entry failures (stale
    /// tokens included) are recorded on the entries of the report.
    pub fn bulk_update_properties(
        &self,
        entries: Vec<BulkUpdateEntry>,
        properties: Properties,
        options: BulkUpdateOptions,
    ) -> ObjectResult<BulkUpdateReport> {
        check_secondary_types(&options.add_secondary_type_ids, &options.remove_secondary_type_ids)?;
        if properties.is_empty()
            && options.add_secondary_type_ids.is_empty()
            && options.remove_secondary_type_ids.is_empty()
        {
            return Err(ObjectError::InvalidArgument(
                "bulk update carries no properties and no secondary type changes".into(),
            ));
        }

        Ok(run_bulk_update(entries, |object| {
            self.guard.check(object)?;
            self.mutate(
                object,
                Operation::UpdateProperties {
                    object: object.clone(),
                    properties: properties.clone(),
                    add_secondary_type_ids: options.add_secondary_type_ids.clone(),
                    remove_secondary_type_ids: options.remove_secondary_type_ids.clone(),
                },
                options.extension.clone(),
            )
        }))
    }

    pub fn set_content_stream(
        &self,
        object: &ObjectRef,
        content: ContentStream,
        options: SetContentOptions,
    ) -> ObjectResult<ObjectRef> {
        self.guard.check(object)?;
        content.validate()?;
        let overwrite = options
            .overwrite
            .unwrap_or(self.config.defaults.overwrite_content);
        self.mutate(
            object,
            Operation::SetContentStream {
                object: object.clone(),
                content_stream: content,
                overwrite,
            },
            options.extension,
        )
    }

    /// Start a chunked upload for `object`. No repository call is made.
    pub fn open_content_stream(&self, object: ObjectRef) -> ObjectResult<ContentStreamChannel> {
        self.guard.check(&object)?;
        debug!(object = %object.id, "content stream channel opened");
        Ok(ContentStreamChannel::new(object))
    }

    /// Send the next chunk through `channel`.
    ///
    /// Fails with [`ObjectError::StreamClosed`] without contacting the
    /// repository once the final chunk was sent. A failed append leaves the
    /// channel unchanged; the repository may still have stored part of the
    /// upload, so re-read the object before resuming.
    pub fn append_content_stream(
        &self,
        channel: &mut ContentStreamChannel,
        chunk: ContentStream,
        is_last_chunk: bool,
        extension: Extension,
    ) -> ObjectResult<ObjectRef> {
        channel.ensure_open()?;
        self.guard.check(channel.object())?;
        chunk.validate()?;

        let object = channel.object().clone();
        let chunk_len = chunk.len();
        let successor = self.mutate(
            &object,
            Operation::AppendContentStream {
                object: object.clone(),
                content_stream: chunk,
                is_last_chunk,
            },
            extension,
        )?;
        channel.record(successor.clone(), chunk_len, is_last_chunk);
        Ok(successor)
    }

    pub fn delete_content_stream(
        &self,
        object: &ObjectRef,
        extension: Extension,
    ) -> ObjectResult<ObjectRef> {
        self.guard.check(object)?;
        self.mutate(
            object,
            Operation::DeleteContentStream {
                object: object.clone(),
            },
            extension,
        )
    }

    /// Move an object from `source_folder_id` to `target_folder_id`.
    pub fn move_object(
        &self,
        object_id: &ObjectId,
        target_folder_id: &ObjectId,
        source_folder_id: &ObjectId,
        extension: Extension,
    ) -> ObjectResult<ObjectRef> {
        let moved = self.mutate(
            &ObjectRef::untracked(object_id.clone()),
            Operation::MoveObject {
                object_id: object_id.clone(),
                target_folder_id: target_folder_id.clone(),
                source_folder_id: source_folder_id.clone(),
            },
            extension,
        )?;
        info!(object = %moved.id, from = %source_folder_id, to = %target_folder_id, "object moved");
        Ok(moved)
    }

    // ---- Delete operations ----

    pub fn delete_object(&self, object_id: &ObjectId, options: &DeleteOptions) -> ObjectResult<()> {
        let all_versions = options
            .all_versions
            .unwrap_or(self.config.defaults.all_versions);
        self.delete_one(object_id, all_versions, &options.extension)?;
        info!(object = %object_id, all_versions, "object deleted");
        Ok(())
    }

    /// Delete a folder and everything filed beneath it.
    ///
    /// Fails only when the tree cannot be planned (unknown id, not a
    /// folder, connectivity). Objects that could not be removed are listed
    /// in the report.
    pub fn delete_tree(
        &self,
        folder_id: &ObjectId,
        options: &DeleteTreeOptions,
    ) -> ObjectResult<TreeDeletionReport> {
        let defaults = &self.config.defaults;
        let all_versions = options.all_versions.unwrap_or(defaults.all_versions);
        let unfile_objects = options.unfile_objects.unwrap_or(defaults.unfile_objects);
        let continue_on_failure = options
            .continue_on_failure
            .unwrap_or(defaults.continue_on_failure);
        let extension = &options.extension;

        let children = self.call(
            Operation::GetFolderTree {
                folder_id: folder_id.clone(),
            },
            extension.clone(),
            expect_tree,
        )?;
        debug!(
            folder = %folder_id,
            members = children.iter().map(|c| c.subtree_ids().len()).sum::<usize>(),
            %unfile_objects,
            continue_on_failure,
            "tree deletion planned"
        );

        let plan = TreePlan {
            folder_id: folder_id.clone(),
            children,
            unfile_objects,
            continue_on_failure,
        };
        Ok(tree::execute(
            plan,
            |id| self.delete_one(id, all_versions, extension),
            |id, folder| {
                self.call(
                    Operation::RemoveObjectFromFolder {
                        object_id: id.clone(),
                        folder_id: folder.clone(),
                    },
                    extension.clone(),
                    expect_ack,
                )
                .map(|_| ())
            },
        ))
    }

    // ---- Internals ----

    fn delete_one(
        &self,
        object_id: &ObjectId,
        all_versions: bool,
        extension: &Extension,
    ) -> ObjectResult<()> {
        self.call(
            Operation::DeleteObject {
                object_id: object_id.clone(),
                all_versions,
            },
            extension.clone(),
            |r| match r.result {
                RawResult::Done => Ok(()),
                other => Err(other),
            },
        )
    }

    fn mutate(
        &self,
        object: &ObjectRef,
        operation: Operation,
        extension: Extension,
    ) -> ObjectResult<ObjectRef> {
        let ack = self.call(operation, extension, expect_ack)?;
        Ok(self.guard.successor(object, &ack))
    }

    /// Send one operation and decode its result.
    fn call<R>(
        &self,
        operation: Operation,
        extension: Extension,
        decode: impl FnOnce(Response) -> Result<R, RawResult>,
    ) -> ObjectResult<R> {
        let name = operation.name();
        debug!(operation = name, repository = %self.config.repository_id, "dispatching");
        let request = Request::new(self.config.repository_id.clone(), operation, extension);
        let response = self.transport.invoke(request).map_err(|e| {
            debug!(operation = name, error = %e, "operation failed");
            ObjectError::from(e)
        })?;
        decode(response).map_err(|other| ObjectError::UnexpectedResponse {
            operation: name,
            received: other.kind(),
        })
    }

    fn check_create(&self, check: CreateCheck<'_>) -> ObjectResult<()> {
        let type_id = match check.properties.object_type_id() {
            Some(type_id) => type_id,
            // copies inherit the source's type
            None if check.has_content.is_none() => return Ok(()),
            None => {
                return Err(ObjectError::InvalidArgument(format!(
                    "{}: {} is required",
                    check.operation,
                    property_ids::OBJECT_TYPE_ID
                )))
            }
        };

        if check.base == BaseTypeId::Relationship {
            for endpoint in [property_ids::SOURCE_ID, property_ids::TARGET_ID] {
                if check
                    .properties
                    .first_str(endpoint)
                    .map_or(true, |v| v.trim().is_empty())
                {
                    return Err(ObjectError::InvalidArgument(format!(
                        "{}: {endpoint} is required",
                        check.operation
                    )));
                }
            }
        }

        let Some(metadata) = &self.metadata else {
            return Ok(());
        };
        let summary = metadata.type_summary(type_id).ok_or_else(|| {
            ObjectError::ConstraintViolation(format!("unknown object type {type_id}"))
        })?;
        check_type(&summary, &check)
    }
}

// ---------------------------------------------------------------------------
// Local type pre-checks
// ---------------------------------------------------------------------------

struct CreateCheck<'a> {
    operation: &'static str,
    base: BaseTypeId,
    properties: &'a Properties,
    folder_id: Option<&'a ObjectId>,
    /// `None` when the content comes from a source document.
    has_content: Option<bool>,
    versioning_state: Option<VersioningState>,
}

impl<'a> CreateCheck<'a> {
    /// A create without content or versioning.
    fn plain(
        operation: &'static str,
        base: BaseTypeId,
        properties: &'a Properties,
        folder_id: Option<&'a ObjectId>,
    ) -> Self {
        Self {
            operation,
            base,
            properties,
            folder_id,
            has_content: Some(false),
            versioning_state: None,
        }
    }
}

fn check_type(summary: &TypeSummary, check: &CreateCheck<'_>) -> ObjectResult<()> {
    let violation = |reason: String| Err(ObjectError::ConstraintViolation(reason));
    let type_id = &summary.type_id;

    if summary.base_type != check.base {
        return violation(format!("type {type_id} is not a {} type", check.base));
    }
    if !summary.creatable {
        return violation(format!("type {type_id} is not creatable"));
    }
    if check.folder_id.is_some() && !summary.fileable {
        return violation(format!("type {type_id} cannot be filed"));
    }
    if check.base == BaseTypeId::Document {
        match (check.has_content, summary.content_stream_allowed) {
            (Some(true), ContentStreamAllowed::NotAllowed) => {
                return violation(format!("type {type_id} does not allow a content stream"));
            }
            (Some(false), ContentStreamAllowed::Required) => {
                return violation(format!("type {type_id} requires a content stream"));
            }
            _ => {}
        }
    }
    if let Some(state) = check.versioning_state {
        let unversioned = state == VersioningState::None;
        if summary.versionable && unversioned {
            return violation(format!(
                "type {type_id} is versionable; versioning state none is not allowed"
            ));
        }
        if !summary.versionable && !unversioned {
            return violation(format!(
                "type {type_id} is not versionable; versioning state must be none"
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

fn expect_object_id(response: Response) -> Result<ObjectId, RawResult> {
    match response.result {
        RawResult::ObjectId(id) => Ok(id),
        other => Err(other),
    }
}

fn expect_object(response: Response) -> Result<ObjectData, RawResult> {
    match response.result {
        RawResult::Object(mut data) => {
            data.extension = response.extension;
            Ok(data)
        }
        other => Err(other),
    }
}

fn expect_ack(response: Response) -> Result<MutationAck, RawResult> {
    match response.result {
        RawResult::Updated(ack) => Ok(ack),
        other => Err(other),
    }
}

fn expect_tree(response: Response) -> Result<Vec<TreeNode>, RawResult> {
    match response.result {
        RawResult::Tree(nodes) => Ok(nodes),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use cmis_transport::{InMemoryRepository, TransportResult};
    use cmis_types::{Ace, AclDelta, IncludeRelationships, PropertyValue, RenditionFilter, UnfileObject};

    const REPO: &str = "repo";

    type Service = ObjectService<Arc<InMemoryRepository>>;

    fn setup() -> (Arc<InMemoryRepository>, Service) {
        setup_with(ObjectServiceConfig::new(REPO))
    }

    fn setup_with(config: ObjectServiceConfig) -> (Arc<InMemoryRepository>, Service) {
        let repo = Arc::new(InMemoryRepository::new(REPO));
        let service = ObjectService::new(Arc::clone(&repo), config)
            .unwrap()
            .with_metadata(repo.clone());
        (repo, service)
    }

    fn props(type_id: &str, name: &str) -> Properties {
        Properties::new()
            .with(property_ids::OBJECT_TYPE_ID, PropertyValue::id(type_id))
            .with(property_ids::NAME, PropertyValue::string(name))
    }

    fn folder(service: &Service, parent: &ObjectId, name: &str) -> ObjectId {
        service
            .create_folder(props("cmis:folder", name), parent, CreateOptions::new())
            .unwrap()
    }

    fn document(service: &Service, parent: &ObjectId, name: &str, content: &'static str) -> ObjectId {
        service
            .create_document(
                props("cmis:document", name),
                Some(parent),
                DocumentOptions::new().with_content(ContentStream::new("text/plain", content)),
            )
            .unwrap()
    }

    fn pair(service: &Service, id: &ObjectId) -> ObjectRef {
        service.current_ref(id, Extension::none()).unwrap()
    }

    fn content(service: &Service, id: &ObjectId) -> Bytes {
        service
            .get_content_stream(id, &ContentRange::full(), Extension::none())
            .unwrap()
            .data
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    #[test]
    fn create_document_round_trip() {
        let (repo, service) = setup();
        let f1 = folder(&service, repo.root_id(), "F1");
        let supplied = props("cmis:document", "a.txt");
        let d1 = service
            .create_document(
                supplied.clone(),
                Some(&f1),
                DocumentOptions::new().with_content(ContentStream::new("text/plain", "hello")),
            )
            .unwrap();

        assert_eq!(content(&service, &d1), Bytes::from("hello"));
        let fetched = service.get_properties(&d1, None, Extension::none()).unwrap();
        assert_eq!(fetched.name(), Some("a.txt"));
        assert!(supplied.is_subset_of(&fetched));
        assert_eq!(fetched.first_str(property_ids::VERSION_LABEL), Some("1.0"));
    }

    #[test]
    fn missing_type_id_fails_locally() {
        let (repo, service) = setup();
        let before = repo.call_count();
        let err = service
            .create_item(
                Properties::new().with(property_ids::NAME, PropertyValue::string("x")),
                None,
                CreateOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));
        assert_eq!(repo.call_count(), before);
    }

    #[test]
    fn metadata_rejects_non_creatable_type_locally() {
        let (repo, service) = setup();
        repo.register_type(
            TypeSummary::new("custom:frozen", BaseTypeId::Document).not_creatable(),
        );
        let before = repo.call_count();
        let err = service
            .create_document(props("custom:frozen", "a"), None, DocumentOptions::new())
            .unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(_)));
        assert_eq!(repo.call_count(), before);
    }

    #[test]
    fn metadata_rejects_content_and_base_mismatch() {
        let (repo, service) = setup();
        repo.register_type(
            TypeSummary::new("custom:note", BaseTypeId::Document)
                .with_content(ContentStreamAllowed::NotAllowed),
        );
        let err = service
            .create_document(
                props("custom:note", "n"),
                None,
                DocumentOptions::new().with_content(ContentStream::octets(&b"x"[..])),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(ref m) if m.contains("content")));

        let err = service
            .create_folder(props("cmis:document", "f"), repo.root_id(), CreateOptions::new())
            .unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(_)));

        let err = service
            .create_document(
                props("cmis:document", "v"),
                None,
                DocumentOptions::new().with_versioning_state(VersioningState::None),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(_)));
    }

    #[test]
    fn without_metadata_repository_decides() {
        let repo = Arc::new(InMemoryRepository::new(REPO));
        repo.register_type(
            TypeSummary::new("custom:frozen", BaseTypeId::Document).not_creatable(),
        );
        let service = ObjectService::new(repo.clone(), ObjectServiceConfig::new(REPO)).unwrap();
        let err = service
            .create_document(props("custom:frozen", "a"), None, DocumentOptions::new())
            .unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(_)));
        assert_eq!(repo.calls(), vec!["createDocument"]);
    }

    #[test]
    fn unknown_parent_is_folder_not_found() {
        let (_repo, service) = setup();
        let err = service
            .create_folder(
                props("cmis:folder", "x"),
                &ObjectId::new("missing").unwrap(),
                CreateOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::FolderNotFound(_)));
    }

    #[test]
    fn relationship_requires_endpoints() {
        let (repo, service) = setup();
        let a = document(&service, repo.root_id(), "a", "1");
        let b = document(&service, repo.root_id(), "b", "2");

        let err = service
            .create_relationship(
                Properties::new()
                    .with(property_ids::OBJECT_TYPE_ID, PropertyValue::id("cmis:relationship"))
                    .with(property_ids::SOURCE_ID, PropertyValue::id(a.as_str())),
                CreateOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(ref m) if m.contains("cmis:targetId")));

        let rel = service
            .create_relationship(
                Properties::new()
                    .with(property_ids::OBJECT_TYPE_ID, PropertyValue::id("cmis:relationship"))
                    .with(property_ids::SOURCE_ID, PropertyValue::id(a.as_str()))
                    .with(property_ids::TARGET_ID, PropertyValue::id(b.as_str())),
                CreateOptions::new(),
            )
            .unwrap();

        let data = service
            .get_object(&b, &ReadOptions::new().with_relationships(IncludeRelationships::Target))
            .unwrap();
        assert_eq!(data.relationships.len(), 1);
        assert_eq!(data.relationships[0].id(), Some(rel));

        let data = service
            .get_object(&b, &ReadOptions::new().with_relationships(IncludeRelationships::Source))
            .unwrap();
        assert!(data.relationships.is_empty());
    }

    #[test]
    fn policies_deduplicated_and_acl_applied() {
        let (repo, service) = setup();
        let policy = service
            .create_policy(props("cmis:policy", "retention"), Some(repo.root_id()), CreateOptions::new())
            .unwrap();
        let d1 = service
            .create_document(
                props("cmis:document", "a.txt"),
                Some(repo.root_id()),
                DocumentOptions::new().with_create(
                    CreateOptions::new()
                        .with_policy(policy.clone())
                        .with_policy(policy.clone())
                        .with_acl(AclDelta::none().add(Ace::new("alice", ["cmis:all"]))),
                ),
            )
            .unwrap();

        let data = service
            .get_object(&d1, &ReadOptions::new().with_policy_ids(true).with_acl(true))
            .unwrap();
        assert_eq!(data.policy_ids, Some(vec![policy]));
        assert!(data.acl.unwrap().permissions_of("alice").contains("cmis:all"));
    }

    #[test]
    fn copy_from_source() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let err = service
            .create_document_from_source(
                &d1,
                Properties::new(),
                None,
                DocumentOptions::new().with_content(ContentStream::octets(&b"x"[..])),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));

        let copy = service
            .create_document_from_source(
                &d1,
                Properties::new().with(property_ids::NAME, PropertyValue::string("b.txt")),
                Some(repo.root_id()),
                DocumentOptions::new(),
            )
            .unwrap();
        assert_eq!(content(&service, &copy), Bytes::from("hello"));
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    #[test]
    fn reads_apply_defaults() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.png", "pixels");
        repo.add_rendition(&d1, Rendition::new("t1", "cmis:thumbnail", "image/png"), "tt")
            .unwrap();

        let data = service.get_object(&d1, &ReadOptions::new()).unwrap();
        assert!(data.renditions.is_empty());
        assert!(data.allowable_actions.is_none());
        assert!(data.acl.is_none());
        assert!(data.policy_ids.is_none());

        let data = service
            .get_object(
                &d1,
                &ReadOptions::new()
                    .with_renditions(RenditionFilter::All)
                    .with_allowable_actions(true),
            )
            .unwrap();
        assert_eq!(data.renditions.len(), 1);
        assert!(data
            .allowable_actions
            .unwrap()
            .allows(cmis_types::Action::GetContentStream));
    }

    #[test]
    fn configured_defaults_drive_reads() {
        let mut config = ObjectServiceConfig::new(REPO);
        config.defaults.rendition_filter = RenditionFilter::parse("image/*").unwrap();
        config.defaults.property_filter = Some(PropertyFilter::parse("cmis:name").unwrap());
        let (repo, service) = setup_with(config);
        let d1 = document(&service, repo.root_id(), "a.png", "pixels");
        repo.add_rendition(&d1, Rendition::new("t1", "cmis:thumbnail", "image/png"), "tt")
            .unwrap();
        repo.add_rendition(&d1, Rendition::new("p1", "cmis:preview", "application/pdf"), "pp")
            .unwrap();

        let renditions = service
            .get_renditions(&d1, &RenditionPage::new(), Extension::none())
            .unwrap();
        assert_eq!(renditions.len(), 1);
        assert_eq!(renditions[0].stream_id, "t1");

        let properties = service.get_properties(&d1, None, Extension::none()).unwrap();
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn renditions_page_and_stream() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.png", "pixels");
        for n in 0..4 {
            repo.add_rendition(
                &d1,
                Rendition::new(format!("s{n}"), "cmis:thumbnail", "image/png"),
                format!("thumb{n}"),
            )
            .unwrap();
        }
        let none = service
            .get_renditions(&d1, &RenditionPage::new(), Extension::none())
            .unwrap();
        assert!(none.is_empty());

        let page = service
            .get_renditions(
                &d1,
                &RenditionPage::new()
                    .with_filter(RenditionFilter::All)
                    .with_skip_count(1)
                    .with_max_items(2),
                Extension::none(),
            )
            .unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.stream_id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);

        let stream = service
            .get_content_stream(&d1, &ContentRange::full().with_stream("s3"), Extension::none())
            .unwrap();
        assert_eq!(stream.data, Bytes::from("thumb3"));
    }

    #[test]
    fn partial_content_retrieval() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello world");
        let tail = service
            .get_content_stream(&d1, &ContentRange::full().with_offset(6), Extension::none())
            .unwrap();
        assert_eq!(tail.data, Bytes::from("world"));
        let middle = service
            .get_content_stream(
                &d1,
                &ContentRange::full().with_offset(2).with_length(3),
                Extension::none(),
            )
            .unwrap();
        assert_eq!(middle.data, Bytes::from("llo"));
    }

    #[test]
    fn relative_path_rejected_locally() {
        let (repo, service) = setup();
        let before = repo.call_count();
        let err = service
            .get_object_by_path("F1/a.txt", &ReadOptions::new())
            .unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));
        assert_eq!(repo.call_count(), before);
    }

    // -----------------------------------------------------------------------
    // Update and change tokens
    // -----------------------------------------------------------------------

    #[test]
    fn update_returns_fresh_pair_and_stale_pair_conflicts() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let original = pair(&service, &d1);

        let renamed = service
            .update_properties(
                &original,
                Properties::new().with(property_ids::NAME, PropertyValue::string("b.txt")),
                Extension::none(),
            )
            .unwrap();
        assert_eq!(renamed.id, d1);
        assert_ne!(renamed.change_token, original.change_token);

        let err = service
            .update_properties(
                &original,
                Properties::new().with(property_ids::NAME, PropertyValue::string("c.txt")),
                Extension::none(),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::UpdateConflict(_)));

        service
            .update_properties(
                &renamed,
                Properties::new().with(property_ids::NAME, PropertyValue::string("c.txt")),
                Extension::none(),
            )
            .unwrap();
        let name = service.get_properties(&d1, None, Extension::none()).unwrap();
        assert_eq!(name.name(), Some("c.txt"));
    }

    #[test]
    fn null_token_skips_concurrency_check() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        service
            .update_properties(
                &ObjectRef::untracked(d1),
                Properties::new().with(property_ids::NAME, PropertyValue::string("b.txt")),
                Extension::none(),
            )
            .unwrap();
    }

    #[test]
    fn required_tokens_reject_untracked_pairs_locally() {
        let (repo, service) =
            setup_with(ObjectServiceConfig::new(REPO).with_required_change_tokens(true));
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let before = repo.call_count();

        let err = service
            .set_content_stream(
                &ObjectRef::untracked(d1.clone()),
                ContentStream::new("text/plain", "x"),
                SetContentOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));
        assert!(service.open_content_stream(ObjectRef::untracked(d1)).is_err());
        assert_eq!(repo.call_count(), before);
    }

    #[test]
    fn empty_update_rejected() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let err = service
            .update_properties(&ObjectRef::untracked(d1), Properties::new(), Extension::none())
            .unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    #[test]
    fn overwrite_false_keeps_existing_stream() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let err = service
            .set_content_stream(
                &pair(&service, &d1),
                ContentStream::new("text/plain", "bye"),
                SetContentOptions::new().with_overwrite(false),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(_)));
        assert_eq!(content(&service, &d1), Bytes::from("hello"));

        let next = service
            .set_content_stream(
                &pair(&service, &d1),
                ContentStream::new("text/plain", "bye"),
                SetContentOptions::new(),
            )
            .unwrap();
        assert!(next.is_tracked());
        assert_eq!(content(&service, &d1), Bytes::from("bye"));
    }

    #[test]
    fn length_mismatch_rejected_before_sending() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let before = repo.call_count();
        let mut bad = ContentStream::new("text/plain", "abc");
        bad.declared_length = Some(10);
        let err = service
            .set_content_stream(&ObjectRef::untracked(d1), bad, SetContentOptions::new())
            .unwrap_err();
        assert!(matches!(err, ObjectError::Type(_)));
        assert_eq!(repo.call_count(), before);
    }

    #[test]
    fn chunked_append_then_closed() {
        let (repo, service) = setup();
        let d1 = service
            .create_document(props("cmis:document", "log.txt"), Some(repo.root_id()), DocumentOptions::new())
            .unwrap();
        let mut channel = service.open_content_stream(pair(&service, &d1)).unwrap();

        let chunks = ["alpha-", "beta-", "gamma"];
        for (i, chunk) in chunks.iter().enumerate() {
            let next = service
                .append_content_stream(
                    &mut channel,
                    ContentStream::new("text/plain", *chunk),
                    i == chunks.len() - 1,
                    Extension::none(),
                )
                .unwrap();
            assert_eq!(channel.object(), &next);
        }
        assert!(channel.is_closed());
        assert_eq!(channel.chunks_sent(), 3);
        assert_eq!(channel.bytes_sent(), 16);
        assert_eq!(content(&service, &d1), Bytes::from("alpha-beta-gamma"));

        let before = repo.call_count();
        let err = service
            .append_content_stream(
                &mut channel,
                ContentStream::new("text/plain", "late"),
                true,
                Extension::none(),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::StreamClosed { ref object_id } if *object_id == d1));
        assert_eq!(repo.call_count(), before);
    }

    #[test]
    fn failed_append_leaves_channel_unchanged() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "x");
        let stale = pair(&service, &d1);
        service
            .update_properties(
                &stale,
                Properties::new().with(property_ids::NAME, PropertyValue::string("b.txt")),
                Extension::none(),
            )
            .unwrap();

        let mut channel = service.open_content_stream(stale.clone()).unwrap();
        let err = service
            .append_content_stream(
                &mut channel,
                ContentStream::new("text/plain", "y"),
                false,
                Extension::none(),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::UpdateConflict(_)));
        assert_eq!(channel.state(), crate::ChannelState::Open);
        assert_eq!(channel.object(), &stale);
        assert_eq!(channel.chunks_sent(), 0);
    }

    #[test]
    fn delete_content_stream_clears_content() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let next = service
            .delete_content_stream(&pair(&service, &d1), Extension::none())
            .unwrap();
        assert!(next.is_tracked());
        let err = service
            .get_content_stream(&d1, &ContentRange::full(), Extension::none())
            .unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(_)));
    }

    // -----------------------------------------------------------------------
    // Move and delete
    // -----------------------------------------------------------------------

    #[test]
    fn move_changes_resolvable_path() {
        let (repo, service) = setup();
        let f1 = folder(&service, repo.root_id(), "F1");
        let f2 = folder(&service, repo.root_id(), "F2");
        let d1 = document(&service, &f1, "a.txt", "hello");

        let moved = service.move_object(&d1, &f2, &f1, Extension::none()).unwrap();
        assert_eq!(moved.id, d1);
        assert!(moved.is_tracked());

        let err = service
            .get_object_by_path("/F1/a.txt", &ReadOptions::new())
            .unwrap_err();
        assert!(matches!(err, ObjectError::ObjectNotFound(_)));
        let data = service
            .get_object_by_path("/F2/a.txt", &ReadOptions::new())
            .unwrap();
        assert_eq!(data.id(), Some(d1));
    }

    #[test]
    fn delete_object_and_non_empty_folder() {
        let (repo, service) = setup();
        let f1 = folder(&service, repo.root_id(), "F1");
        let d1 = document(&service, &f1, "a.txt", "hello");

        let err = service.delete_object(&f1, &DeleteOptions::new()).unwrap_err();
        assert!(matches!(err, ObjectError::ConstraintViolation(_)));

        service.delete_object(&d1, &DeleteOptions::new()).unwrap();
        assert!(!repo.contains(&d1));
        service.delete_object(&f1, &DeleteOptions::new()).unwrap();
        assert!(!repo.contains(&f1));

        let err = service.delete_object(&d1, &DeleteOptions::new()).unwrap_err();
        assert!(matches!(err, ObjectError::ObjectNotFound(_)));
    }

    /// root / t { a.txt, m { b, c }, z.txt }, children listed by name.
    fn tree_fixture(service: &Service, root: &ObjectId) -> (ObjectId, ObjectId, Vec<ObjectId>) {
        let t = folder(service, root, "t");
        let a = document(service, &t, "a.txt", "1");
        let s = folder(service, &t, "m");
        let b = document(service, &s, "b", "2");
        let c = document(service, &s, "c", "3");
        let d = document(service, &t, "z.txt", "4");
        (t, s, vec![a, b, c, d])
    }

    #[test]
    fn delete_tree_removes_everything() {
        let (repo, service) = setup();
        let (t, s, docs) = tree_fixture(&service, repo.root_id());
        let report = service.delete_tree(&t, &DeleteTreeOptions::new()).unwrap();
        assert!(report.is_complete());
        assert!(!repo.contains(&t));
        assert!(!repo.contains(&s));
        assert!(docs.iter().all(|d| !repo.contains(d)));
        assert_eq!(repo.object_count(), 1);
    }

    #[test]
    fn delete_tree_stops_at_first_failure() {
        let (repo, service) = setup();
        let (t, s, docs) = tree_fixture(&service, repo.root_id());
        let (b, d) = (docs[1].clone(), docs[3].clone());
        repo.deny_deletion(b.clone());
        repo.deny_deletion(d.clone());

        let report = service.delete_tree(&t, &DeleteTreeOptions::new()).unwrap();
        assert_eq!(report.not_deleted.first(), Some(&b));
        assert!(report.contains(&s));
        assert!(report.contains(&t));
        assert!(!report.contains(&d));
        assert!(repo.contains(&docs[2]));
        assert!(!repo.contains(&docs[0]));
    }

    #[test]
    fn delete_tree_continue_reports_every_failure() {
        let (repo, service) = setup();
        let (t, s, docs) = tree_fixture(&service, repo.root_id());
        let (b, d) = (docs[1].clone(), docs[3].clone());
        repo.deny_deletion(b.clone());
        repo.deny_deletion(d.clone());

        let report = service
            .delete_tree(&t, &DeleteTreeOptions::new().with_continue_on_failure(true))
            .unwrap();
        assert_eq!(report.not_deleted, vec![b, s, d, t]);
        assert!(!repo.contains(&docs[0]));
        assert!(!repo.contains(&docs[2]));
    }

    #[test]
    fn delete_tree_unfile_keeps_documents() {
        let (repo, service) = setup();
        let (t, s, docs) = tree_fixture(&service, repo.root_id());
        let report = service
            .delete_tree(&t, &DeleteTreeOptions::new().with_unfile_objects(UnfileObject::Unfile))
            .unwrap();
        assert!(report.is_complete());
        assert!(!repo.contains(&t));
        assert!(!repo.contains(&s));
        assert!(docs.iter().all(|d| repo.contains(d)));
    }

    #[test]
    fn delete_tree_keeps_objects_filed_outside() {
        let (repo, service) = setup();
        let (t, s, docs) = tree_fixture(&service, repo.root_id());
        let outside = folder(&service, repo.root_id(), "outside");
        let (a, b) = (docs[0].clone(), docs[1].clone());
        repo.file_in_folder(&a, &outside).unwrap();
        repo.file_in_folder(&b, &t).unwrap();

        let report = service
            .delete_tree(
                &t,
                &DeleteTreeOptions::new().with_unfile_objects(UnfileObject::DeleteSingleFiled),
            )
            .unwrap();
        assert!(report.is_complete());
        assert!(!repo.contains(&t));
        assert!(!repo.contains(&s));
        assert!(!repo.contains(&b));
        assert!(repo.contains(&a));
        let kept = service
            .get_object_by_path("/outside/a.txt", &ReadOptions::new())
            .unwrap();
        assert_eq!(kept.id(), Some(a));
        assert_eq!(repo.object_count(), 3);
    }

    #[test]
    fn delete_tree_on_document_is_invalid() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a.txt", "hello");
        let err = service.delete_tree(&d1, &DeleteTreeOptions::new()).unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));
        assert!(repo.contains(&d1));
    }

    // -----------------------------------------------------------------------
    // Bulk update
    // -----------------------------------------------------------------------

    #[test]
    fn bulk_update_with_one_stale_entry() {
        let (repo, service) = setup();
        repo.register_type(TypeSummary::new("custom:reviewed", BaseTypeId::Secondary));
        let ids: Vec<ObjectId> = (0..3)
            .map(|i| document(&service, repo.root_id(), &format!("d{i}"), "x"))
            .collect();
        let entries: Vec<BulkUpdateEntry> =
            ids.iter().map(|id| pair(&service, id).into()).collect();

        // someone else touches d1 first
        service
            .set_content_stream(
                &pair(&service, &ids[1]),
                ContentStream::new("text/plain", "y"),
                SetContentOptions::new(),
            )
            .unwrap();

        let report = service
            .bulk_update_properties(
                entries,
                Properties::new(),
                BulkUpdateOptions::new().adding_secondary_type("custom:reviewed"),
            )
            .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.updated().count(), 2);
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].object.id, ids[1]);
        assert!(!failed[0].token_changed());
        assert!(matches!(failed[0].failure, Some(ObjectError::UpdateConflict(_))));

        for entry in report.updated() {
            assert!(entry.token_changed());
            assert_eq!(entry.current(), &pair(&service, &entry.object.id));
        }
    }

    #[test]
    fn bulk_update_rejects_overlapping_secondary_types() {
        let (repo, service) = setup();
        let d1 = document(&service, repo.root_id(), "a", "x");
        let before = repo.call_count();
        let err = service
            .bulk_update_properties(
                vec![ObjectRef::untracked(d1).into()],
                Properties::new(),
                BulkUpdateOptions::new()
                    .adding_secondary_type("custom:a")
                    .removing_secondary_type("custom:a"),
            )
            .unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));
        assert_eq!(repo.call_count(), before);
    }

    // -----------------------------------------------------------------------
    // Transport behavior
    // -----------------------------------------------------------------------

    #[test]
    fn connectivity_failures_surface_unretried() {
        let (repo, service) = setup();
        repo.set_offline(true);
        let before = repo.call_count();
        let err = service
            .get_allowable_actions(repo.root_id(), Extension::none())
            .unwrap_err();
        assert!(matches!(err, ObjectError::Connectivity(_)));
        assert_eq!(repo.call_count(), before + 1);
    }

    #[test]
    fn extension_passes_through_both_ways() {
        let (repo, service) = setup();
        let ext = Extension::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let data = service
            .get_object(repo.root_id(), &ReadOptions::new().with_extension(ext.clone()))
            .unwrap();
        assert_eq!(repo.last_request_extension(), Some(ext.clone()));
        assert_eq!(data.extension, ext);

        let f1 = service
            .create_folder(
                props("cmis:folder", "F1"),
                repo.root_id(),
                CreateOptions::new().with_extension(ext.clone()),
            )
            .unwrap();
        assert!(repo.contains(&f1));
        assert_eq!(repo.last_request_extension(), Some(ext));
    }

    struct Canned(RawResult);

    impl Transport for Canned {
        fn invoke(&self, _request: Request) -> TransportResult<Response> {
            Ok(Response::new(self.0.clone()))
        }
    }

    #[test]
    fn wrong_result_shape_is_unexpected_response() {
        let service = ObjectService::new(Canned(RawResult::Done), ObjectServiceConfig::new(REPO)).unwrap();
        let err = service
            .get_properties(&ObjectId::new("x").unwrap(), None, Extension::none())
            .unwrap_err();
        assert_eq!(
            err,
            ObjectError::UnexpectedResponse {
                operation: "getProperties",
                received: RawResult::Done.kind(),
            }
        );
    }

    #[test]
    fn ack_without_token_yields_untracked_pair() {
        let service = ObjectService::new(
            Canned(RawResult::Updated(MutationAck::default())),
            ObjectServiceConfig::new(REPO),
        )
        .unwrap();
        let object = ObjectRef::new(
            ObjectId::new("x").unwrap(),
            ChangeToken::new("t1").unwrap(),
        );
        let next = service
            .delete_content_stream(&object, Extension::none())
            .unwrap();
        assert_eq!(next.id, object.id);
        assert!(!next.is_tracked());
    }

    #[test]
    fn invalid_config_rejected() {
        let repo = Arc::new(InMemoryRepository::new(REPO));
        let err = ObjectService::new(repo, ObjectServiceConfig::default()).unwrap_err();
        assert!(matches!(err, ObjectError::InvalidArgument(_)));
    }

    #[test]
    fn toml_config_drives_service() {
        let config = ObjectServiceConfig::from_toml_str(
            "repository_id = \"repo\"\n[defaults]\nversioning_state = \"minor\"\n",
        )
        .unwrap();
        let (repo, service) = setup_with(config);
        let d1 = document(&service, repo.root_id(), "a.txt", "x");
        let properties = service.get_properties(&d1, None, Extension::none()).unwrap();
        assert_eq!(properties.first_str(property_ids::VERSION_LABEL), Some("0.1"));
    }
}
