//! In-memory repository for tests, local demos, and embedding.
//!
//! [`InMemoryRepository`] keeps every object in a `HashMap` behind a
//! `RwLock` and implements both [`Transport`] and [`RepositoryMetadata`].
//! It enforces the repository-side rules the object service relies on:
//! change-token checks, unique names per folder, overwrite protection,
//! non-empty folder protection, and version-series deletion.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use tracing::debug;

use cmis_types::{
    property_ids, Acl, AclDelta, Action, AllowableActions, BaseTypeId, ChangeToken,
    ContentStream, Extension, IncludeRelationships, ObjectData, ObjectId, ObjectRef, Properties,
    PropertyValue, Rendition, RenditionFilter, VersioningState,
};

use crate::error::{FaultKind, TransportError, TransportResult};
use crate::operation::{ObjectReadRequest, Operation, Request};
use crate::result::{MutationAck, RawResult, Response, TreeNode};
use crate::traits::{ContentStreamAllowed, RepositoryMetadata, Transport, TypeSummary};

/// Properties maintained by the repository; callers cannot set them.
const SYSTEM_PROPERTIES: &[&str] = &[
    property_ids::OBJECT_ID,
    property_ids::BASE_TYPE_ID,
    property_ids::OBJECT_TYPE_ID,
    property_ids::CHANGE_TOKEN,
    property_ids::CREATION_DATE,
    property_ids::LAST_MODIFICATION_DATE,
    property_ids::VERSION_SERIES_ID,
    property_ids::VERSION_LABEL,
    property_ids::IS_MAJOR_VERSION,
    property_ids::IS_LATEST_VERSION,
    property_ids::IS_VERSION_SERIES_CHECKED_OUT,
    property_ids::CONTENT_STREAM_LENGTH,
    property_ids::CONTENT_STREAM_MIME_TYPE,
    property_ids::CONTENT_STREAM_FILE_NAME,
    property_ids::PATH,
    property_ids::PARENT_ID,
];

fn fault(kind: FaultKind, message: impl Into<String>) -> TransportError {
    TransportError::fault(kind, message)
}

fn constraint(message: impl Into<String>) -> TransportError {
    fault(FaultKind::ConstraintViolation, message)
}

fn invalid(message: impl Into<String>) -> TransportError {
    fault(FaultKind::InvalidArgument, message)
}

/// An object as the repository stores it.
#[derive(Clone, Debug)]
struct StoredObject {
    id: ObjectId,
    base: BaseTypeId,
    properties: Properties,
    parents: Vec<ObjectId>,
    content: Option<ContentStream>,
    change_token: ChangeToken,
    acl: Acl,
    policies: Vec<ObjectId>,
    renditions: Vec<(Rendition, Bytes)>,
}

impl StoredObject {
    fn name(&self) -> Option<&str> {
        self.properties.name()
    }

    fn version_series(&self) -> Option<&str> {
        self.properties.first_str(property_ids::VERSION_SERIES_ID)
    }

    fn is_checked_out(&self) -> bool {
        self.properties
            .get(property_ids::IS_VERSION_SERIES_CHECKED_OUT)
            .and_then(PropertyValue::first_boolean)
            .unwrap_or(false)
    }

    fn references(&self, id: &ObjectId) -> bool {
        self.base == BaseTypeId::Relationship
            && [property_ids::SOURCE_ID, property_ids::TARGET_ID]
                .iter()
                .any(|p| self.properties.first_str(p) == Some(id.as_str()))
    }
}

/// Everything needed to create one object.
struct NewObject {
    base: BaseTypeId,
    properties: Properties,
    folder_id: Option<ObjectId>,
    content: Option<ContentStream>,
    versioning_state: Option<VersioningState>,
    policies: Vec<ObjectId>,
    acl: AclDelta,
}

struct RepositoryState {
    root_id: ObjectId,
    objects: HashMap<ObjectId, StoredObject>,
    types: HashMap<String, TypeSummary>,
    sequence: u64,
    offline: bool,
    denied_deletions: HashSet<ObjectId>,
    calls: Vec<&'static str>,
    last_extension: Option<Extension>,
}

/// An in-process CMIS repository.
///
/// Data lives in memory and is lost when the repository is dropped. Test
/// hooks allow simulating connectivity loss ([`Self::set_offline`]) and
/// undeletable objects ([`Self::deny_deletion`]), and expose the names of
/// all dispatched operations ([`Self::calls`]).
pub struct InMemoryRepository {
    repository_id: String,
    root_id: ObjectId,
    state: RwLock<RepositoryState>,
}

impl InMemoryRepository {
    /// Create a repository containing only the root folder and the base types.
    pub fn new(repository_id: impl Into<String>) -> Self {
        let root_id = ObjectId::generate();
        let mut state = RepositoryState {
            root_id: root_id.clone(),
            objects: HashMap::new(),
            types: HashMap::new(),
            sequence: 0,
            offline: false,
            denied_deletions: HashSet::new(),
            calls: Vec::new(),
            last_extension: None,
        };
        for base in BaseTypeId::ALL {
            let summary = TypeSummary::new(base.as_str(), *base);
            state.types.insert(summary.type_id.clone(), summary);
        }

        let token = state.next_token();
        let now = Utc::now();
        let properties = Properties::new()
            .with(property_ids::OBJECT_ID, PropertyValue::id(root_id.as_str()))
            .with(property_ids::BASE_TYPE_ID, PropertyValue::id(BaseTypeId::Folder.as_str()))
            .with(property_ids::OBJECT_TYPE_ID, PropertyValue::id(BaseTypeId::Folder.as_str()))
            .with(property_ids::NAME, PropertyValue::string(""))
            .with(property_ids::CREATION_DATE, PropertyValue::datetime(now))
            .with(property_ids::LAST_MODIFICATION_DATE, PropertyValue::datetime(now))
            .with(property_ids::CHANGE_TOKEN, PropertyValue::string(token.as_str()));
        state.objects.insert(
            root_id.clone(),
            StoredObject {
                id: root_id.clone(),
                base: BaseTypeId::Folder,
                properties,
                parents: Vec::new(),
                content: None,
                change_token: token,
                acl: Acl::new(),
                policies: Vec::new(),
                renditions: Vec::new(),
            },
        );

        Self {
            repository_id: repository_id.into(),
            root_id,
            state: RwLock::new(state),
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    /// Id of the root folder (path `/`).
    pub fn root_id(&self) -> &ObjectId {
        &self.root_id
    }

    /// Register (or replace) an object type.
    pub fn register_type(&self, summary: TypeSummary) {
        self.state
            .write()
            .expect("lock poisoned")
            .types
            .insert(summary.type_id.clone(), summary);
    }

    /// Attach a rendition stream to an object.
    pub fn add_rendition(
        &self,
        object_id: &ObjectId,
        rendition: Rendition,
        data: impl Into<Bytes>,
    ) -> TransportResult<()> {
        let mut state = self.write()?;
        let data = data.into();
        let rendition = Rendition {
            length: Some(data.len() as u64),
            ..rendition
        };
        state.get_mut(object_id)?.renditions.push((rendition, data));
        Ok(())
    }

    /// File an existing non-folder object in one more folder.
    pub fn file_in_folder(&self, object_id: &ObjectId, folder_id: &ObjectId) -> TransportResult<()> {
        let mut state = self.write()?;
        state.folder(folder_id)?;
        let obj = state.get(object_id)?;
        if obj.base == BaseTypeId::Folder {
            return Err(fault(FaultKind::NotSupported, "folders cannot be multi-filed"));
        }
        if obj.parents.contains(folder_id) {
            return Err(constraint(format!("{object_id} is already filed in {folder_id}")));
        }
        if let Some(name) = obj.name().map(str::to_string) {
            if state.name_taken(folder_id, &name, Some(object_id)) {
                return Err(constraint(format!(
                    "an object named {name:?} already exists in {folder_id}"
                )));
            }
        }
        state.get_mut(object_id)?.parents.push(folder_id.clone());
        state.touch(object_id)?;
        Ok(())
    }

    /// When offline, every call fails with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.state.write().expect("lock poisoned").offline = offline;
    }

    /// Make every future deletion of `object_id` fail with permission denied.
    pub fn deny_deletion(&self, object_id: ObjectId) {
        self.state
            .write()
            .expect("lock poisoned")
            .denied_deletions
            .insert(object_id);
    }

    /// Names of all operations dispatched so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.read().expect("lock poisoned").calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.read().expect("lock poisoned").calls.len()
    }

    /// The extension payload of the most recent request.
    pub fn last_request_extension(&self) -> Option<Extension> {
        self.state
            .read()
            .expect("lock poisoned")
            .last_extension
            .clone()
    }

    /// Returns `true` if an object with this id exists.
    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.state
            .read()
            .expect("lock poisoned")
            .objects
            .contains_key(object_id)
    }

    /// Number of stored objects, the root folder included.
    pub fn object_count(&self) -> usize {
        self.state.read().expect("lock poisoned").objects.len()
    }

    fn read(&self) -> TransportResult<RwLockReadGuard<'_, RepositoryState>> {
        self.state
            .read()
            .map_err(|e| fault(FaultKind::Runtime, format!("lock poisoned: {e}")))
    }

    fn write(&self) -> TransportResult<RwLockWriteGuard<'_, RepositoryState>> {
        self.state
            .write()
            .map_err(|e| fault(FaultKind::Runtime, format!("lock poisoned: {e}")))
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("repository_id", &self.repository_id)
            .field("object_count", &self.object_count())
            .finish()
    }
}

impl Transport for InMemoryRepository {
    fn invoke(&self, request: Request) -> TransportResult<Response> {
        let mut state = self.write()?;
        let name = request.operation.name();
        state.calls.push(name);
        state.last_extension = Some(request.extension.clone());

        if state.offline {
            return Err(TransportError::Connectivity(format!(
                "repository {} is unreachable",
                self.repository_id
            )));
        }
        if request.repository_id != self.repository_id {
            return Err(fault(
                FaultKind::InvalidArgument,
                format!("unknown repository {}", request.repository_id),
            ));
        }

        debug!(operation = name, repository = %self.repository_id, "in-memory dispatch");
        let result = state.apply(request.operation)?;
        Ok(Response::new(result).with_extension(request.extension))
    }
}

impl RepositoryMetadata for InMemoryRepository {
    fn type_summary(&self, type_id: &str) -> Option<TypeSummary> {
        self.read().ok()?.types.get(type_id).cloned()
    }
}

impl RepositoryState {
    fn apply(&mut self, operation: Operation) -> TransportResult<RawResult> {
        match operation {
            Operation::CreateDocument {
                properties,
                folder_id,
                content_stream,
                versioning_state,
                policies,
                acl,
            } => self
                .create(NewObject {
                    base: BaseTypeId::Document,
                    properties,
                    folder_id,
                    content: content_stream,
                    versioning_state: Some(versioning_state),
                    policies,
                    acl,
                })
                .map(RawResult::ObjectId),
            Operation::CreateDocumentFromSource {
                source_id,
                properties,
                folder_id,
                versioning_state,
                policies,
                acl,
            } => {
                let source = self.get(&source_id)?;
                if source.base != BaseTypeId::Document {
                    return Err(constraint(format!("source {source_id} is not a document")));
                }
                let mut merged = user_properties(&source.properties);
                merged.merge(&properties);
                let content = source.content.clone();
                self.create(NewObject {
                    base: BaseTypeId::Document,
                    properties: merged,
                    folder_id,
                    content,
                    versioning_state: Some(versioning_state),
                    policies,
                    acl,
                })
                .map(RawResult::ObjectId)
            }
            Operation::CreateFolder {
                properties,
                folder_id,
                policies,
                acl,
            } => self
                .create(NewObject {
                    base: BaseTypeId::Folder,
                    properties,
                    folder_id: Some(folder_id),
                    content: None,
                    versioning_state: None,
                    policies,
                    acl,
                })
                .map(RawResult::ObjectId),
            Operation::CreateItem {
                properties,
                folder_id,
                policies,
                acl,
            } => self
                .create(NewObject {
                    base: BaseTypeId::Item,
                    properties,
                    folder_id,
                    content: None,
                    versioning_state: None,
                    policies,
                    acl,
                })
                .map(RawResult::ObjectId),
            Operation::CreatePolicy {
                properties,
                folder_id,
                policies,
                acl,
            } => self
                .create(NewObject {
                    base: BaseTypeId::Policy,
                    properties,
                    folder_id,
                    content: None,
                    versioning_state: None,
                    policies,
                    acl,
                })
                .map(RawResult::ObjectId),
            Operation::CreateRelationship {
                properties,
                policies,
                acl,
            } => self
                .create(NewObject {
                    base: BaseTypeId::Relationship,
                    properties,
                    folder_id: None,
                    content: None,
                    versioning_state: None,
                    policies,
                    acl,
                })
                .map(RawResult::ObjectId),
            Operation::GetObject { object_id, read } => {
                let obj = self.get(&object_id)?;
                Ok(RawResult::Object(self.snapshot(obj, &read)))
            }
            Operation::GetObjectByPath { path, read } => {
                let obj = self.resolve_path(&path)?;
                Ok(RawResult::Object(self.snapshot(obj, &read)))
            }
            Operation::GetProperties { object_id, filter } => {
                let obj = self.get(&object_id)?;
                let properties = self.full_properties(obj);
                Ok(RawResult::Properties(match filter {
                    Some(filter) => properties.filtered(&filter),
                    None => properties,
                }))
            }
            Operation::GetAllowableActions { object_id } => {
                let obj = self.get(&object_id)?;
                Ok(RawResult::AllowableActions(self.allowable_actions(obj)))
            }
            Operation::GetContentStream {
                object_id,
                stream_id,
                offset,
                length,
            } => self.content_stream(&object_id, stream_id.as_deref(), offset, length),
            Operation::GetRenditions {
                object_id,
                rendition_filter,
                max_items,
                skip_count,
            } => self.renditions(&object_id, &rendition_filter, max_items, skip_count),
            Operation::UpdateProperties {
                object,
                properties,
                add_secondary_type_ids,
                remove_secondary_type_ids,
            } => self.update_properties(
                object,
                properties,
                add_secondary_type_ids,
                remove_secondary_type_ids,
            ),
            Operation::SetContentStream {
                object,
                content_stream,
                overwrite,
            } => self.set_content(object, content_stream, overwrite),
            Operation::AppendContentStream {
                object,
                content_stream,
                is_last_chunk,
            } => self.append_content(object, content_stream, is_last_chunk),
            Operation::DeleteContentStream { object } => self.delete_content(object),
            Operation::DeleteObject {
                object_id,
                all_versions,
            } => self.delete_object(&object_id, all_versions),
            Operation::MoveObject {
                object_id,
                target_folder_id,
                source_folder_id,
            } => self.move_object(&object_id, &target_folder_id, &source_folder_id),
            Operation::GetFolderTree { folder_id } => {
                let folder = self.get(&folder_id)?;
                if folder.base != BaseTypeId::Folder {
                    return Err(invalid(format!("{folder_id} is not a folder")));
                }
                let nodes = self
                    .children(&folder_id)
                    .into_iter()
                    .map(|child| self.tree_node(child))
                    .collect();
                Ok(RawResult::Tree(nodes))
            }
            Operation::RemoveObjectFromFolder {
                object_id,
                folder_id,
            } => self.remove_from_folder(&object_id, &folder_id),
        }
    }

    // ---- lookup helpers ----

    fn next_token(&mut self) -> ChangeToken {
        self.sequence += 1;
        ChangeToken::from_sequence(self.sequence)
    }

    fn get(&self, id: &ObjectId) -> TransportResult<&StoredObject> {
        self.objects
            .get(id)
            .ok_or_else(|| fault(FaultKind::ObjectNotFound, format!("object not found: {id}")))
    }

    fn get_mut(&mut self, id: &ObjectId) -> TransportResult<&mut StoredObject> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| fault(FaultKind::ObjectNotFound, format!("object not found: {id}")))
    }

    fn folder(&self, id: &ObjectId) -> TransportResult<&StoredObject> {
        let folder = self
            .objects
            .get(id)
            .ok_or_else(|| fault(FaultKind::FolderNotFound, format!("folder not found: {id}")))?;
        if folder.base != BaseTypeId::Folder {
            return Err(invalid(format!("{id} is not a folder")));
        }
        Ok(folder)
    }

    /// Children of a folder ordered by name.
    fn children(&self, folder_id: &ObjectId) -> Vec<&StoredObject> {
        let mut children: Vec<&StoredObject> = self
            .objects
            .values()
            .filter(|o| o.parents.contains(folder_id))
            .collect();
        children.sort_by(|a, b| a.name().cmp(&b.name()).then_with(|| a.id.cmp(&b.id)));
        children
    }

    fn name_taken(&self, folder_id: &ObjectId, name: &str, except: Option<&ObjectId>) -> bool {
        self.objects.values().any(|o| {
            o.parents.contains(folder_id) && o.name() == Some(name) && Some(&o.id) != except
        })
    }

    /// Returns `true` if `folder` is `ancestor` or lies beneath it.
    fn is_within(&self, folder: &ObjectId, ancestor: &ObjectId) -> bool {
        let mut current = self.objects.get(folder);
        while let Some(obj) = current {
            if &obj.id == ancestor {
                return true;
            }
            current = obj.parents.first().and_then(|p| self.objects.get(p));
        }
        false
    }

    fn path_of(&self, folder: &StoredObject) -> String {
        let mut segments = Vec::new();
        let mut current = folder;
        while current.id != self.root_id {
            segments.push(current.name().unwrap_or_default().to_string());
            match current.parents.first().and_then(|p| self.objects.get(p)) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn resolve_path(&self, path: &str) -> TransportResult<&StoredObject> {
        if !path.starts_with('/') {
            return Err(invalid(format!("path must be absolute: {path:?}")));
        }
        let not_found = || fault(FaultKind::ObjectNotFound, format!("no object at path {path}"));
        let mut current = self.get(&self.root_id)?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if current.base != BaseTypeId::Folder {
                return Err(not_found());
            }
            current = self
                .children(&current.id)
                .into_iter()
                .find(|c| c.name() == Some(segment))
                .ok_or_else(not_found)?;
        }
        Ok(current)
    }

    fn content_rule(&self, obj: &StoredObject) -> ContentStreamAllowed {
        obj.properties
            .object_type_id()
            .and_then(|t| self.types.get(t))
            .map(|t| t.content_stream_allowed)
            .unwrap_or_default()
    }

    fn check_token(obj: &StoredObject, supplied: &ObjectRef) -> TransportResult<()> {
        match &supplied.change_token {
            Some(token) if *token != obj.change_token => Err(fault(
                FaultKind::UpdateConflict,
                format!(
                    "change token {token} is stale for {}; current token is {}",
                    obj.id, obj.change_token
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Issue a fresh change token for `id`.
    fn touch(&mut self, id: &ObjectId) -> TransportResult<ChangeToken> {
        let token = self.next_token();
        let obj = self.get_mut(id)?;
        obj.change_token = token.clone();
        obj.properties
            .insert(property_ids::CHANGE_TOKEN, PropertyValue::string(token.as_str()));
        obj.properties.insert(
            property_ids::LAST_MODIFICATION_DATE,
            PropertyValue::datetime(Utc::now()),
        );
        Ok(token)
    }

    fn ack(id: &ObjectId, token: ChangeToken) -> RawResult {
        RawResult::Updated(MutationAck {
            object_id: Some(id.clone()),
            change_token: Some(token),
        })
    }

    // ---- creation ----

    fn create(&mut self, new: NewObject) -> TransportResult<ObjectId> {
        let type_id = new
            .properties
            .object_type_id()
            .ok_or_else(|| invalid("cmis:objectTypeId is required"))?
            .to_string();
        let summary = self
            .types
            .get(&type_id)
            .cloned()
            .ok_or_else(|| constraint(format!("unknown object type {type_id}")))?;
        if summary.base_type != new.base {
            return Err(constraint(format!(
                "type {type_id} is not a {} type",
                new.base
            )));
        }
        if !summary.creatable {
            return Err(constraint(format!("type {type_id} is not creatable")));
        }
        for id in new.properties.ids() {
            if id != property_ids::OBJECT_TYPE_ID && SYSTEM_PROPERTIES.contains(&id) {
                return Err(constraint(format!("property {id} is read-only")));
            }
        }

        let name = new.properties.name().map(str::to_string);
        if new.base.is_fileable() && name.as_deref().map_or(true, str::is_empty) {
            return Err(invalid("cmis:name is required"));
        }

        let mut inherited = Acl::new();
        if let Some(folder_id) = &new.folder_id {
            let folder = self.folder(folder_id)?;
            if !summary.fileable {
                return Err(constraint(format!("type {type_id} is not fileable")));
            }
            if let Some(name) = &name {
                if self.name_taken(folder_id, name, None) {
                    return Err(constraint(format!(
                        "an object named {name:?} already exists in {folder_id}"
                    )));
                }
            }
            inherited = folder.acl.clone();
        }

        match (&new.content, summary.content_stream_allowed) {
            (Some(_), ContentStreamAllowed::NotAllowed) => {
                return Err(constraint(format!("type {type_id} does not allow content")))
            }
            (None, ContentStreamAllowed::Required) if new.base == BaseTypeId::Document => {
                return Err(constraint(format!("type {type_id} requires content")))
            }
            _ => {}
        }
        if let Some(content) = &new.content {
            content.validate().map_err(|e| invalid(e.to_string()))?;
        }

        for policy in &new.policies {
            match self.objects.get(policy) {
                Some(p) if p.base == BaseTypeId::Policy => {}
                _ => return Err(constraint(format!("{policy} is not a policy"))),
            }
        }

        if new.base == BaseTypeId::Relationship {
            for endpoint in [property_ids::SOURCE_ID, property_ids::TARGET_ID] {
                let value = new
                    .properties
                    .first_str(endpoint)
                    .ok_or_else(|| invalid(format!("{endpoint} is required")))?;
                let endpoint_id = ObjectId::new(value).map_err(|e| invalid(e.to_string()))?;
                if !self.objects.contains_key(&endpoint_id) {
                    return Err(constraint(format!("{endpoint} {endpoint_id} does not exist")));
                }
            }
        }

        let id = ObjectId::generate();
        let now = Utc::now();
        let mut properties = new.properties;
        properties.insert(property_ids::OBJECT_ID, PropertyValue::id(id.as_str()));
        properties.insert(property_ids::BASE_TYPE_ID, PropertyValue::id(new.base.as_str()));
        properties.insert(property_ids::CREATION_DATE, PropertyValue::datetime(now));
        if let Some(state) = new.versioning_state {
            versioning_properties(&summary, state, &mut properties)?;
        }
        set_content_properties(&mut properties, new.content.as_ref());

        let token = self.next_token();
        properties.insert(property_ids::CHANGE_TOKEN, PropertyValue::string(token.as_str()));
        properties.insert(property_ids::LAST_MODIFICATION_DATE, PropertyValue::datetime(now));

        let mut seen = HashSet::new();
        let policies: Vec<ObjectId> = new
            .policies
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();

        self.objects.insert(
            id.clone(),
            StoredObject {
                id: id.clone(),
                base: new.base,
                properties,
                parents: new.folder_id.into_iter().collect(),
                content: new.content,
                change_token: token,
                acl: new.acl.apply(&inherited),
                policies,
                renditions: Vec::new(),
            },
        );
        Ok(id)
    }

    // ---- reads ----

    fn full_properties(&self, obj: &StoredObject) -> Properties {
        let mut properties = obj.properties.clone();
        if obj.base == BaseTypeId::Folder {
            properties.insert(property_ids::PATH, PropertyValue::string(self.path_of(obj)));
            if let Some(parent) = obj.parents.first() {
                properties.insert(property_ids::PARENT_ID, PropertyValue::id(parent.as_str()));
            }
        }
        properties
    }

    fn snapshot(&self, obj: &StoredObject, read: &ObjectReadRequest) -> ObjectData {
        let properties = self.full_properties(obj);
        ObjectData {
            properties: match &read.filter {
                Some(filter) => properties.filtered(filter),
                None => properties,
            },
            allowable_actions: read
                .include_allowable_actions
                .then(|| self.allowable_actions(obj)),
            relationships: self.relationships_of(&obj.id, read.include_relationships),
            renditions: obj
                .renditions
                .iter()
                .map(|(r, _)| r)
                .filter(|r| read.rendition_filter.matches(r))
                .cloned()
                .collect(),
            policy_ids: read.include_policy_ids.then(|| obj.policies.clone()),
            acl: read.include_acl.then(|| obj.acl.clone()),
            extension: Extension::none(),
        }
    }

    fn relationships_of(&self, id: &ObjectId, mode: IncludeRelationships) -> Vec<ObjectData> {
        if mode == IncludeRelationships::None {
            return Vec::new();
        }
        let mut relationships: Vec<&StoredObject> = self
            .objects
            .values()
            .filter(|o| o.base == BaseTypeId::Relationship)
            .filter(|o| {
                let is_source = o.properties.first_str(property_ids::SOURCE_ID) == Some(id.as_str());
                let is_target = o.properties.first_str(property_ids::TARGET_ID) == Some(id.as_str());
                mode.includes(is_source, is_target)
            })
            .collect();
        relationships.sort_by(|a, b| a.id.cmp(&b.id));
        relationships
            .into_iter()
            .map(|r| self.snapshot(r, &ObjectReadRequest::default()))
            .collect()
    }

    fn allowable_actions(&self, obj: &StoredObject) -> AllowableActions {
        let is_root = obj.id == self.root_id;
        let mut actions = vec![
            Action::GetProperties,
            Action::UpdateProperties,
            Action::GetObjectRelationships,
            Action::ApplyPolicy,
            Action::GetAppliedPolicies,
            Action::RemovePolicy,
            Action::GetAcl,
            Action::ApplyAcl,
        ];
        if !is_root && !self.denied_deletions.contains(&obj.id) {
            actions.push(Action::DeleteObject);
        }
        if obj.base.is_fileable() && !is_root {
            actions.extend([Action::GetObjectParents, Action::AddObjectToFolder]);
            if !obj.parents.is_empty() {
                actions.extend([Action::MoveObject, Action::RemoveObjectFromFolder]);
            }
        }
        match obj.base {
            BaseTypeId::Document => {
                actions.extend([
                    Action::SetContentStream,
                    Action::GetAllVersions,
                    Action::GetRenditions,
                ]);
                if obj.content.is_some() {
                    actions.extend([Action::GetContentStream, Action::DeleteContentStream]);
                }
                if obj.version_series().is_some() {
                    if obj.is_checked_out() {
                        actions.extend([Action::CancelCheckOut, Action::CheckIn]);
                    } else {
                        actions.push(Action::CheckOut);
                    }
                }
            }
            BaseTypeId::Folder => {
                actions.extend([
                    Action::GetChildren,
                    Action::GetDescendants,
                    Action::GetFolderTree,
                    Action::CreateDocument,
                    Action::CreateFolder,
                    Action::CreateItem,
                    Action::CreateRelationship,
                    Action::DeleteTree,
                ]);
                if !is_root {
                    actions.push(Action::GetFolderParent);
                }
            }
            _ => {}
        }
        AllowableActions::new(actions)
    }

    fn content_stream(
        &self,
        object_id: &ObjectId,
        stream_id: Option<&str>,
        offset: Option<u64>,
        length: Option<u64>,
    ) -> TransportResult<RawResult> {
        let obj = self.get(object_id)?;
        let stream = match stream_id {
            Some(stream_id) => obj
                .renditions
                .iter()
                .find(|(r, _)| r.stream_id == stream_id)
                .map(|(r, data)| ContentStream::new(r.mime_type.clone(), data.clone()))
                .ok_or_else(|| constraint(format!("{object_id} has no stream {stream_id}")))?,
            None => obj
                .content
                .clone()
                .ok_or_else(|| constraint(format!("{object_id} has no content stream")))?,
        };
        Ok(RawResult::ContentStream(stream.slice(offset, length)))
    }

    fn renditions(
        &self,
        object_id: &ObjectId,
        filter: &RenditionFilter,
        max_items: Option<u64>,
        skip_count: Option<u64>,
    ) -> TransportResult<RawResult> {
        let obj = self.get(object_id)?;
        let skip = skip_count.map_or(0, |s| usize::try_from(s).unwrap_or(usize::MAX));
        let take = max_items.map_or(usize::MAX, |m| usize::try_from(m).unwrap_or(usize::MAX));
        let renditions = obj
            .renditions
            .iter()
            .map(|(r, _)| r)
            .filter(|r| filter.matches(r))
            .skip(skip)
            .take(take)
            .cloned()
            .collect();
        Ok(RawResult::Renditions(renditions))
    }

    fn tree_node(&self, obj: &StoredObject) -> TreeNode {
        let children = if obj.base == BaseTypeId::Folder {
            self.children(&obj.id)
                .into_iter()
                .map(|child| self.tree_node(child))
                .collect()
        } else {
            Vec::new()
        };
        TreeNode {
            object_id: obj.id.clone(),
            base_type: obj.base,
            parent_ids: obj.parents.clone(),
            children,
        }
    }

    // ---- mutations ----

    fn update_properties(
        &mut self,
        object: ObjectRef,
        properties: Properties,
        add_secondary: Vec<String>,
        remove_secondary: Vec<String>,
    ) -> TransportResult<RawResult> {
        let obj = self.get(&object.id)?;
        Self::check_token(obj, &object)?;
        for id in properties.ids() {
            if SYSTEM_PROPERTIES.contains(&id) {
                return Err(constraint(format!("property {id} is read-only")));
            }
        }
        if let Some(name) = properties.name() {
            if name.is_empty() && obj.base.is_fileable() {
                return Err(invalid("cmis:name must not be empty"));
            }
            for parent in &obj.parents {
                if self.name_taken(parent, name, Some(&obj.id)) {
                    return Err(constraint(format!(
                        "an object named {name:?} already exists in {parent}"
                    )));
                }
            }
        }

        let changes_secondary = !add_secondary.is_empty() || !remove_secondary.is_empty();
        let mut secondary: Vec<String> = obj
            .properties
            .get(property_ids::SECONDARY_OBJECT_TYPE_IDS)
            .map(|v| v.strings().to_vec())
            .unwrap_or_default();
        secondary.retain(|t| !remove_secondary.contains(t));
        for type_id in add_secondary {
            match self.types.get(&type_id) {
                Some(t) if t.base_type == BaseTypeId::Secondary => {
                    if !secondary.contains(&type_id) {
                        secondary.push(type_id);
                    }
                }
                _ => return Err(constraint(format!("{type_id} is not a secondary type"))),
            }
        }

        let id = obj.id.clone();
        let stored = self.get_mut(&id)?;
        stored.properties.merge(&properties);
        if changes_secondary {
            if secondary.is_empty() {
                stored.properties.remove(property_ids::SECONDARY_OBJECT_TYPE_IDS);
            } else {
                stored.properties.insert(
                    property_ids::SECONDARY_OBJECT_TYPE_IDS,
                    PropertyValue::Id(secondary),
                );
            }
        }
        let token = self.touch(&id)?;
        Ok(Self::ack(&id, token))
    }

    /// Shared preconditions for content mutations; returns the object's id.
    fn content_target(&self, object: &ObjectRef) -> TransportResult<ObjectId> {
        let obj = self.get(&object.id)?;
        if obj.base != BaseTypeId::Document {
            return Err(constraint(format!("{} is not a document", obj.id)));
        }
        Self::check_token(obj, object)?;
        Ok(obj.id.clone())
    }

    fn set_content(
        &mut self,
        object: ObjectRef,
        content: ContentStream,
        overwrite: bool,
    ) -> TransportResult<RawResult> {
        let id = self.content_target(&object)?;
        let obj = self.get(&id)?;
        if self.content_rule(obj) == ContentStreamAllowed::NotAllowed {
            return Err(constraint(format!("{id} does not allow content")));
        }
        if obj.content.is_some() && !overwrite {
            return Err(constraint(format!("{id} already has a content stream")));
        }
        content.validate().map_err(|e| invalid(e.to_string()))?;

        let stored = self.get_mut(&id)?;
        stored.content = Some(content);
        set_content_properties(&mut stored.properties, stored.content.as_ref());
        let token = self.touch(&id)?;
        Ok(Self::ack(&id, token))
    }

    fn append_content(
        &mut self,
        object: ObjectRef,
        chunk: ContentStream,
        is_last_chunk: bool,
    ) -> TransportResult<RawResult> {
        let id = self.content_target(&object)?;
        if self.content_rule(self.get(&id)?) == ContentStreamAllowed::NotAllowed {
            return Err(constraint(format!("{id} does not allow content")));
        }
        chunk.validate().map_err(|e| invalid(e.to_string()))?;

        let stored = self.get_mut(&id)?;
        let combined = match stored.content.take() {
            Some(existing) => {
                let mut buf = BytesMut::with_capacity(existing.data.len() + chunk.data.len());
                buf.extend_from_slice(&existing.data);
                buf.extend_from_slice(&chunk.data);
                let data = buf.freeze();
                ContentStream {
                    filename: existing.filename.or(chunk.filename),
                    mime_type: existing.mime_type,
                    declared_length: Some(data.len() as u64),
                    data,
                }
            }
            None => chunk,
        };
        debug!(object = %id, length = combined.len(), is_last_chunk, "appended chunk");
        stored.content = Some(combined);
        set_content_properties(&mut stored.properties, stored.content.as_ref());
        let token = self.touch(&id)?;
        Ok(Self::ack(&id, token))
    }

    fn delete_content(&mut self, object: ObjectRef) -> TransportResult<RawResult> {
        let id = self.content_target(&object)?;
        if self.content_rule(self.get(&id)?) == ContentStreamAllowed::Required {
            return Err(constraint(format!("{id} requires a content stream")));
        }
        let stored = self.get_mut(&id)?;
        stored.content = None;
        set_content_properties(&mut stored.properties, None);
        let token = self.touch(&id)?;
        Ok(Self::ack(&id, token))
    }

    fn delete_object(&mut self, id: &ObjectId, all_versions: bool) -> TransportResult<RawResult> {
        let obj = self.get(id)?;
        if *id == self.root_id {
            return Err(constraint("the root folder cannot be deleted"));
        }
        if self.denied_deletions.contains(id) {
            return Err(fault(
                FaultKind::PermissionDenied,
                format!("deletion of {id} is not permitted"),
            ));
        }
        if obj.base == BaseTypeId::Folder && !self.children(id).is_empty() {
            return Err(constraint(format!("folder {id} is not empty")));
        }

        let victims: Vec<ObjectId> = match (all_versions, obj.version_series()) {
            (true, Some(series)) => self
                .objects
                .values()
                .filter(|o| o.version_series() == Some(series))
                .map(|o| o.id.clone())
                .collect(),
            _ => vec![id.clone()],
        };
        for victim in &victims {
            self.objects.remove(victim);
        }
        self.objects
            .retain(|_, o| !victims.iter().any(|v| o.references(v)));
        for obj in self.objects.values_mut() {
            obj.policies.retain(|p| !victims.contains(p));
        }
        Ok(RawResult::Done)
    }

    fn move_object(
        &mut self,
        id: &ObjectId,
        target: &ObjectId,
        source: &ObjectId,
    ) -> TransportResult<RawResult> {
        self.folder(target)?;
        self.folder(source)?;
        let obj = self.get(id)?;
        if !obj.parents.contains(source) {
            return Err(invalid(format!("{id} is not filed in {source}")));
        }
        if obj.base == BaseTypeId::Folder && self.is_within(target, id) {
            return Err(constraint(format!("cannot move folder {id} beneath itself")));
        }
        if let Some(name) = obj.name() {
            if self.name_taken(target, name, Some(id)) {
                return Err(constraint(format!(
                    "an object named {name:?} already exists in {target}"
                )));
            }
        }

        let stored = self.get_mut(id)?;
        stored.parents.retain(|p| p != source);
        if !stored.parents.contains(target) {
            stored.parents.push(target.clone());
        }
        let token = self.touch(id)?;
        Ok(Self::ack(id, token))
    }

    fn remove_from_folder(
        &mut self,
        id: &ObjectId,
        folder_id: &ObjectId,
    ) -> TransportResult<RawResult> {
        self.folder(folder_id)?;
        let obj = self.get(id)?;
        if obj.base == BaseTypeId::Folder {
            return Err(fault(FaultKind::NotSupported, "folders cannot be unfiled"));
        }
        if !obj.parents.contains(folder_id) {
            return Err(invalid(format!("{id} is not filed in {folder_id}")));
        }
        self.get_mut(id)?.parents.retain(|p| p != folder_id);
        let token = self.touch(id)?;
        Ok(Self::ack(id, token))
    }
}

/// A copy of `properties` without repository-maintained entries.
fn user_properties(properties: &Properties) -> Properties {
    properties
        .iter()
        .filter(|(id, _)| *id == property_ids::OBJECT_TYPE_ID || !SYSTEM_PROPERTIES.contains(id))
        .map(|(id, v)| (id.to_string(), v.clone()))
        .collect()
}

fn versioning_properties(
    summary: &TypeSummary,
    state: VersioningState,
    properties: &mut Properties,
) -> TransportResult<()> {
    let (label, major, checked_out) = match (summary.versionable, state) {
        (false, VersioningState::None) => return Ok(()),
        (false, _) => {
            return Err(constraint(format!(
                "type {} is not versionable; versioning state must be none",
                summary.type_id
            )))
        }
        (true, VersioningState::None) => {
            return Err(constraint(format!(
                "type {} is versionable; versioning state none is not allowed",
                summary.type_id
            )))
        }
        (true, VersioningState::Major) => ("1.0", true, false),
        (true, VersioningState::Minor) => ("0.1", false, false),
        (true, VersioningState::CheckedOut) => ("pwc", false, true),
    };
    let series = ObjectId::generate();
    properties.insert(property_ids::VERSION_SERIES_ID, PropertyValue::id(series.as_str()));
    properties.insert(property_ids::VERSION_LABEL, PropertyValue::string(label));
    properties.insert(property_ids::IS_MAJOR_VERSION, PropertyValue::boolean(major));
    properties.insert(property_ids::IS_LATEST_VERSION, PropertyValue::boolean(true));
    properties.insert(
        property_ids::IS_VERSION_SERIES_CHECKED_OUT,
        PropertyValue::boolean(checked_out),
    );
    Ok(())
}

fn set_content_properties(properties: &mut Properties, content: Option<&ContentStream>) {
    match content {
        Some(content) => {
            let length = i64::try_from(content.len()).unwrap_or(i64::MAX);
            properties.insert(property_ids::CONTENT_STREAM_LENGTH, PropertyValue::integer(length));
            properties.insert(
                property_ids::CONTENT_STREAM_MIME_TYPE,
                PropertyValue::string(content.mime_type.clone()),
            );
            match &content.filename {
                Some(name) => {
                    properties.insert(
                        property_ids::CONTENT_STREAM_FILE_NAME,
                        PropertyValue::string(name.clone()),
                    );
                }
                None => {
                    properties.remove(property_ids::CONTENT_STREAM_FILE_NAME);
                }
            }
        }
        None => {
            properties.remove(property_ids::CONTENT_STREAM_LENGTH);
            properties.remove(property_ids::CONTENT_STREAM_MIME_TYPE);
            properties.remove(property_ids::CONTENT_STREAM_FILE_NAME);
        }
    }
}
