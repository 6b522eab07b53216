use serde::{Deserialize, Serialize};

use cmis_types::{
    AclDelta, ContentStream, Extension, IncludeRelationships, ObjectId, ObjectRef, Properties,
    PropertyFilter, RenditionFilter, VersioningState,
};

/// Fully resolved read parameters for `getObject` / `getObjectByPath`.
///
/// Every field carries a concrete value; defaults have already been applied
/// by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReadRequest {
    /// `None` asks for the repository's default property set.
    pub filter: Option<PropertyFilter>,
    pub include_allowable_actions: bool,
    pub include_relationships: IncludeRelationships,
    pub rendition_filter: RenditionFilter,
    pub include_policy_ids: bool,
    pub include_acl: bool,
}

impl Default for ObjectReadRequest {
    fn default() -> Self {
        Self {
            filter: None,
            include_allowable_actions: false,
            include_relationships: IncludeRelationships::DEFAULT,
            rendition_filter: RenditionFilter::None,
            include_policy_ids: false,
            include_acl: false,
        }
    }
}

/// Every operation the object service can ask a repository to perform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    CreateDocument {
        properties: Properties,
        folder_id: Option<ObjectId>,
        content_stream: Option<ContentStream>,
        versioning_state: VersioningState,
        policies: Vec<ObjectId>,
        acl: AclDelta,
    },
    CreateDocumentFromSource {
        source_id: ObjectId,
        properties: Properties,
        folder_id: Option<ObjectId>,
        versioning_state: VersioningState,
        policies: Vec<ObjectId>,
        acl: AclDelta,
    },
    CreateFolder {
        properties: Properties,
        folder_id: ObjectId,
        policies: Vec<ObjectId>,
        acl: AclDelta,
    },
    CreateItem {
        properties: Properties,
        folder_id: Option<ObjectId>,
        policies: Vec<ObjectId>,
        acl: AclDelta,
    },
    CreatePolicy {
        properties: Properties,
        folder_id: Option<ObjectId>,
        policies: Vec<ObjectId>,
        acl: AclDelta,
    },
    CreateRelationship {
        properties: Properties,
        policies: Vec<ObjectId>,
        acl: AclDelta,
    },
    GetObject {
        object_id: ObjectId,
        read: ObjectReadRequest,
    },
    GetObjectByPath {
        path: String,
        read: ObjectReadRequest,
    },
    GetProperties {
        object_id: ObjectId,
        filter: Option<PropertyFilter>,
    },
    GetAllowableActions {
        object_id: ObjectId,
    },
    GetContentStream {
        object_id: ObjectId,
        stream_id: Option<String>,
        offset: Option<u64>,
        length: Option<u64>,
    },
    GetRenditions {
        object_id: ObjectId,
        rendition_filter: RenditionFilter,
        max_items: Option<u64>,
        skip_count: Option<u64>,
    },
    UpdateProperties {
        object: ObjectRef,
        properties: Properties,
        add_secondary_type_ids: Vec<String>,
        remove_secondary_type_ids: Vec<String>,
    },
    SetContentStream {
        object: ObjectRef,
        content_stream: ContentStream,
        overwrite: bool,
    },
    AppendContentStream {
        object: ObjectRef,
        content_stream: ContentStream,
        is_last_chunk: bool,
    },
    DeleteContentStream {
        object: ObjectRef,
    },
    DeleteObject {
        object_id: ObjectId,
        all_versions: bool,
    },
    MoveObject {
        object_id: ObjectId,
        target_folder_id: ObjectId,
        source_folder_id: ObjectId,
    },
    /// Snapshot of a folder's descendant structure, used to plan recursive
    /// deletion.
    GetFolderTree {
        folder_id: ObjectId,
    },
    /// Remove an object from one folder without deleting it.
    RemoveObjectFromFolder {
        object_id: ObjectId,
        folder_id: ObjectId,
    },
}

impl Operation {
    /// Stable operation name, as used in logs and by bindings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateDocument { .. } => "createDocument",
            Self::CreateDocumentFromSource { .. } => "createDocumentFromSource",
            Self::CreateFolder { .. } => "createFolder",
            Self::CreateItem { .. } => "createItem",
            Self::CreatePolicy { .. } => "createPolicy",
            Self::CreateRelationship { .. } => "createRelationship",
            Self::GetObject { .. } => "getObject",
            Self::GetObjectByPath { .. } => "getObjectByPath",
            Self::GetProperties { .. } => "getProperties",
            Self::GetAllowableActions { .. } => "getAllowableActions",
            Self::GetContentStream { .. } => "getContentStream",
            Self::GetRenditions { .. } => "getRenditions",
            Self::UpdateProperties { .. } => "updateProperties",
            Self::SetContentStream { .. } => "setContentStream",
            Self::AppendContentStream { .. } => "appendContentStream",
            Self::DeleteContentStream { .. } => "deleteContentStream",
            Self::DeleteObject { .. } => "deleteObject",
            Self::MoveObject { .. } => "moveObject",
            Self::GetFolderTree { .. } => "getFolderTree",
            Self::RemoveObjectFromFolder { .. } => "removeObjectFromFolder",
        }
    }

    /// Returns `true` if the operation changes repository state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::GetObject { .. }
                | Self::GetObjectByPath { .. }
                | Self::GetProperties { .. }
                | Self::GetAllowableActions { .. }
                | Self::GetContentStream { .. }
                | Self::GetRenditions { .. }
                | Self::GetFolderTree { .. }
        )
    }
}

/// One call to a repository: the target repository, the operation, and the
/// caller's extension payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub repository_id: String,
    pub operation: Operation,
    pub extension: Extension,
}

impl Request {
    pub fn new(repository_id: impl Into<String>, operation: Operation, extension: Extension) -> Self {
        Self {
            repository_id: repository_id.into(),
            operation,
            extension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    #[test]
    fn names_are_unique() {
        let ops = vec![
            Operation::GetAllowableActions { object_id: id("a") },
            Operation::DeleteObject { object_id: id("a"), all_versions: true },
            Operation::GetFolderTree { folder_id: id("f") },
            Operation::RemoveObjectFromFolder { object_id: id("a"), folder_id: id("f") },
            Operation::DeleteContentStream { object: ObjectRef::untracked(id("a")) },
        ];
        let mut names: Vec<&str> = ops.iter().map(Operation::name).collect();
        let len = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), len);
    }

    #[test]
    fn reads_are_not_mutations() {
        assert!(!Operation::GetFolderTree { folder_id: id("f") }.is_mutation());
        assert!(Operation::DeleteObject { object_id: id("a"), all_versions: false }.is_mutation());
    }

    #[test]
    fn default_read_request_uses_named_defaults() {
        let read = ObjectReadRequest::default();
        assert_eq!(read.include_relationships, IncludeRelationships::None);
        assert_eq!(read.rendition_filter, RenditionFilter::None);
        assert!(read.filter.is_none());
    }

    #[test]
    fn request_serializes() {
        let req = Request::new(
            "repo",
            Operation::GetProperties { object_id: id("D1"), filter: None },
            Extension::new(vec![1u8, 2, 3]),
        );
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }
}
