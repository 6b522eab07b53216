use serde::{Deserialize, Serialize};

use cmis_types::{
    AllowableActions, BaseTypeId, ChangeToken, ContentStream, Extension, ObjectData, ObjectId,
    Properties, Rendition,
};

/// What a repository reports after a successful mutation.
///
/// Either part may be absent: a repository that keeps ids stable need not
/// echo the id, and a repository without change tokens never sends one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAck {
    pub object_id: Option<ObjectId>,
    pub change_token: Option<ChangeToken>,
}

/// One node of a folder-tree snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub object_id: ObjectId,
    pub base_type: BaseTypeId,
    /// Every folder the object is filed in, inside the snapshot or not.
    pub parent_ids: Vec<ObjectId>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.base_type == BaseTypeId::Folder
    }

    pub fn parent_count(&self) -> usize {
        self.parent_ids.len()
    }

    /// Ids of this node and all of its descendants, depth first.
    pub fn subtree_ids(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.object_id.clone()];
        for child in &self.children {
            ids.extend(child.subtree_ids());
        }
        ids
    }
}

/// The decoded payload of a repository response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RawResult {
    ObjectId(ObjectId),
    Object(ObjectData),
    Properties(Properties),
    AllowableActions(AllowableActions),
    ContentStream(ContentStream),
    Renditions(Vec<Rendition>),
    Updated(MutationAck),
    Tree(Vec<TreeNode>),
    Done,
}

impl RawResult {
    /// Shape name, used when reporting an unexpected response.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ObjectId(_) => "objectId",
            Self::Object(_) => "object",
            Self::Properties(_) => "properties",
            Self::AllowableActions(_) => "allowableActions",
            Self::ContentStream(_) => "contentStream",
            Self::Renditions(_) => "renditions",
            Self::Updated(_) => "updated",
            Self::Tree(_) => "tree",
            Self::Done => "done",
        }
    }
}

/// A repository response: the result plus the response extension payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub result: RawResult,
    pub extension: Extension,
}

impl Response {
    pub fn new(result: RawResult) -> Self {
        Self {
            result,
            extension: Extension::none(),
        }
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }
}
