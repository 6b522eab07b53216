use serde::{Deserialize, Serialize};

use crate::acl::Acl;
use crate::actions::AllowableActions;
use crate::content::Rendition;
use crate::extension::Extension;
use crate::id::{ChangeToken, ObjectId, ObjectRef};
use crate::kinds::BaseTypeId;
use crate::property::{property_ids, Properties};

/// Immutable snapshot of an object as returned by a read.
///
/// Optional parts are only populated when the read asked for them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    pub properties: Properties,
    pub allowable_actions: Option<AllowableActions>,
    pub relationships: Vec<ObjectData>,
    pub renditions: Vec<Rendition>,
    pub policy_ids: Option<Vec<ObjectId>>,
    pub acl: Option<Acl>,
    pub extension: Extension,
}

impl ObjectData {
    pub fn new(properties: Properties) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    /// The `cmis:objectId` value, if selected by the read's filter.
    pub fn id(&self) -> Option<ObjectId> {
        self.properties
            .first_str(property_ids::OBJECT_ID)
            .and_then(|s| ObjectId::new(s).ok())
    }

    pub fn base_type(&self) -> Option<BaseTypeId> {
        self.properties
            .first_str(property_ids::BASE_TYPE_ID)
            .and_then(|s| s.parse().ok())
    }

    pub fn change_token(&self) -> Option<ChangeToken> {
        self.properties
            .first_str(property_ids::CHANGE_TOKEN)
            .and_then(|s| ChangeToken::new(s).ok())
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.name()
    }

    /// The concurrency pair observed in this snapshot.
    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.id().map(|id| ObjectRef {
            id,
            change_token: self.change_token(),
        })
    }
}
