use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

macro_rules! actions {
    ($($variant:ident => $wire:tt),+ $(,)?) => {
        /// An action a caller may be allowed to perform on an object.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Action {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl Action {
            pub const ALL: &'static [Action] = &[$(Action::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }
    };
}

actions! {
    DeleteObject => "canDeleteObject",
    UpdateProperties => "canUpdateProperties",
    GetFolderTree => "canGetFolderTree",
    GetProperties => "canGetProperties",
    GetObjectRelationships => "canGetObjectRelationships",
    GetObjectParents => "canGetObjectParents",
    GetFolderParent => "canGetFolderParent",
    GetDescendants => "canGetDescendants",
    MoveObject => "canMoveObject",
    DeleteContentStream => "canDeleteContentStream",
    CheckOut => "canCheckOut",
    CancelCheckOut => "canCancelCheckOut",
    CheckIn => "canCheckIn",
    SetContentStream => "canSetContentStream",
    GetAllVersions => "canGetAllVersions",
    AddObjectToFolder => "canAddObjectToFolder",
    RemoveObjectFromFolder => "canRemoveObjectFromFolder",
    GetContentStream => "canGetContentStream",
    ApplyPolicy => "canApplyPolicy",
    GetAppliedPolicies => "canGetAppliedPolicies",
    RemovePolicy => "canRemovePolicy",
    GetChildren => "canGetChildren",
    CreateDocument => "canCreateDocument",
    CreateFolder => "canCreateFolder",
    CreateRelationship => "canCreateRelationship",
    CreateItem => "canCreateItem",
    DeleteTree => "canDeleteTree",
    GetRenditions => "canGetRenditions",
    GetAcl => "canGetACL",
    ApplyAcl => "canApplyACL",
}

/// Read-only snapshot of the actions a caller may currently perform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowableActions {
    actions: BTreeSet<Action>,
}

impl AllowableActions {
    pub fn new<I: IntoIterator<Item = Action>>(actions: I) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.actions.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
