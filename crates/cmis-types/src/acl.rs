//! Access control entries, lists, and add/remove change sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A single access control entry: a principal and the permissions granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ace {
    pub principal: String,
    pub permissions: BTreeSet<String>,
    /// `false` when the entry is inherited rather than set on the object.
    pub direct: bool,
}

impl Ace {
    pub fn new<I, S>(principal: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principal: principal.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            direct: true,
        }
    }
}

/// An access control list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub aces: Vec<Ace>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_aces(aces: Vec<Ace>) -> Self {
        Self { aces }
    }

    pub fn is_empty(&self) -> bool {
        self.aces.is_empty()
    }

    /// Union of the permissions granted to `principal` across all entries.
    pub fn permissions_of(&self, principal: &str) -> BTreeSet<String> {
        self.aces
            .iter()
            .filter(|ace| ace.principal == principal)
            .flat_map(|ace| ace.permissions.iter().cloned())
            .collect()
    }

    /// Merge entries with the same principal and drop entries that grant
    /// nothing. The result is sorted by principal.
    pub fn normalized(&self) -> Acl {
        Acl::from_map(self.to_map())
    }

    fn to_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for ace in &self.aces {
            map.entry(ace.principal.clone())
                .or_default()
                .extend(ace.permissions.iter().cloned());
        }
        map
    }

    fn from_map(map: BTreeMap<String, BTreeSet<String>>) -> Acl {
        Acl {
            aces: map
                .into_iter()
                .filter(|(_, perms)| !perms.is_empty())
                .map(|(principal, permissions)| Ace {
                    principal,
                    permissions,
                    direct: true,
                })
                .collect(),
        }
    }
}

/// An additive/subtractive ACL change set.
///
/// Removals are processed before additions, so an entry present in both
/// lists ends up granted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclDelta {
    pub to_add: Acl,
    pub to_remove: Acl,
}

impl AclDelta {
    /// The empty delta.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn add(mut self, ace: Ace) -> Self {
        self.to_add.aces.push(ace);
        self
    }

    pub fn remove(mut self, ace: Ace) -> Self {
        self.to_remove.aces.push(ace);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.aces.iter().all(|a| a.permissions.is_empty())
            && self.to_remove.aces.iter().all(|a| a.permissions.is_empty())
    }

    /// Both sides merged per principal with empty entries dropped.
    pub fn normalized(&self) -> AclDelta {
        AclDelta {
            to_add: self.to_add.normalized(),
            to_remove: self.to_remove.normalized(),
        }
    }

    /// The ACL that results from applying this delta to `current`.
    pub fn apply(&self, current: &Acl) -> Acl {
        let mut map = current.to_map();
        for ace in &self.to_remove.aces {
            if let Some(perms) = map.get_mut(&ace.principal) {
                for permission in &ace.permissions {
                    perms.remove(permission);
                }
            }
        }
        for ace in &self.to_add.aces {
            map.entry(ace.principal.clone())
                .or_default()
                .extend(ace.permissions.iter().cloned());
        }
        Acl::from_map(map)
    }
}
