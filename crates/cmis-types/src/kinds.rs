//! Closed enumerations used as operation parameters.
//!
//! Each parameter enum names its default explicitly (`DEFAULT`) so that
//! configuration can refer to it instead of relying on absence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The CMIS wire name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(TypeError::UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// The base type every object type derives from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaseTypeId {
    #[serde(rename = "cmis:document")]
    Document,
    #[serde(rename = "cmis:folder")]
    Folder,
    #[serde(rename = "cmis:item")]
    Item,
    #[serde(rename = "cmis:policy")]
    Policy,
    #[serde(rename = "cmis:relationship")]
    Relationship,
    #[serde(rename = "cmis:secondary")]
    Secondary,
}

wire_enum!(BaseTypeId, "base type", {
    Document => "cmis:document",
    Folder => "cmis:folder",
    Item => "cmis:item",
    Policy => "cmis:policy",
    Relationship => "cmis:relationship",
    Secondary => "cmis:secondary",
});

impl BaseTypeId {
    /// Whether objects of this base type can live in a folder.
    pub fn is_fileable(&self) -> bool {
        matches!(
            self,
            Self::Document | Self::Folder | Self::Item | Self::Policy
        )
    }
}

/// Versioning state of a newly created document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningState {
    /// The document is not versionable.
    None,
    /// The document is created as a major version.
    #[default]
    Major,
    /// The document is created as a minor version.
    Minor,
    /// The document is created checked out (private working copy).
    CheckedOut,
}

wire_enum!(VersioningState, "versioning state", {
    None => "none",
    Major => "major",
    Minor => "minor",
    CheckedOut => "checkedout",
});

impl VersioningState {
    pub const DEFAULT: Self = Self::Major;
}

/// How recursive deletion treats fileable descendants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnfileObject {
    /// Unfile every descendant from the folder; delete nothing but folders.
    Unfile,
    /// Delete descendants filed only in this tree; unfile multi-filed ones.
    DeleteSingleFiled,
    /// Delete every descendant.
    #[default]
    Delete,
}

wire_enum!(UnfileObject, "unfile policy", {
    Unfile => "unfile",
    DeleteSingleFiled => "deletesinglefiled",
    Delete => "delete",
});

impl UnfileObject {
    pub const DEFAULT: Self = Self::Delete;
}

/// Which relationships of an object are included on reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeRelationships {
    #[default]
    None,
    /// Relationships where the object is the source.
    Source,
    /// Relationships where the object is the target.
    Target,
    Both,
}

wire_enum!(IncludeRelationships, "relationship inclusion", {
    None => "none",
    Source => "source",
    Target => "target",
    Both => "both",
});

impl IncludeRelationships {
    pub const DEFAULT: Self = Self::None;

    /// Whether a relationship with the given endpoints qualifies for `object`.
    pub fn includes(&self, is_source: bool, is_target: bool) -> bool {
        match self {
            Self::None => false,
            Self::Source => is_source,
            Self::Target => is_target,
            Self::Both => is_source || is_target,
        }
    }
}
