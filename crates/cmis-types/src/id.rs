use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque, repository-assigned identifier for an object.
///
/// The repository may reissue an object's id on mutation; callers must use
/// the id returned by the latest mutating call from then on. An `ObjectId`
/// is never empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create an id from its string form. Fails on the empty string.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::EmptyObjectId);
        }
        Ok(Self(value))
    }

    /// Create an id from a UUID (used by repositories that mint their own ids).
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Generate a fresh time-ordered id (UUID v7).
    pub fn generate() -> Self {
        Self::from_uuid(uuid::Uuid::now_v7())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ObjectId {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// Opaque optimistic-concurrency marker tied to an object's current state.
///
/// Tokens are compared by the repository, never parsed by the client. The
/// absence of a token is modelled as `Option::None`; no valid token is the
/// empty string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeToken(String);

impl ChangeToken {
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::EmptyChangeToken);
        }
        Ok(Self(value))
    }

    /// A token rendered from a repository-side sequence number.
    pub fn from_sequence(seq: u64) -> Self {
        Self(seq.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeToken({})", self.0)
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ChangeToken {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChangeToken> for String {
    fn from(token: ChangeToken) -> Self {
        token.0
    }
}

/// The (object id, change token) pair presented on every mutating call.
///
/// A `None` token means the caller opts out of the concurrency check. Every
/// mutating operation consumes the pair it was given and hands back its
/// successor; the successor supersedes all earlier pairs for the object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub change_token: Option<ChangeToken>,
}

impl ObjectRef {
    /// A pair carrying a change token.
    pub fn new(id: ObjectId, change_token: ChangeToken) -> Self {
        Self {
            id,
            change_token: Some(change_token),
        }
    }

    /// A pair without a change token (skips the concurrency check).
    pub fn untracked(id: ObjectId) -> Self {
        Self {
            id,
            change_token: None,
        }
    }

    /// Returns `true` if this pair carries a change token.
    pub fn is_tracked(&self) -> bool {
        self.change_token.is_some()
    }
}
