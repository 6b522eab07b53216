//! Change-token bookkeeping for mutating calls.
//!
//! The repository compares tokens; the guard only makes sure the caller
//! ends up holding the pair the repository considers current.

use tracing::debug;

use cmis_transport::MutationAck;
use cmis_types::ObjectRef;

use crate::error::{ObjectError, ObjectResult};

/// Validates outgoing concurrency pairs and derives their successors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeTokenGuard {
    require_tokens: bool,
}

impl ChangeTokenGuard {
    /// With `require_tokens`, a pair without a token is rejected instead of
    /// opting out of the concurrency check.
    pub fn new(require_tokens: bool) -> Self {
        Self { require_tokens }
    }

    pub fn requires_tokens(&self) -> bool {
        self.require_tokens
    }

    /// Check a pair before it is sent.
    pub fn check(&self, object: &ObjectRef) -> ObjectResult<()> {
        if self.require_tokens && object.change_token.is_none() {
            return Err(ObjectError::InvalidArgument(format!(
                "a change token is required to modify {}",
                object.id
            )));
        }
        Ok(())
    }

    /// The pair the caller must use for its next call on this object.
    ///
    /// The repository's id wins when it reissued one. The token is always the
    /// one the repository returned; when it returned none the successor is
    /// untracked rather than carrying the superseded token.
    pub fn successor(&self, supplied: &ObjectRef, ack: &MutationAck) -> ObjectRef {
        let id = match &ack.object_id {
            Some(id) if *id != supplied.id => {
                debug!(old = %supplied.id, new = %id, "repository reissued object id");
                id.clone()
            }
            _ => supplied.id.clone(),
        };

        match (&supplied.change_token, &ack.change_token) {
            (Some(before), Some(after)) if before == after => {
                debug!(object = %id, token = %after, "mutation left change token unchanged");
            }
            (Some(_), None) => {
                debug!(object = %id, "repository returned no change token; pair is now untracked");
            }
            _ => {}
        }

        ObjectRef {
            id,
            change_token: ack.change_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmis_types::{ChangeToken, ObjectId};

    fn pair(id: &str, token: Option<&str>) -> ObjectRef {
        ObjectRef {
            id: ObjectId::new(id).unwrap(),
            change_token: token.map(|t| ChangeToken::new(t).unwrap()),
        }
    }

    #[test]
    fn successor_takes_new_token() {
        let guard = ChangeTokenGuard::default();
        let ack = MutationAck {
            object_id: None,
            change_token: Some(ChangeToken::new("t2").unwrap()),
        };
        assert_eq!(guard.successor(&pair("D1", Some("t1")), &ack), pair("D1", Some("t2")));
    }

    #[test]
    fn successor_takes_reissued_id() {
        let guard = ChangeTokenGuard::default();
        let ack = MutationAck {
            object_id: Some(ObjectId::new("D1;v2").unwrap()),
            change_token: Some(ChangeToken::new("t2").unwrap()),
        };
        assert_eq!(
            guard.successor(&pair("D1", Some("t1")), &ack),
            pair("D1;v2", Some("t2"))
        );
    }

    #[test]
    fn missing_ack_token_never_keeps_stale_one() {
        let guard = ChangeTokenGuard::default();
        let next = guard.successor(&pair("D1", Some("t1")), &MutationAck::default());
        assert_eq!(next, pair("D1", None));
        assert!(!next.is_tracked());
    }

    #[test]
    fn required_tokens() {
        let strict = ChangeTokenGuard::new(true);
        assert!(strict.check(&pair("D1", Some("t1"))).is_ok());
        assert!(matches!(
            strict.check(&pair("D1", None)),
            Err(ObjectError::InvalidArgument(_))
        ));
        assert!(ChangeTokenGuard::new(false).check(&pair("D1", None)).is_ok());
    }
}
