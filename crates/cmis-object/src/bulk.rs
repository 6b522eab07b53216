use tracing::{info, warn};

use cmis_types::ObjectRef;

use crate::error::{ObjectError, ObjectResult};

/// One unit of a bulk property update.
#[derive(Clone, Debug, PartialEq)]
pub struct BulkUpdateEntry {
    /// The pair as the caller supplied it.
    pub object: ObjectRef,
    /// The successor pair, present when the update succeeded.
    pub updated: Option<ObjectRef>,
    /// Why the update failed, present when it did.
    pub failure: Option<ObjectError>,
}

impl BulkUpdateEntry {
    pub fn new(object: ObjectRef) -> Self {
        Self {
            object,
            updated: None,
            failure: None,
        }
    }

    pub fn is_updated(&self) -> bool {
        self.updated.is_some()
    }

    /// The pair to use from now on: the successor if the update succeeded,
    /// otherwise the unchanged original.
    pub fn current(&self) -> &ObjectRef {
        self.updated.as_ref().unwrap_or(&self.object)
    }

    /// Whether the entry now carries a different change token.
    pub fn token_changed(&self) -> bool {
        self.current().change_token != self.object.change_token
    }
}

impl From<ObjectRef> for BulkUpdateEntry {
    fn from(object: ObjectRef) -> Self {
        Self::new(object)
    }
}

/// Outcome of a bulk update: every entry, in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BulkUpdateReport {
    pub entries: Vec<BulkUpdateEntry>,
}

impl BulkUpdateReport {
    /// Entries whose update failed.
    pub fn failures(&self) -> impl Iterator<Item = &BulkUpdateEntry> {
        self.entries.iter().filter(|e| e.failure.is_some())
    }

    /// Entries whose update succeeded.
    pub fn updated(&self) -> impl Iterator<Item = &BulkUpdateEntry> {
        self.entries.iter().filter(|e| e.is_updated())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// `true` when every entry was updated.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(BulkUpdateEntry::is_updated)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attempt `update` once per entry. A failure is recorded on its entry and
/// never stops the batch.
pub(crate) fn run_bulk_update<F>(entries: Vec<BulkUpdateEntry>, mut update: F) -> BulkUpdateReport
where
    F: FnMut(&ObjectRef) -> ObjectResult<ObjectRef>,
{
    let entries: Vec<BulkUpdateEntry> = entries
        .into_iter()
        .map(|mut entry| {
            match update(&entry.object) {
                Ok(successor) => {
                    entry.updated = Some(successor);
                    entry.failure = None;
                }
                Err(err) => {
                    warn!(object = %entry.object.id, error = %err, "bulk update entry failed");
                    entry.updated = None;
                    entry.failure = Some(err);
                }
            }
            entry
        })
        .collect();

    let report = BulkUpdateReport { entries };
    info!(
        total = report.len(),
        failed = report.failure_count(),
        "bulk property update finished"
    );
    report
}
