//! Normalization of policy lists and secondary-type change sets.

use std::collections::HashSet;

use cmis_types::ObjectId;

use crate::error::{ObjectError, ObjectResult};

/// Drop repeated policy ids, keeping first occurrences in order.
pub(crate) fn dedup_policies(policies: Vec<ObjectId>) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    policies
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Secondary type ids must be non-blank and may not be both added and
/// removed in the same call.
pub(crate) fn check_secondary_types(add: &[String], remove: &[String]) -> ObjectResult<()> {
    if let Some(blank) = add.iter().chain(remove).find(|t| t.trim().is_empty()) {
        return Err(ObjectError::InvalidArgument(format!(
            "secondary type id {blank:?} is blank"
        )));
    }
    let overlap: Vec<&str> = add
        .iter()
        .filter(|t| remove.contains(t))
        .map(String::as_str)
        .collect();
    if !overlap.is_empty() {
        return Err(ObjectError::InvalidArgument(format!(
            "secondary types both added and removed: {}",
            overlap.join(", ")
        )));
    }
    Ok(())
}
