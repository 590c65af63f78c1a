//! Deployment tags are free form labels. They are meant to be unique per
//! contract type but that is only ever checked, never enforced: a duplicate
//! tag results in a warning and the deployment is recorded anyway.

use crate::DeploymentRecord;

/// Label used for deployments that were not given a tag.
pub const UNTAGGED: &str = "untagged";

/// Returns the tag to record for a deployment. Only a missing or empty tag
/// is replaced, anything else is kept verbatim.
pub fn normalize(tag: Option<&str>) -> String {
    match tag {
        Some(tag) if !tag.is_empty() => tag.to_string(),
        _ => UNTAGGED.to_string(),
    }
}

/// Counts the records carrying `tag`, ignoring case. Records without a tag
/// never match.
pub fn count_matching(tag: &str, records: &[DeploymentRecord]) -> usize {
    let tag = tag.to_lowercase();
    records
        .iter()
        .filter_map(|record| record.tag.as_deref())
        .filter(|existing| existing.to_lowercase() == tag)
        .count()
}
