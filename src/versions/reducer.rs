//! Pure updates over the version entry list

use crate::types::{ComparisonJobStatus, VersionCompareEntry};

/// Replace the job of the entry whose named version is `named_version_id`
///
/// Other entries are returned untouched. Unknown IDs are a no-op.
pub fn update_job_status(
    mut entries: Vec<VersionCompareEntry>,
    named_version_id: &str,
    status: ComparisonJobStatus,
) -> Vec<VersionCompareEntry> {
    if let Some(entry) = entries
        .iter_mut()
        .find(|e| e.named_version.named_version.id == named_version_id)
    {
        entry.job = Some(status);
    }
    entries
}

/// Mark the comparison of `named_version_id` as failed before any job existed
pub fn mark_failed(
    entries: Vec<VersionCompareEntry>,
    named_version_id: &str,
) -> Vec<VersionCompareEntry> {
    update_job_status(
        entries,
        named_version_id,
        ComparisonJobStatus::Failed {
            job_id: String::new(),
            error_details: None,
        },
    )
}
