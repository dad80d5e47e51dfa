//! Test data factories for version-compare types
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use version_compare::elements::ChangedElementsPayload;
use version_compare::types::{
    Changeset, ComparisonJob, JobState, Link, NamedVersion, NamedVersionState,
    NamedVersionWithTarget, VersionCompareEntry,
};

/// Changeset `cs{index}` pushed `index` hours after a fixed epoch
pub fn make_changeset(index: u64) -> Changeset {
    Changeset {
        id: format!("cs{index}"),
        description: format!("change #{index}"),
        index,
        push_date_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::hours(i64::try_from(index).unwrap()),
    }
}

/// Changesets `cs0..cs{count-1}`, oldest first
pub fn make_changesets(count: u64) -> Vec<Changeset> {
    (0..count).map(make_changeset).collect()
}

/// Named version `nv-{name}` attached to `changeset`
pub fn make_named_version(name: &str, changeset: &Changeset) -> NamedVersion {
    NamedVersion {
        id: format!("nv-{name}"),
        display_name: name.to_string(),
        description: None,
        changeset_id: changeset.id.clone(),
        changeset_index: changeset.index,
        created_date_time: changeset.push_date_time,
        state: NamedVersionState::Visible,
    }
}

/// Named version `v{index}` on changeset `cs{index}`
pub fn make_version_at(index: u64) -> NamedVersion {
    make_named_version(&format!("v{index}"), &make_changeset(index))
}

/// Entry for `version` whose comparison starts at `target_changeset_id`
pub fn make_entry(version: NamedVersion, target_changeset_id: &str) -> VersionCompareEntry {
    VersionCompareEntry {
        named_version: NamedVersionWithTarget {
            named_version: version,
            target_changeset_id: target_changeset_id.to_string(),
        },
        job: None,
    }
}

/// Server job for the `start-end` range
pub fn make_job(start: &str, end: &str, status: JobState) -> ComparisonJob {
    ComparisonJob {
        id: format!("{start}-{end}"),
        status,
        itwin_id: "itwin-1".to_string(),
        imodel_id: "imodel-1".to_string(),
        start_changeset_id: start.to_string(),
        end_changeset_id: end.to_string(),
        current_progress: None,
        max_progress: None,
        error_details: None,
        comparison: (status == JobState::Completed).then(|| Link {
            href: format!("https://results.example/{start}-{end}.json"),
        }),
    }
}

/// Small result: an updated assembly with an inserted child, plus a deletion
pub fn make_payload() -> ChangedElementsPayload {
    serde_json::from_value(serde_json::json!({
        "elements": ["0x10", "0x11", "0x12"],
        "classIds": ["0xa", "0xa", "0xb"],
        "opcodes": [30, 29, 31],
        "type": [4, 1, 1],
        "modelIds": ["0x1", "0x1", "0x1"],
        "parentIds": ["0", "0x10", "0"],
        "parentClassIds": ["0", "0xa", "0"],
        "properties": [["Category"], [], []],
        "oldChecksums": [[1], [], []],
        "newChecksums": [[2], [], []]
    }))
    .unwrap()
}
