//! Core types for version-compare

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A changeset: an immutable, ordered delta in an iModel's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    /// Changeset ID (hash)
    pub id: String,
    /// Push description
    #[serde(default)]
    pub description: String,
    /// Position in the iModel's history, total order
    pub index: u64,
    /// When the changeset was pushed
    pub push_date_time: DateTime<Utc>,
}

/// Visibility of a named version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamedVersionState {
    /// Listed normally
    #[default]
    Visible,
    /// Hidden from version pickers
    Hidden,
}

/// A user-facing label attached to exactly one changeset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamedVersion {
    /// Named version ID
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Changeset this version labels
    #[serde(default)]
    pub changeset_id: String,
    /// Index of the labelled changeset
    #[serde(default)]
    pub changeset_index: u64,
    /// When the version was created
    pub created_date_time: DateTime<Utc>,
    /// Visibility
    #[serde(default)]
    pub state: NamedVersionState,
}

impl NamedVersion {
    /// Fabricate a stand-in version for a changeset that has no named version
    pub fn synthetic(changeset: &Changeset) -> Self {
        Self {
            id: changeset.id.clone(),
            display_name: format!("Changeset #{}", changeset.index),
            description: (!changeset.description.is_empty()).then(|| changeset.description.clone()),
            changeset_id: changeset.id.clone(),
            changeset_index: changeset.index,
            created_date_time: changeset.push_date_time,
            state: NamedVersionState::Visible,
        }
    }
}

/// The version the user currently has open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentNamedVersion {
    /// The version itself
    pub named_version: NamedVersion,
    /// True while no real named version for the open changeset is known
    pub is_synthetic: bool,
}

impl CurrentNamedVersion {
    /// Wrap a real named version
    pub const fn real(named_version: NamedVersion) -> Self {
        Self {
            named_version,
            is_synthetic: false,
        }
    }

    /// Build a synthetic version from changeset metadata
    pub fn synthetic(changeset: &Changeset) -> Self {
        Self {
            named_version: NamedVersion::synthetic(changeset),
            is_synthetic: true,
        }
    }
}

/// A named version paired with the changeset a comparison must start from
///
/// The comparison service treats a version's own changeset as already
/// applied, so the start point is the changeset right after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedVersionWithTarget {
    /// The named version
    pub named_version: NamedVersion,
    /// ID of the changeset at `changeset_index + 1`
    pub target_changeset_id: String,
}

/// Server-side comparison job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Waiting for a worker
    Queued,
    /// Being computed
    Started,
    /// Result available
    Completed,
    /// Computation failed
    Failed,
}

/// HAL style link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target URL
    pub href: String,
}

/// Comparison job as returned by the comparison service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonJob {
    /// Job ID, `{startChangesetId}-{endChangesetId}`
    pub id: String,
    /// Current state
    pub status: JobState,
    /// Owning iTwin
    #[serde(rename = "iTwinId", default)]
    pub itwin_id: String,
    /// Owning iModel
    #[serde(rename = "iModelId", default)]
    pub imodel_id: String,
    /// First changeset of the compared range
    #[serde(default)]
    pub start_changeset_id: String,
    /// Last changeset of the compared range
    #[serde(default)]
    pub end_changeset_id: String,
    /// Progress numerator while started
    #[serde(default)]
    pub current_progress: Option<u64>,
    /// Progress denominator while started
    #[serde(default)]
    pub max_progress: Option<u64>,
    /// Failure details
    #[serde(default)]
    pub error_details: Option<String>,
    /// Location of the computed result
    #[serde(default)]
    pub comparison: Option<Link>,
}

/// Job progress while started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobProgress {
    /// Steps done
    pub current: u64,
    /// Total steps
    pub max: u64,
}

impl fmt::Display for JobProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}

/// Client view of a comparison job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonJobStatus {
    /// No job exists yet (never returned by the server)
    NotStarted,
    /// Waiting for a worker
    Queued {
        /// Job ID
        job_id: String,
    },
    /// Being computed
    Started {
        /// Job ID
        job_id: String,
        /// Progress so far
        progress: JobProgress,
    },
    /// Result available
    Completed {
        /// Job ID
        job_id: String,
        /// Where to download the changed elements
        comparison_url: String,
    },
    /// Computation failed
    Failed {
        /// Job ID, empty when the failure happened client-side
        job_id: String,
        /// Failure details
        error_details: Option<String>,
    },
}

impl ComparisonJobStatus {
    /// Job ID, if a job exists
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::NotStarted => None,
            Self::Queued { job_id }
            | Self::Started { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. } => Some(job_id),
        }
    }

    /// Completed or failed: polling stops here
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    /// Queued or started: still worth polling
    pub const fn is_in_progress(&self) -> bool {
        matches!(self, Self::Queued { .. } | Self::Started { .. })
    }
}

impl fmt::Display for ComparisonJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Queued { .. } => write!(f, "queued"),
            Self::Started { progress, .. } => write!(f, "started ({progress})"),
            Self::Completed { .. } => write!(f, "completed"),
            Self::Failed { error_details, .. } => match error_details {
                Some(details) => write!(f, "failed: {details}"),
                None => write!(f, "failed"),
            },
        }
    }
}

/// A selectable version and its (possibly not yet started) comparison job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCompareEntry {
    /// Version to compare against
    pub named_version: NamedVersionWithTarget,
    /// Comparison job, once known
    pub job: Option<ComparisonJobStatus>,
}

/// Insert/Update/Delete classification of an element change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Element was added
    Insert,
    /// Element was modified
    Update,
    /// Element was removed
    Delete,
}

impl Opcode {
    /// Wire code used in comparison results
    pub const fn code(self) -> i64 {
        match self {
            Self::Insert => 29,
            Self::Update => 30,
            Self::Delete => 31,
        }
    }

    /// Decode a wire code
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            29 => Some(Self::Insert),
            30 => Some(Self::Update),
            31 => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "added",
            Self::Update => "modified",
            Self::Delete => "deleted",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Bitmask of what changed about an element
    ///
    /// Decoded with [`TypeOfChange::from_bits_retain`], so bits this crate
    /// does not name survive a round trip.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct TypeOfChange: u32 {
        /// Geometry changed
        const GEOMETRY = 1;
        /// Placement changed
        const PLACEMENT = 1 << 1;
        /// Properties changed
        const PROPERTY = 1 << 2;
        /// Changed only through a child
        const INDIRECT = 1 << 3;
        /// Hidden properties changed
        const HIDDEN = 1 << 4;
    }
}

/// Old/new checksums of a changed property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChecksums {
    /// Checksum before the change
    pub old_checksum: Option<i64>,
    /// Checksum after the change
    pub new_checksum: Option<i64>,
}

/// One changed element of a comparison result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedElement {
    /// Element ID
    pub id: String,
    /// ECClass ID
    pub class_id: String,
    /// Kind of change
    pub opcode: Opcode,
    /// What changed
    pub type_of_change: TypeOfChange,
    /// Containing model
    pub model_id: String,
    /// Parent element, if any
    pub parent_id: Option<String>,
    /// Parent ECClass ID
    pub parent_class_id: Option<String>,
    /// Changed properties in result order
    pub properties: IndexMap<String, PropertyChecksums>,
}

/// How an entry appears in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// Leaf element
    Element,
    /// Element with children in the model
    Assembly,
}

/// A changed element enriched with display data
///
/// Children are referenced by ID; the owning cache holds the entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedElementEntry {
    /// Element ID
    pub id: String,
    /// ECClass ID
    pub class_id: String,
    /// Kind of change
    pub opcode: Opcode,
    /// What changed
    pub type_of_change: TypeOfChange,
    /// Containing model
    pub model_id: String,
    /// Parent element, if any
    pub parent_id: Option<String>,
    /// Parent ECClass ID
    pub parent_class_id: Option<String>,
    /// Changed properties
    pub properties: IndexMap<String, PropertyChecksums>,
    /// Display label, once loaded
    pub label: Option<String>,
    /// Leaf or assembly, once children are known
    pub element_type: Option<ElementType>,
    /// Whether any changed element names this one as parent
    pub has_changed_children: bool,
    /// IDs of changed elements whose parent is this one
    pub children: Vec<String>,
    /// IDs of all model children, once loaded
    pub direct_children: Option<Vec<String>>,
    /// Whether a load pass has run for this entry
    pub loaded: bool,
    /// Changed only because a descendant changed
    pub indirect: bool,
}

impl From<ChangedElement> for ChangedElementEntry {
    fn from(element: ChangedElement) -> Self {
        let indirect = element.type_of_change.contains(TypeOfChange::INDIRECT);
        Self {
            id: element.id,
            class_id: element.class_id,
            opcode: element.opcode,
            type_of_change: element.type_of_change,
            model_id: element.model_id,
            parent_id: element.parent_id,
            parent_class_id: element.parent_class_id,
            properties: element.properties,
            label: None,
            element_type: None,
            has_changed_children: false,
            children: Vec::new(),
            direct_children: None,
            loaded: false,
            indirect,
        }
    }
}
