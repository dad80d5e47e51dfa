//! Changed element storage and enrichment
//!
//! A comparison result is flattened into a [`ChangedElementEntryCache`]:
//! one owning map from element ID to entry, with parent/child links kept as
//! ID lists. Labels and model children are loaded lazily, per visible row,
//! through an [`ElementConnection`] for each side of the comparison.

mod cache;
mod labels;
mod manager;
mod payload;

pub use cache::{CacheEvent, ChangedElementEntryCache, EntryLookup};
pub use labels::LabelCache;
pub use manager::{ChangedElementsManager, OpcodeCounts};
pub use payload::ChangedElementsPayload;

use crate::error::Result;
use crate::types::ChangedElementEntry;
use async_trait::async_trait;
use std::collections::HashMap;

/// Element identity used for label lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementKey {
    /// Element ID
    pub id: String,
    /// ECClass ID
    pub class_id: String,
}

impl From<&ChangedElementEntry> for ElementKey {
    fn from(entry: &ChangedElementEntry) -> Self {
        Self {
            id: entry.id.clone(),
            class_id: entry.class_id.clone(),
        }
    }
}

/// Read access to one opened iModel (current or target side)
#[async_trait]
pub trait ElementConnection: Send + Sync {
    /// Display labels for `keys`, in the same order
    async fn element_labels(&self, keys: &[ElementKey]) -> Result<Vec<String>>;

    /// Model children of each element. Elements without children may be
    /// missing from the map.
    async fn direct_children(&self, element_ids: &[String]) -> Result<HashMap<String, Vec<String>>>;
}
