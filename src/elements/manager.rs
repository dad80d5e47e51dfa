//! Changed elements manager
//!
//! Front door for a downloaded comparison: decodes the payload into the
//! entry cache and answers the questions the result view asks.

use crate::elements::{
    CacheEvent, ChangedElementEntryCache, ChangedElementsPayload, ElementConnection,
};
use crate::error::Result;
use crate::events::Subscription;
use crate::filter::{filter_entries, make_default_filter_options, FilterOptions};
use crate::types::{ChangedElementEntry, Opcode};
use indexmap::IndexSet;
use std::sync::Arc;

/// Number of entries per opcode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpcodeCounts {
    /// Inserted elements
    pub added: usize,
    /// Updated elements
    pub modified: usize,
    /// Deleted elements
    pub deleted: usize,
}

impl OpcodeCounts {
    /// Total changed elements
    pub const fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

/// Holds one comparison result and its entry cache
#[derive(Default)]
pub struct ChangedElementsManager {
    cache: ChangedElementEntryCache,
}

impl ChangedElementsManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to cache events (subscribe before [`load_payload`](Self::load_payload))
    pub fn subscribe(&self) -> Subscription<CacheEvent> {
        self.cache.subscribe()
    }

    /// Decode `payload` and replace the cached result with it
    pub fn load_payload(
        &mut self,
        current: Arc<dyn ElementConnection>,
        target: Arc<dyn ElementConnection>,
        payload: ChangedElementsPayload,
    ) -> Result<()> {
        let elements = payload.into_changed_elements()?;
        self.cache.initialize(current, target, elements);
        Ok(())
    }

    /// The underlying cache
    pub const fn cache(&self) -> &ChangedElementEntryCache {
        &self.cache
    }

    /// Mutable access to the underlying cache
    pub const fn cache_mut(&mut self) -> &mut ChangedElementEntryCache {
        &mut self.cache
    }

    /// Entry by element ID
    pub fn entry(&self, id: &str) -> Option<&ChangedElementEntry> {
        self.cache.get(id)
    }

    /// Load labels and children for visible rows
    pub async fn load_entries(
        &mut self,
        ids: &[String],
        load_direct_children: bool,
    ) -> Result<Vec<ChangedElementEntry>> {
        self.cache.load_entries(ids, load_direct_children).await
    }

    /// Every changed property name, in first-seen order
    pub fn property_names(&self) -> Vec<String> {
        let names: IndexSet<&str> = self
            .cache
            .entries()
            .flat_map(|e| e.properties.keys().map(String::as_str))
            .collect();
        names.into_iter().map(ToString::to_string).collect()
    }

    /// Filter options showing everything in this result
    pub fn default_filter_options(&self) -> FilterOptions {
        make_default_filter_options(self.property_names())
    }

    /// Entry counts per opcode
    pub fn counts(&self) -> OpcodeCounts {
        self.cache
            .entries()
            .fold(OpcodeCounts::default(), |mut counts, e| {
                match e.opcode {
                    Opcode::Insert => counts.added += 1,
                    Opcode::Update => counts.modified += 1,
                    Opcode::Delete => counts.deleted += 1,
                }
                counts
            })
    }

    /// Top-level rows passing `options`; `None` when the filter is a no-op
    pub fn filter_root_entries(&self, options: &FilterOptions) -> Option<Vec<String>> {
        filter_entries(self.cache.root_entries(), options, &self.cache)
    }

    /// Every entry passing `options`; `None` when the filter is a no-op
    pub fn filter_all_entries(&self, options: &FilterOptions) -> Option<Vec<String>> {
        filter_entries(self.cache.entries(), options, &self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::test_support::FakeConnection;
    use crate::filter::is_default_filter_options;

    fn payload() -> ChangedElementsPayload {
        serde_json::from_str(
            r#"{
                "elements": ["0x1", "0x2", "0x3", "0x4"],
                "classIds": ["0xa", "0xa", "0xa", "0xa"],
                "opcodes": [30, 29, 31, 30],
                "type": [4, 1, 1, 4],
                "parentIds": ["0", "0x1", "0", "0"],
                "properties": [["Category"], [], [], ["UserLabel", "Category"]]
            }"#,
        )
        .unwrap()
    }

    fn manager() -> ChangedElementsManager {
        let mut manager = ChangedElementsManager::new();
        manager
            .load_payload(
                Arc::new(FakeConnection::labelled("c")),
                Arc::new(FakeConnection::labelled("t")),
                payload(),
            )
            .unwrap();
        manager
    }

    #[test]
    fn test_counts_and_properties() {
        let manager = manager();
        assert_eq!(
            manager.counts(),
            OpcodeCounts {
                added: 1,
                modified: 2,
                deleted: 1
            }
        );
        assert_eq!(manager.property_names(), vec!["Category", "UserLabel"]);
        assert!(is_default_filter_options(&manager.default_filter_options()));
    }

    #[test]
    fn test_filter_root_entries_keeps_parent_of_match() {
        let manager = manager();
        assert_eq!(manager.filter_root_entries(&manager.default_filter_options()), None);

        let options = FilterOptions {
            want_modified: false,
            want_deleted: false,
            ..manager.default_filter_options()
        };
        // 0x1 is modified but its inserted child is wanted
        assert_eq!(
            manager.filter_root_entries(&options),
            Some(vec!["0x1".to_string()])
        );
    }
}
