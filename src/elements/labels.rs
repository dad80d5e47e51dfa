//! Element label cache

use crate::elements::{ElementConnection, ElementKey};
use crate::error::{Error, Result};
use crate::types::{ChangedElementEntry, Opcode};
use std::collections::HashMap;
use tracing::{debug, warn};

/// ID to display label map shared by every load pass
#[derive(Debug, Default)]
pub struct LabelCache {
    labels: HashMap<String, String>,
}

impl LabelCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached label for an element
    pub fn get(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Number of cached labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Forget every label
    pub fn clear(&mut self) {
        self.labels.clear();
    }

    fn contained_in_cache(&self, entries: &[ChangedElementEntry]) -> bool {
        entries.iter().all(|e| self.labels.contains_key(&e.id))
    }

    fn apply(&self, mut entries: Vec<ChangedElementEntry>) -> Vec<ChangedElementEntry> {
        for entry in &mut entries {
            if let Some(label) = self.labels.get(&entry.id) {
                entry.label = Some(label.clone());
            }
        }
        entries
    }

    /// Fill in labels for `entries`
    ///
    /// Deleted elements only exist in the target iModel, so their labels come
    /// from `target`; everything else is labelled from `current`. Cached
    /// labels are reused. If a lookup fails the entries come back unmodified.
    pub async fn populate_labels(
        &mut self,
        entries: Vec<ChangedElementEntry>,
        current: &dyn ElementConnection,
        target: &dyn ElementConnection,
    ) -> Vec<ChangedElementEntry> {
        if self.contained_in_cache(&entries) {
            return self.apply(entries);
        }

        let mut live = Vec::new();
        let mut deleted = Vec::new();
        for entry in entries.iter().filter(|e| !self.labels.contains_key(&e.id)) {
            if entry.opcode == Opcode::Delete {
                deleted.push(ElementKey::from(entry));
            } else {
                live.push(ElementKey::from(entry));
            }
        }

        debug!(
            "Querying labels: {} from current, {} from target",
            live.len(),
            deleted.len()
        );

        if let Err(e) = self.query(current, &live).await {
            warn!("Failed to load element labels: {e}");
            return entries;
        }
        if let Err(e) = self.query(target, &deleted).await {
            warn!("Failed to load labels of deleted elements: {e}");
            return entries;
        }

        self.apply(entries)
    }

    async fn query(&mut self, connection: &dyn ElementConnection, keys: &[ElementKey]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let labels = connection.element_labels(keys).await?;
        if labels.len() != keys.len() {
            return Err(Error::Internal(format!(
                "label query returned {} labels for {} elements",
                labels.len(),
                keys.len()
            )));
        }

        for (key, label) in keys.iter().zip(labels) {
            self.labels.insert(key.id.clone(), label);
        }
        Ok(())
    }
}
