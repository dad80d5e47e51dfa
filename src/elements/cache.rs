//! Changed element entry cache

use crate::elements::{ElementConnection, LabelCache};
use crate::error::{Error, Result};
use crate::events::{EventChannel, Subscription};
use crate::types::{ChangedElement, ChangedElementEntry, ElementType, Opcode};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entries processed between two progress events during initialization
const PROGRESS_STEP: usize = 1000;

/// Cache lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// Initialization progress
    InitProgress {
        /// Entries processed
        loaded: usize,
        /// Entries in the result
        total: usize,
    },
    /// Initialization finished
    Initialized {
        /// Entries in the result
        total: usize,
    },
    /// A load pass enriched entries
    EntriesLoaded {
        /// Entries enriched by the pass
        count: usize,
    },
}

/// Lookup of entries by element ID
pub trait EntryLookup {
    /// Entry for `id`, if it is a changed element
    fn lookup(&self, id: &str) -> Option<&ChangedElementEntry>;
}

impl EntryLookup for IndexMap<String, ChangedElementEntry> {
    fn lookup(&self, id: &str) -> Option<&ChangedElementEntry> {
        self.get(id)
    }
}

impl EntryLookup for HashMap<String, ChangedElementEntry> {
    fn lookup(&self, id: &str) -> Option<&ChangedElementEntry> {
        self.get(id)
    }
}

/// Owner of every changed element entry of one comparison
pub struct ChangedElementEntryCache {
    entries: IndexMap<String, ChangedElementEntry>,
    labels: LabelCache,
    current: Option<Arc<dyn ElementConnection>>,
    target: Option<Arc<dyn ElementConnection>>,
    events: EventChannel<CacheEvent>,
}

impl Default for ChangedElementEntryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangedElementEntryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            labels: LabelCache::new(),
            current: None,
            target: None,
            events: EventChannel::new(),
        }
    }

    /// Listen to cache events
    pub fn subscribe(&self) -> Subscription<CacheEvent> {
        self.events.subscribe()
    }

    /// Replace the cache contents with a new comparison result
    ///
    /// Links every element to its parent when the parent is itself a
    /// changed element.
    pub fn initialize(
        &mut self,
        current: Arc<dyn ElementConnection>,
        target: Arc<dyn ElementConnection>,
        elements: Vec<ChangedElement>,
    ) {
        let total = elements.len();
        self.entries.clear();
        self.labels.clear();
        self.current = Some(current);
        self.target = Some(target);

        for (i, element) in elements.into_iter().enumerate() {
            self.entries
                .insert(element.id.clone(), ChangedElementEntry::from(element));
            let loaded = i + 1;
            if loaded % PROGRESS_STEP == 0 {
                self.events.emit(CacheEvent::InitProgress { loaded, total });
            }
        }

        let links: Vec<(String, String)> = self
            .entries
            .values()
            .filter_map(|e| {
                e.parent_id
                    .as_ref()
                    .filter(|parent| *parent != &e.id && self.entries.contains_key(*parent))
                    .map(|parent| (parent.clone(), e.id.clone()))
            })
            .collect();

        for (parent, child) in links {
            if let Some(entry) = self.entries.get_mut(&parent) {
                entry.children.push(child);
                entry.has_changed_children = true;
            }
        }

        debug!("Initialized changed element cache with {total} entries");
        self.events.emit(CacheEvent::Initialized { total });
    }

    /// Whether every enrichment a row needs is present
    pub const fn is_loaded(entry: &ChangedElementEntry) -> bool {
        entry.loaded && entry.direct_children.is_some() && entry.label.is_some()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by element ID
    pub fn get(&self, id: &str) -> Option<&ChangedElementEntry> {
        self.entries.get(id)
    }

    /// Every entry, in result order
    pub fn entries(&self) -> impl Iterator<Item = &ChangedElementEntry> {
        self.entries.values()
    }

    /// Entries whose parent is not a changed element
    pub fn root_entries(&self) -> impl Iterator<Item = &ChangedElementEntry> {
        self.entries.values().filter(|e| {
            e.parent_id
                .as_ref()
                .is_none_or(|parent| parent == &e.id || !self.entries.contains_key(parent))
        })
    }

    /// Entries matching `ids`, plus one level of their children when
    /// `want_children` is set
    pub fn get_entries(&self, ids: &[String], want_children: bool) -> Vec<&ChangedElementEntry> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut child_ids: Vec<&str> = Vec::new();

        for id in ids {
            if let Some(entry) = self.entries.get(id) {
                seen.insert(entry.id.as_str());
                if want_children {
                    child_ids.extend(entry.children.iter().map(String::as_str));
                }
            }
        }

        for id in child_ids {
            if self.entries.contains_key(id) {
                seen.insert(id);
            }
        }

        seen.into_iter()
            .filter_map(|id| self.entries.get(id))
            .collect()
    }

    /// Load labels (and optionally model children) for `ids`
    ///
    /// Entries that already have what was asked for are left alone, so the
    /// call is safe to repeat for the same rows.
    pub async fn load_entries(
        &mut self,
        ids: &[String],
        load_direct_children: bool,
    ) -> Result<Vec<ChangedElementEntry>> {
        let (Some(current), Some(target)) = (self.current.clone(), self.target.clone()) else {
            return Err(Error::Internal(
                "changed element cache used before initialize".to_string(),
            ));
        };

        let pending: Vec<ChangedElementEntry> = ids
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(|e| {
                !e.loaded
                    || e.label.is_none()
                    || (load_direct_children && e.direct_children.is_none())
            })
            .cloned()
            .collect();

        if !pending.is_empty() {
            let count = pending.len();
            let labelled = self
                .labels
                .populate_labels(pending, current.as_ref(), target.as_ref())
                .await;

            let children = if load_direct_children {
                Self::query_direct_children(&labelled, current.as_ref(), target.as_ref()).await
            } else {
                None
            };

            for updated in labelled {
                let Some(entry) = self.entries.get_mut(&updated.id) else {
                    continue;
                };
                entry.label = updated.label;
                if let Some(children) = &children {
                    let direct = children.get(&entry.id).cloned().unwrap_or_default();
                    entry.element_type = Some(if direct.is_empty() {
                        ElementType::Element
                    } else {
                        ElementType::Assembly
                    });
                    entry.direct_children = Some(direct);
                }
                entry.loaded = true;
            }

            self.events.emit(CacheEvent::EntriesLoaded { count });
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect())
    }

    async fn query_direct_children(
        entries: &[ChangedElementEntry],
        current: &dyn ElementConnection,
        target: &dyn ElementConnection,
    ) -> Option<HashMap<String, Vec<String>>> {
        let (deleted, live): (Vec<&ChangedElementEntry>, Vec<&ChangedElementEntry>) =
            entries.iter().partition(|e| e.opcode == Opcode::Delete);
        let live_ids: Vec<String> = live.iter().map(|e| e.id.clone()).collect();
        let deleted_ids: Vec<String> = deleted.iter().map(|e| e.id.clone()).collect();

        let mut children = HashMap::new();
        for (connection, ids) in [(current, live_ids), (target, deleted_ids)] {
            if ids.is_empty() {
                continue;
            }
            match connection.direct_children(&ids).await {
                Ok(found) => children.extend(found),
                Err(e) => {
                    warn!("Failed to load child elements: {e}");
                    return None;
                }
            }
        }
        Some(children)
    }
}

impl EntryLookup for ChangedElementEntryCache {
    fn lookup(&self, id: &str) -> Option<&ChangedElementEntry> {
        self.get(id)
    }
}
