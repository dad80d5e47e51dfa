//! Loader state kept across loader instances

use crate::versions::{LoaderKey, LoaderSnapshot};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Session-scoped store of loader snapshots
///
/// Lets a view drop its loader and pick up where it left off when it comes
/// back to the same iModel and changeset. Owned by whoever owns the session;
/// there is no global instance.
#[derive(Debug, Default)]
pub struct SessionStore {
    snapshots: Mutex<HashMap<LoaderKey, LoaderSnapshot>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `snapshot` for `key`, replacing any earlier one
    ///
    /// In-flight flags are cleared: the request that set them belongs to the
    /// loader being saved and will never land in a restored one.
    pub fn save(&self, key: LoaderKey, mut snapshot: LoaderSnapshot) {
        snapshot.is_loading = false;
        snapshot.is_next_page_loading = false;
        debug!(
            "Saving loader state for {}@{} ({} entries)",
            key.imodel_id,
            key.current_changeset_id,
            snapshot.entries.len()
        );
        self.lock().insert(key, snapshot);
    }

    /// Snapshot saved for `key`, if any
    pub fn restore(&self, key: &LoaderKey) -> Option<LoaderSnapshot> {
        self.lock().get(key).cloned()
    }

    /// Forget the snapshot for `key`
    pub fn clear(&self, key: &LoaderKey) {
        self.lock().remove(key);
    }

    /// Forget every snapshot
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    /// Number of saved snapshots
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is saved
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<LoaderKey, LoaderSnapshot>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
