//! Paginated named version loader
//!
//! Pages named versions newest first, keeps the ones older than the
//! baseline changeset, and pairs each with the changeset right after it
//! (the start point of a comparison).
//!
//! All methods take `&self`; share the loader through an `Arc` when several
//! tasks drive it. State lives behind a mutex that is never held across an
//! await. Results that land after [`reset`](NamedVersionLoader::reset) or
//! [`dispose`](NamedVersionLoader::dispose) are dropped.

use crate::abort::{AbortController, AbortSignal};
use crate::api::{IModelsApi, NamedVersionQuery};
use crate::error::{Error, Result};
use crate::events::{EventChannel, Subscription};
use crate::types::{
    Changeset, ComparisonJobStatus, CurrentNamedVersion, NamedVersion, NamedVersionWithTarget,
    VersionCompareEntry,
};
use crate::versions::reducer;
use crate::versions::SessionStore;
use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Identifies one loader session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderKey {
    /// iModel being browsed
    pub imodel_id: String,
    /// Changeset the user has open (the comparison baseline)
    pub current_changeset_id: String,
}

impl LoaderKey {
    /// Create a key
    pub fn new(imodel_id: impl Into<String>, current_changeset_id: impl Into<String>) -> Self {
        Self {
            imodel_id: imodel_id.into(),
            current_changeset_id: current_changeset_id.into(),
        }
    }
}

/// Loader notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Baseline changeset fetched; a (possibly synthetic) current version exists
    BaselineLoaded,
    /// A page was merged into the entries
    PageLoaded {
        /// Entries appended by the page
        count: usize,
    },
    /// The synthetic current version was replaced by a real one
    CurrentVersionResolved,
    /// Loading failed
    Error(String),
}

/// Everything a view renders from the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSnapshot {
    /// Versions older than the baseline, newest first
    pub entries: Vec<VersionCompareEntry>,
    /// The open version, real or synthetic
    pub current_named_version: Option<CurrentNamedVersion>,
    /// Baseline changeset
    pub current_changeset: Option<Changeset>,
    /// Pages fetched so far
    pub current_page: usize,
    /// Whether another page may exist
    pub has_next_page: bool,
    /// Baseline request in flight
    pub is_loading: bool,
    /// Page request in flight
    pub is_next_page_loading: bool,
    /// Loading failed
    pub is_error: bool,
    /// Message of the last failure
    pub last_error: Option<String>,
}

impl Default for LoaderSnapshot {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            current_named_version: None,
            current_changeset: None,
            current_page: 0,
            has_next_page: true,
            is_loading: false,
            is_next_page_loading: false,
            is_error: false,
            last_error: None,
        }
    }
}

struct LoaderState {
    key: LoaderKey,
    generation: u64,
    disposed: bool,
    controller: AbortController,
    view: LoaderSnapshot,
}

/// One page worth of results, not yet applied
struct FetchedPage {
    rows: usize,
    current: Option<NamedVersion>,
    entries: Vec<VersionCompareEntry>,
}

/// Incremental named version list for one iModel and baseline changeset
pub struct NamedVersionLoader {
    client: Arc<dyn IModelsApi>,
    page_size: usize,
    state: Mutex<LoaderState>,
    events: EventChannel<LoaderEvent>,
}

impl NamedVersionLoader {
    /// Create an idle loader; call [`load`](Self::load) to start
    pub fn new(client: Arc<dyn IModelsApi>, key: LoaderKey, page_size: usize) -> Self {
        Self::with_snapshot(client, key, page_size, LoaderSnapshot::default())
    }

    /// Create a loader resuming from a saved snapshot, or an idle one when
    /// the store has nothing for `key`
    pub fn restore(
        client: Arc<dyn IModelsApi>,
        key: LoaderKey,
        page_size: usize,
        store: &SessionStore,
    ) -> Self {
        let snapshot = store.restore(&key).unwrap_or_default();
        Self::with_snapshot(client, key, page_size, snapshot)
    }

    fn with_snapshot(
        client: Arc<dyn IModelsApi>,
        key: LoaderKey,
        page_size: usize,
        view: LoaderSnapshot,
    ) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            state: Mutex::new(LoaderState {
                key,
                generation: 0,
                disposed: false,
                controller: AbortController::new(),
                view,
            }),
            events: EventChannel::new(),
        }
    }

    /// Listen to loader events
    pub fn subscribe(&self) -> Subscription<LoaderEvent> {
        self.events.subscribe()
    }

    /// Current session key
    pub fn key(&self) -> LoaderKey {
        self.lock().key.clone()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> LoaderSnapshot {
        self.lock().view.clone()
    }

    /// Loaded entries
    pub fn entries(&self) -> Vec<VersionCompareEntry> {
        self.lock().view.entries.clone()
    }

    /// The open version, once the baseline is loaded
    pub fn current_named_version(&self) -> Option<CurrentNamedVersion> {
        self.lock().view.current_named_version.clone()
    }

    /// Whether another page may exist
    pub fn has_next_page(&self) -> bool {
        self.lock().view.has_next_page
    }

    /// Whether loading failed
    pub fn is_error(&self) -> bool {
        self.lock().view.is_error
    }

    /// Store the current state in `store` under the current key
    pub fn save(&self, store: &SessionStore) {
        let state = self.lock();
        store.save(state.key.clone(), state.view.clone());
    }

    /// Fetch the baseline changeset and set up the current version
    ///
    /// Does nothing when the baseline is already known (e.g. after a restore).
    pub async fn load(&self) {
        let (generation, key, signal) = {
            let mut state = self.lock();
            if state.disposed || state.view.current_changeset.is_some() || state.view.is_loading {
                return;
            }
            state.view.is_loading = true;
            (state.generation, state.key.clone(), state.controller.signal())
        };

        debug!(
            "Loading baseline changeset {} of {}",
            key.current_changeset_id, key.imodel_id
        );
        let result = self
            .client
            .get_changeset(&key.imodel_id, &key.current_changeset_id, &signal)
            .await
            .and_then(|found| {
                found.ok_or_else(|| Error::BaselineChangesetNotFound(key.current_changeset_id.clone()))
            });

        let mut state = self.lock();
        if state.is_stale(generation) {
            return;
        }
        state.view.is_loading = false;
        match result {
            Ok(changeset) => {
                state.view.is_error = false;
                state.view.last_error = None;
                if state.view.current_named_version.is_none() {
                    state.view.current_named_version = Some(CurrentNamedVersion::synthetic(&changeset));
                }
                state.view.current_changeset = Some(changeset);
                drop(state);
                self.events.emit(LoaderEvent::BaselineLoaded);
            }
            Err(e) => {
                drop(state);
                self.fail(generation, &e);
            }
        }
    }

    /// Fetch and merge the next page
    ///
    /// No-op while a page is already loading, when no page is left, or
    /// before the baseline is known.
    pub async fn load_next_page(&self) {
        let (generation, key, skip, baseline, signal) = {
            let mut state = self.lock();
            let view = &state.view;
            if state.disposed || view.is_next_page_loading || !view.has_next_page {
                return;
            }
            let Some(baseline) = view.current_changeset.clone() else {
                return;
            };
            let skip = view.current_page * self.page_size;
            state.view.is_next_page_loading = true;
            (
                state.generation,
                state.key.clone(),
                skip,
                baseline,
                state.controller.signal(),
            )
        };

        let result = self.fetch_page(&key.imodel_id, skip, &baseline, &signal).await;

        let mut state = self.lock();
        if state.is_stale(generation) {
            return;
        }
        state.view.is_next_page_loading = false;
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                drop(state);
                self.fail(generation, &e);
                return;
            }
        };

        state.view.is_error = false;
        state.view.last_error = None;

        let mut resolved = false;
        if let Some(real) = page.current {
            if state
                .view
                .current_named_version
                .as_ref()
                .is_none_or(|current| current.is_synthetic)
            {
                state.view.current_named_version = Some(CurrentNamedVersion::real(real));
                resolved = true;
            }
        }

        let count = page.entries.len();
        state.view.entries.extend(page.entries);
        state.view.current_page += 1;
        state.view.has_next_page = page.rows == self.page_size;
        debug!(
            "Page {} of {}: {} rows, {} entries kept",
            state.view.current_page, key.imodel_id, page.rows, count
        );
        drop(state);

        if resolved {
            self.events.emit(LoaderEvent::CurrentVersionResolved);
        }
        self.events.emit(LoaderEvent::PageLoaded { count });
    }

    async fn fetch_page(
        &self,
        imodel_id: &str,
        skip: usize,
        baseline: &Changeset,
        signal: &AbortSignal,
    ) -> Result<FetchedPage> {
        let query = NamedVersionQuery::newest_first(imodel_id, self.page_size, skip);
        let versions = self.client.get_named_versions(&query, signal).await?;
        let rows = versions.len();

        let current = versions
            .iter()
            .find(|v| v.changeset_id == baseline.id)
            .cloned();
        let older: Vec<NamedVersion> = versions
            .into_iter()
            .filter(|v| v.changeset_index < baseline.index)
            .collect();

        let client = self.client.as_ref();
        let lookups = older.iter().map(|version| {
            let target_index = (version.changeset_index + 1).to_string();
            async move { client.get_changeset(imodel_id, &target_index, signal).await }
        });
        let targets = join_all(lookups).await;
        signal.check()?;

        let mut entries = Vec::with_capacity(older.len());
        for (version, target) in older.into_iter().zip(targets) {
            match target {
                Ok(Some(changeset)) => entries.push(VersionCompareEntry {
                    named_version: NamedVersionWithTarget {
                        named_version: version,
                        target_changeset_id: changeset.id,
                    },
                    job: None,
                }),
                Ok(None) => warn!(
                    "Dropping named version {}: no changeset after index {}",
                    version.display_name, version.changeset_index
                ),
                Err(e) => warn!(
                    "Dropping named version {}: target changeset lookup failed: {e}",
                    version.display_name
                ),
            }
        }

        Ok(FetchedPage {
            rows,
            current,
            entries,
        })
    }

    /// Set the job status of one entry
    pub fn update_job_status(&self, named_version_id: &str, status: ComparisonJobStatus) {
        let mut state = self.lock();
        let entries = std::mem::take(&mut state.view.entries);
        state.view.entries = reducer::update_job_status(entries, named_version_id, status);
    }

    /// Mark one entry's comparison as failed
    pub fn mark_failed(&self, named_version_id: &str) {
        let mut state = self.lock();
        let entries = std::mem::take(&mut state.view.entries);
        state.view.entries = reducer::mark_failed(entries, named_version_id);
    }

    /// Switch to another iModel or baseline, dropping everything loaded
    ///
    /// Requests still in flight are aborted and their results ignored.
    pub fn reset(&self, key: LoaderKey) {
        let mut state = self.lock();
        state.controller.abort();
        state.controller = AbortController::new();
        state.generation += 1;
        state.key = key;
        state.view = LoaderSnapshot::default();
    }

    /// Stop the loader; later results and calls are ignored
    pub fn dispose(&self) {
        let mut state = self.lock();
        state.controller.abort();
        state.generation += 1;
        state.disposed = true;
    }

    fn fail(&self, generation: u64, error: &Error) {
        if error.is_abort() {
            debug!("Named version load aborted");
            return;
        }
        {
            let mut state = self.lock();
            if state.is_stale(generation) {
                return;
            }
            state.view.is_error = true;
            state.view.last_error = Some(error.to_string());
        }
        warn!("Failed to load named versions: {error}");
        self.events.emit(LoaderEvent::Error(error.to_string()));
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LoaderState {
    const fn is_stale(&self, generation: u64) -> bool {
        self.disposed || self.generation != generation
    }
}

impl Drop for NamedVersionLoader {
    fn drop(&mut self) {
        self.lock().controller.abort();
    }
}
