//! In-memory iModels and comparison job services for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use version_compare::abort::AbortSignal;
use version_compare::api::{ComparisonJobApi, IModelsApi, JobKey, NamedVersionQuery, NewComparisonJob};
use version_compare::elements::ChangedElementsPayload;
use version_compare::error::{Error, Result, COMPARISON_NOT_FOUND};
use version_compare::types::{Changeset, ComparisonJob, JobState, Link, NamedVersion};

fn server_error(msg: &str) -> Error {
    Error::Api {
        status: 500,
        code: "InternalServerError".to_string(),
        message: msg.to_string(),
    }
}

/// Call record for `get_named_versions`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCall {
    pub top: usize,
    pub skip: usize,
}

/// Mock iModels service
///
/// Features:
/// - Changeset lookup by ID or by decimal index
/// - Named versions served newest first with `$top`/`$skip`
/// - Call tracking for verification
/// - Error injection for failure path testing
/// - A gate that holds page requests until released
pub struct MockIModels {
    changesets: Vec<Changeset>,
    named_versions: Vec<NamedVersion>,
    // Call tracking
    changeset_calls: Mutex<Vec<String>>,
    page_calls: Mutex<Vec<PageCall>>,
    // Error injection
    failing_changesets: Mutex<HashSet<String>>,
    error_on_pages: Mutex<Option<String>>,
    // Page gate
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockIModels {
    /// Serve `changesets` and `named_versions`
    pub fn new(changesets: Vec<Changeset>, named_versions: Vec<NamedVersion>) -> Self {
        Self {
            changesets,
            named_versions,
            changeset_calls: Mutex::new(Vec::new()),
            page_calls: Mutex::new(Vec::new()),
            failing_changesets: Mutex::new(HashSet::new()),
            error_on_pages: Mutex::new(None),
            gate: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `get_changeset` fail for an ID or index
    pub fn fail_changeset(&self, id_or_index: &str) {
        self.failing_changesets
            .lock()
            .unwrap()
            .insert(id_or_index.to_string());
    }

    /// Make `get_named_versions` return an error
    pub fn fail_pages(&self, msg: &str) {
        *self.error_on_pages.lock().unwrap() = Some(msg.to_string());
    }

    /// Stop failing `get_named_versions`
    pub fn recover_pages(&self) {
        *self.error_on_pages.lock().unwrap() = None;
    }

    /// Hold every page request until the returned handle is notified
    pub fn hold_pages(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    // === Call verification methods ===

    /// All IDs or indexes `get_changeset` was called with
    pub fn get_changeset_calls(&self) -> Vec<String> {
        self.changeset_calls.lock().unwrap().clone()
    }

    /// All `get_named_versions` calls
    pub fn get_page_calls(&self) -> Vec<PageCall> {
        self.page_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IModelsApi for MockIModels {
    async fn get_changeset(
        &self,
        _imodel_id: &str,
        changeset_id: &str,
        signal: &AbortSignal,
    ) -> Result<Option<Changeset>> {
        self.changeset_calls
            .lock()
            .unwrap()
            .push(changeset_id.to_string());
        signal.check()?;

        if self.failing_changesets.lock().unwrap().contains(changeset_id) {
            return Err(server_error("changeset lookup failed"));
        }

        let by_index = changeset_id.parse::<u64>().ok();
        Ok(self
            .changesets
            .iter()
            .find(|c| c.id == changeset_id || Some(c.index) == by_index)
            .cloned())
    }

    async fn get_changesets(&self, _imodel_id: &str, signal: &AbortSignal) -> Result<Vec<Changeset>> {
        signal.check()?;
        Ok(self.changesets.clone())
    }

    async fn get_named_versions(
        &self,
        query: &NamedVersionQuery,
        signal: &AbortSignal,
    ) -> Result<Vec<NamedVersion>> {
        self.page_calls.lock().unwrap().push(PageCall {
            top: query.top,
            skip: query.skip,
        });

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        signal.check()?;

        if let Some(msg) = self.error_on_pages.lock().unwrap().as_ref() {
            return Err(server_error(msg));
        }

        let mut versions = self.named_versions.clone();
        versions.sort_by(|a, b| b.changeset_index.cmp(&a.changeset_index));
        Ok(versions
            .into_iter()
            .skip(query.skip)
            .take(query.top)
            .collect())
    }
}

/// Mock comparison job service
///
/// Features:
/// - Jobs stored by ID; POST creates a queued job
/// - Scripted state transitions applied one per GET
/// - Call tracking for verification
/// - Error injection for transient GET failures
pub struct MockComparisonJobs {
    jobs: Mutex<HashMap<String, ComparisonJob>>,
    scripts: Mutex<HashMap<String, VecDeque<JobState>>>,
    payload: Mutex<ChangedElementsPayload>,
    // Call tracking
    get_calls: Mutex<Vec<String>>,
    post_calls: Mutex<Vec<NewComparisonJob>>,
    delete_calls: Mutex<Vec<String>>,
    result_calls: AtomicUsize,
    // Error injection
    failing_gets: AtomicUsize,
    error_on_post: Mutex<Option<String>>,
}

impl Default for MockComparisonJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockComparisonJobs {
    /// Service with no jobs
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            scripts: Mutex::new(HashMap::new()),
            payload: Mutex::new(ChangedElementsPayload::default()),
            get_calls: Mutex::new(Vec::new()),
            post_calls: Mutex::new(Vec::new()),
            delete_calls: Mutex::new(Vec::new()),
            result_calls: AtomicUsize::new(0),
            failing_gets: AtomicUsize::new(0),
            error_on_post: Mutex::new(None),
        }
    }

    /// Store a job as if created earlier
    pub fn insert_job(&self, job: ComparisonJob) {
        self.jobs.lock().unwrap().insert(job.id.clone(), job);
    }

    /// States the job moves through, one per GET
    pub fn script(&self, job_id: &str, states: &[JobState]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), states.iter().copied().collect());
    }

    /// Result served for completed jobs
    pub fn set_payload(&self, payload: ChangedElementsPayload) {
        *self.payload.lock().unwrap() = payload;
    }

    /// Stored job by ID
    pub fn job(&self, job_id: &str) -> Option<ComparisonJob> {
        self.jobs.lock().unwrap().get(job_id).cloned()
    }

    // === Error injection methods ===

    /// Make the next `count` GETs fail with a server error
    pub fn fail_next_gets(&self, count: usize) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }

    /// Make `post_comparison_job` return an error
    pub fn fail_post(&self, msg: &str) {
        *self.error_on_post.lock().unwrap() = Some(msg.to_string());
    }

    // === Call verification methods ===

    /// Job IDs `get_comparison_job` was called with
    pub fn get_get_calls(&self) -> Vec<String> {
        self.get_calls.lock().unwrap().clone()
    }

    /// All `post_comparison_job` calls
    pub fn get_post_calls(&self) -> Vec<NewComparisonJob> {
        self.post_calls.lock().unwrap().clone()
    }

    /// Job IDs `delete_comparison_job` was called with
    pub fn get_delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }

    /// Number of result downloads
    pub fn result_call_count(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    /// Assert that a job was posted for the `start-end` range
    pub fn assert_posted(&self, start: &str, end: &str) {
        let calls = self.get_post_calls();
        assert!(
            calls
                .iter()
                .any(|c| c.start_changeset_id == start && c.end_changeset_id == end),
            "Expected post_comparison_job({start}, {end}) but got: {calls:?}"
        );
    }
}

#[async_trait]
impl ComparisonJobApi for MockComparisonJobs {
    async fn get_comparison_job(&self, key: &JobKey, signal: &AbortSignal) -> Result<ComparisonJob> {
        self.get_calls.lock().unwrap().push(key.job_id.clone());
        signal.check()?;

        let failing = self.failing_gets.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_gets.store(failing - 1, Ordering::SeqCst);
            return Err(server_error("comparison service unavailable"));
        }

        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&key.job_id) else {
            return Err(Error::Api {
                status: 404,
                code: COMPARISON_NOT_FOUND.to_string(),
                message: format!("no job {}", key.job_id),
            });
        };

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&key.job_id)
            .and_then(VecDeque::pop_front);
        if let Some(state) = next {
            job.status = state;
            match state {
                JobState::Started => {
                    job.current_progress = Some(job.current_progress.unwrap_or(0) + 1);
                    job.max_progress = Some(10);
                }
                JobState::Completed => {
                    job.comparison = Some(Link {
                        href: format!("https://results.example/{}.json", job.id),
                    });
                }
                JobState::Failed => job.error_details = Some("worker crashed".to_string()),
                JobState::Queued => {}
            }
        }
        Ok(job.clone())
    }

    async fn post_comparison_job(
        &self,
        job: &NewComparisonJob,
        signal: &AbortSignal,
    ) -> Result<ComparisonJob> {
        self.post_calls.lock().unwrap().push(job.clone());
        signal.check()?;

        if let Some(msg) = self.error_on_post.lock().unwrap().as_ref() {
            return Err(server_error(msg));
        }

        let created = ComparisonJob {
            id: job.key().job_id,
            status: JobState::Queued,
            itwin_id: job.itwin_id.clone(),
            imodel_id: job.imodel_id.clone(),
            start_changeset_id: job.start_changeset_id.clone(),
            end_changeset_id: job.end_changeset_id.clone(),
            current_progress: None,
            max_progress: None,
            error_details: None,
            comparison: None,
        };
        self.insert_job(created.clone());
        Ok(created)
    }

    async fn delete_comparison_job(&self, key: &JobKey) -> Result<()> {
        self.delete_calls.lock().unwrap().push(key.job_id.clone());
        self.jobs.lock().unwrap().remove(&key.job_id);
        Ok(())
    }

    async fn get_comparison_job_result(
        &self,
        job: &ComparisonJob,
        signal: &AbortSignal,
    ) -> Result<ChangedElementsPayload> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        signal.check()?;
        if job.comparison.is_none() {
            return Err(Error::MissingComparisonResult(job.id.clone()));
        }
        Ok(self.payload.lock().unwrap().clone())
    }
}
