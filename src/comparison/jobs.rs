//! Comparison job creation and status queries

use crate::abort::{self, AbortSignal};
use crate::api::{ComparisonJobApi, NewComparisonJob};
use crate::comparison::{ComparisonProgress, JobWatcher};
use crate::config::RetryPolicy;
use crate::elements::ChangedElementsPayload;
use crate::error::{Error, Result};
use crate::types::{
    ComparisonJob, ComparisonJobStatus, JobProgress, JobState, NamedVersionWithTarget,
    VersionCompareEntry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where comparisons run: the open iModel and changeset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonContext {
    /// Owning iTwin
    pub itwin_id: String,
    /// Open iModel
    pub imodel_id: String,
    /// Open changeset, the end of every comparison range
    pub current_changeset_id: String,
}

/// Map a server job onto the client status
pub fn to_job_status(job: &ComparisonJob) -> ComparisonJobStatus {
    let job_id = job.id.clone();
    match job.status {
        JobState::Queued => ComparisonJobStatus::Queued { job_id },
        JobState::Started => ComparisonJobStatus::Started {
            job_id,
            progress: JobProgress {
                current: job.current_progress.unwrap_or(0),
                max: job.max_progress.unwrap_or(0),
            },
        },
        JobState::Completed => ComparisonJobStatus::Completed {
            job_id,
            comparison_url: job
                .comparison
                .as_ref()
                .map(|link| link.href.clone())
                .unwrap_or_default(),
        },
        JobState::Failed => ComparisonJobStatus::Failed {
            job_id,
            error_details: job.error_details.clone(),
        },
    }
}

/// Get the job for `job`'s changeset range, creating it when needed
///
/// An existing job is returned as is unless it failed, in which case it is
/// deleted and posted again. The whole get-or-create step is retried on
/// error, waiting `retry.delay` between attempts. Aborts are not retried.
pub async fn post_or_get_comparison_job(
    client: &dyn ComparisonJobApi,
    job: &NewComparisonJob,
    retry: &RetryPolicy,
    signal: &AbortSignal,
) -> Result<ComparisonJob> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match try_post_or_get(client, job, signal).await {
            Ok(found) => return Ok(found),
            Err(e) if e.is_abort() || attempt >= attempts => return Err(e),
            Err(e) => {
                warn!("Comparison job attempt {attempt}/{attempts} failed: {e}");
                abort::sleep(retry.delay, signal).await?;
                attempt += 1;
            }
        }
    }
}

async fn try_post_or_get(
    client: &dyn ComparisonJobApi,
    job: &NewComparisonJob,
    signal: &AbortSignal,
) -> Result<ComparisonJob> {
    let key = job.key();
    match client.get_comparison_job(&key, signal).await {
        Ok(existing) if existing.status == JobState::Failed => {
            info!("Comparison job {} failed earlier, recreating", key.job_id);
            client.delete_comparison_job(&key).await?;
            client.post_comparison_job(job, signal).await
        }
        Ok(existing) => {
            debug!("Reusing comparison job {}", key.job_id);
            Ok(existing)
        }
        Err(e) if e.is_comparison_not_found() => {
            info!("Creating comparison job {}", key.job_id);
            client.post_comparison_job(job, signal).await
        }
        Err(e) => Err(e),
    }
}

/// A job returned by [`ComparisonJobs::start_job`]
pub struct StartedJob {
    /// The job as last fetched
    pub job: ComparisonJob,
    client: Arc<dyn ComparisonJobApi>,
    new_job: NewComparisonJob,
}

impl StartedJob {
    /// Client view of the job
    pub fn status(&self) -> ComparisonJobStatus {
        to_job_status(&self.job)
    }

    /// Poll the job every `interval` until it completes or fails
    pub fn watch(&self, interval: Duration, signal: AbortSignal) -> JobWatcher {
        JobWatcher::new(
            Arc::clone(&self.client),
            self.new_job.key(),
            self.job.clone(),
            interval,
            signal,
        )
    }
}

/// Comparison jobs of one open iModel and changeset
pub struct ComparisonJobs {
    client: Arc<dyn ComparisonJobApi>,
    context: ComparisonContext,
    retry: RetryPolicy,
}

impl ComparisonJobs {
    /// Create an orchestrator for `context`
    pub fn new(
        client: Arc<dyn ComparisonJobApi>,
        context: ComparisonContext,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            context,
            retry,
        }
    }

    /// The open iModel and changeset
    pub const fn context(&self) -> &ComparisonContext {
        &self.context
    }

    /// Job request comparing `version` with the open changeset
    pub fn new_job(&self, version: &NamedVersionWithTarget) -> NewComparisonJob {
        NewComparisonJob {
            itwin_id: self.context.itwin_id.clone(),
            imodel_id: self.context.imodel_id.clone(),
            start_changeset_id: version.target_changeset_id.clone(),
            end_changeset_id: self.context.current_changeset_id.clone(),
        }
    }

    /// Status of the job for the entry whose named version is
    /// `target_version_id`
    ///
    /// `None` when the version is not among `entries` or no job exists yet.
    pub async fn query_job_status(
        &self,
        entries: &[VersionCompareEntry],
        target_version_id: &str,
        signal: &AbortSignal,
    ) -> Result<Option<ComparisonJobStatus>> {
        let Some(entry) = entries
            .iter()
            .find(|e| e.named_version.named_version.id == target_version_id)
        else {
            return Ok(None);
        };

        let key = self.new_job(&entry.named_version).key();
        match self.client.get_comparison_job(&key, signal).await {
            Ok(job) => Ok(Some(to_job_status(&job))),
            Err(e) if e.is_comparison_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get or create the job comparing `version` with the open changeset
    pub async fn start_job(
        &self,
        version: &NamedVersionWithTarget,
        signal: &AbortSignal,
    ) -> Result<StartedJob> {
        let new_job = self.new_job(version);
        let job = post_or_get_comparison_job(self.client.as_ref(), &new_job, &self.retry, signal).await?;
        Ok(StartedJob {
            job,
            client: Arc::clone(&self.client),
            new_job,
        })
    }

    /// Start (or reuse) a job and poll it to the end, reporting every status
    ///
    /// Returns the final job, completed or failed.
    pub async fn run(
        &self,
        version: &NamedVersionWithTarget,
        polling_interval: Duration,
        progress: &dyn ComparisonProgress,
        signal: &AbortSignal,
    ) -> Result<ComparisonJob> {
        progress
            .on_message(&format!(
                "Comparing {} with the open changeset",
                version.named_version.display_name
            ))
            .await;

        let started = self.start_job(version, signal).await?;
        progress.on_status(&started.status()).await;

        let mut watcher = started.watch(polling_interval, signal.clone());
        while let Some(status) = watcher.next().await {
            progress.on_status(&status?).await;
        }
        signal.check()?;
        Ok(watcher.into_job())
    }

    /// Download the changed elements of a completed job
    pub async fn get_result(
        &self,
        job: &ComparisonJob,
        signal: &AbortSignal,
    ) -> Result<ChangedElementsPayload> {
        if job.status != JobState::Completed {
            return Err(Error::MissingComparisonResult(job.id.clone()));
        }
        self.client.get_comparison_job_result(job, signal).await
    }

    /// Delete the job comparing `version` with the open changeset
    pub async fn delete_job(&self, version: &NamedVersionWithTarget) -> Result<()> {
        self.client.delete_comparison_job(&self.new_job(version).key()).await
    }
}
