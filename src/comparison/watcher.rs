//! Comparison job polling

use crate::abort::{self, AbortSignal};
use crate::api::{ComparisonJobApi, JobKey};
use crate::comparison::to_job_status;
use crate::error::Result;
use crate::types::{ComparisonJob, ComparisonJobStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Polls a job while it is queued or started
///
/// Each [`next`](Self::next) call waits one interval, re-fetches the job and
/// yields its status. The first completed or failed status is yielded once,
/// after which the watcher is exhausted. A job that is already finished
/// yields nothing. Aborting the signal ends the watcher quietly.
pub struct JobWatcher {
    client: Arc<dyn ComparisonJobApi>,
    key: JobKey,
    job: ComparisonJob,
    interval: Duration,
    signal: AbortSignal,
    done: bool,
}

impl JobWatcher {
    pub(crate) fn new(
        client: Arc<dyn ComparisonJobApi>,
        key: JobKey,
        job: ComparisonJob,
        interval: Duration,
        signal: AbortSignal,
    ) -> Self {
        let done = !to_job_status(&job).is_in_progress();
        Self {
            client,
            key,
            job,
            interval,
            signal,
            done,
        }
    }

    /// Next status, or `None` once the job finished or polling was aborted
    pub async fn next(&mut self) -> Option<Result<ComparisonJobStatus>> {
        if self.done {
            return None;
        }

        let polled = match abort::sleep(self.interval, &self.signal).await {
            Ok(()) => self.client.get_comparison_job(&self.key, &self.signal).await,
            Err(e) => Err(e),
        };

        match polled {
            Ok(job) => {
                let status = to_job_status(&job);
                debug!("Comparison job {}: {status}", self.key.job_id);
                if status.is_terminal() {
                    info!("Comparison job {} {status}", self.key.job_id);
                    self.done = true;
                }
                self.job = job;
                Some(Ok(status))
            }
            Err(e) => {
                self.done = true;
                if e.is_abort() {
                    debug!("Stopped watching comparison job {}", self.key.job_id);
                    None
                } else {
                    Some(Err(e))
                }
            }
        }
    }

    /// Whether polling has ended
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// The job as last fetched
    pub const fn job(&self) -> &ComparisonJob {
        &self.job
    }

    /// Consume the watcher, keeping the last fetched job
    pub fn into_job(self) -> ComparisonJob {
        self.job
    }
}
