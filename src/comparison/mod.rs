//! Comparison job orchestration
//!
//! Jobs are keyed by their changeset range, so asking twice for the same
//! comparison finds the first job instead of creating a second one.

mod jobs;
mod progress;
mod watcher;

pub use jobs::{
    post_or_get_comparison_job, to_job_status, ComparisonContext, ComparisonJobs, StartedJob,
};
pub use progress::{ComparisonProgress, NoopProgress};
pub use watcher::JobWatcher;
