//! Progress callback trait for interface-agnostic job updates
//!
//! Lets a CLI spinner, a log, or a UI follow a comparison while it runs.

use crate::types::ComparisonJobStatus;
use async_trait::async_trait;

/// Progress callback trait
#[async_trait]
pub trait ComparisonProgress: Send + Sync {
    /// Called with every status the job goes through
    async fn on_status(&self, status: &ComparisonJobStatus);

    /// Called with a general status message
    async fn on_message(&self, message: &str);
}

/// No-op progress callback for testing or when progress isn't needed
pub struct NoopProgress;

#[async_trait]
impl ComparisonProgress for NoopProgress {
    async fn on_status(&self, _status: &ComparisonJobStatus) {}
    async fn on_message(&self, _message: &str) {}
}
