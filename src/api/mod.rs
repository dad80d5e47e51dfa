//! Remote services: iModels (changesets, named versions) and comparison jobs
//!
//! Each service sits behind a trait so the loader and orchestrator can run
//! against in-memory doubles.

pub mod http;
mod comparison;
mod imodels;

pub use comparison::{comparison_job_id, ComparisonJobClient, JobKey, NewComparisonJob};
pub use http::{ApiRequest, ITwinApi, PagedRequest};
pub use imodels::{IModelsClient, NamedVersionQuery, SortOrder};

use crate::abort::AbortSignal;
use crate::elements::ChangedElementsPayload;
use crate::error::Result;
use crate::types::{Changeset, ComparisonJob, NamedVersion};
use async_trait::async_trait;

/// Changeset and named version lookups
#[async_trait]
pub trait IModelsApi: Send + Sync {
    /// Get one changeset by ID or by index (as a decimal string).
    /// Returns `None` when it does not exist.
    async fn get_changeset(
        &self,
        imodel_id: &str,
        changeset_id: &str,
        signal: &AbortSignal,
    ) -> Result<Option<Changeset>>;

    /// Get every changeset of an iModel, oldest first
    async fn get_changesets(&self, imodel_id: &str, signal: &AbortSignal) -> Result<Vec<Changeset>>;

    /// Get one page of named versions
    async fn get_named_versions(
        &self,
        query: &NamedVersionQuery,
        signal: &AbortSignal,
    ) -> Result<Vec<NamedVersion>>;
}

/// Comparison job create/get/delete and result download
#[async_trait]
pub trait ComparisonJobApi: Send + Sync {
    /// Get a job by key. Unknown jobs fail with a `ComparisonNotFound` error.
    async fn get_comparison_job(&self, key: &JobKey, signal: &AbortSignal) -> Result<ComparisonJob>;

    /// Create a job
    async fn post_comparison_job(
        &self,
        job: &NewComparisonJob,
        signal: &AbortSignal,
    ) -> Result<ComparisonJob>;

    /// Delete a job
    async fn delete_comparison_job(&self, key: &JobKey) -> Result<()>;

    /// Download the changed elements of a completed job
    async fn get_comparison_job_result(
        &self,
        job: &ComparisonJob,
        signal: &AbortSignal,
    ) -> Result<ChangedElementsPayload>;
}
