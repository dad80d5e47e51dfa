//! Comparison job API client

use crate::abort::AbortSignal;
use crate::api::http::{ApiRequest, ITwinApi};
use crate::api::ComparisonJobApi;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::elements::ChangedElementsPayload;
use crate::types::ComparisonJob;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Identifies a comparison job
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    /// Owning iTwin
    pub itwin_id: String,
    /// Owning iModel
    pub imodel_id: String,
    /// Deterministic job ID
    pub job_id: String,
}

/// Arguments for creating a comparison job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComparisonJob {
    /// Owning iTwin
    #[serde(rename = "iTwinId")]
    pub itwin_id: String,
    /// Owning iModel
    #[serde(rename = "iModelId")]
    pub imodel_id: String,
    /// First changeset of the range
    pub start_changeset_id: String,
    /// Last changeset of the range
    pub end_changeset_id: String,
}

impl NewComparisonJob {
    /// Key of the job this request creates
    pub fn key(&self) -> JobKey {
        JobKey {
            itwin_id: self.itwin_id.clone(),
            imodel_id: self.imodel_id.clone(),
            job_id: comparison_job_id(&self.start_changeset_id, &self.end_changeset_id),
        }
    }
}

/// Deterministic job ID for a changeset range
pub fn comparison_job_id(start_changeset_id: &str, end_changeset_id: &str) -> String {
    format!("{start_changeset_id}-{end_changeset_id}")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonJobResponse {
    comparison_job: ComparisonJob,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonResultResponse {
    changed_elements: ChangedElementsPayload,
}

/// Comparison job service using reqwest
pub struct ComparisonJobClient {
    api: ITwinApi,
    base_url: String,
}

impl ComparisonJobClient {
    /// Create a new comparison job client
    pub fn new(api: ITwinApi, config: &ClientConfig) -> Self {
        Self {
            api,
            base_url: config.comparison_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn job_url(&self, key: &JobKey) -> String {
        format!(
            "{}/comparisonJob/{}/iTwin/{}/iModel/{}",
            self.base_url,
            urlencoding::encode(&key.job_id),
            urlencoding::encode(&key.itwin_id),
            urlencoding::encode(&key.imodel_id)
        )
    }
}

#[async_trait]
impl ComparisonJobApi for ComparisonJobClient {
    async fn get_comparison_job(&self, key: &JobKey, signal: &AbortSignal) -> Result<ComparisonJob> {
        let url = self.job_url(key);
        let response: ComparisonJobResponse =
            self.api.call_api(ApiRequest::get(&url), signal).await?;
        Ok(response.comparison_job)
    }

    async fn post_comparison_job(
        &self,
        job: &NewComparisonJob,
        signal: &AbortSignal,
    ) -> Result<ComparisonJob> {
        let url = format!("{}/comparisonJob", self.base_url);
        let body = serde_json::to_value(job)?;
        let response: ComparisonJobResponse = self
            .api
            .call_api(ApiRequest::with_body(Method::POST, &url, &body), signal)
            .await?;
        Ok(response.comparison_job)
    }

    async fn delete_comparison_job(&self, key: &JobKey) -> Result<()> {
        let url = self.job_url(key);
        let request = ApiRequest {
            method: Method::DELETE,
            ..ApiRequest::get(&url)
        };
        self.api.call_api_empty(request, &AbortSignal::never()).await
    }

    async fn get_comparison_job_result(
        &self,
        job: &ComparisonJob,
        signal: &AbortSignal,
    ) -> Result<ChangedElementsPayload> {
        let href = job
            .comparison
            .as_ref()
            .map(|link| link.href.as_str())
            .ok_or_else(|| Error::MissingComparisonResult(job.id.clone()))?;

        // Pre-signed location: no Authorization header
        let response: ComparisonResultResponse = self
            .api
            .call_api(ApiRequest::get(href).anonymous(), signal)
            .await?;
        Ok(response.changed_elements)
    }
}
