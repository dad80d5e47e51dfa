//! iModels API client: changesets and named versions

use crate::abort::AbortSignal;
use crate::api::http::{ApiRequest, ITwinApi};
use crate::api::IModelsApi;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::types::{Changeset, NamedVersion, NamedVersionState};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// Page size used when listing every changeset
const CHANGESETS_PAGE_SIZE: usize = 1000;

/// Sort direction for named version listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first
    Ascending,
    /// Newest first
    #[default]
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        })
    }
}

/// Parameters for one page of named versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedVersionQuery {
    /// iModel to list
    pub imodel_id: String,
    /// Page size (`$top`)
    pub top: usize,
    /// Rows to skip (`$skip`)
    pub skip: usize,
    /// Property to order by (`$orderBy`)
    pub order_by: Option<String>,
    /// Direction of `order_by`
    pub order: SortOrder,
}

impl NamedVersionQuery {
    /// Page of versions ordered by changeset index, newest first
    pub fn newest_first(imodel_id: impl Into<String>, top: usize, skip: usize) -> Self {
        Self {
            imodel_id: imodel_id.into(),
            top,
            skip,
            order_by: Some("changesetIndex".to_string()),
            order: SortOrder::Descending,
        }
    }
}

#[derive(Deserialize)]
struct ChangesetResponse {
    changeset: Changeset,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedVersionsResponse {
    named_versions: Vec<NamedVersion>,
}

/// iModels service using reqwest
pub struct IModelsClient {
    api: ITwinApi,
    base_url: String,
    include_hidden: bool,
}

impl IModelsClient {
    /// Create a new iModels client
    pub fn new(api: ITwinApi, config: &ClientConfig) -> Self {
        Self {
            api,
            base_url: config.imodels_base_url.trim_end_matches('/').to_string(),
            include_hidden: config.include_hidden_versions,
        }
    }

    fn imodel_url(&self, imodel_id: &str, path: &str) -> String {
        format!(
            "{}/{}{}",
            self.base_url,
            urlencoding::encode(imodel_id),
            path
        )
    }

    fn named_versions_url(&self, query: &NamedVersionQuery) -> Result<String> {
        let mut url = url::Url::parse(&self.imodel_url(&query.imodel_id, "/namedversions"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("$top", &query.top.to_string());
            pairs.append_pair("$skip", &query.skip.to_string());
            if let Some(order_by) = &query.order_by {
                pairs.append_pair("$orderBy", &format!("{order_by} {}", query.order));
            }
            if !self.include_hidden {
                pairs.append_pair("$filter", "state eq 'visible'");
            }
        }
        Ok(url.into())
    }
}

#[async_trait]
impl IModelsApi for IModelsClient {
    async fn get_changeset(
        &self,
        imodel_id: &str,
        changeset_id: &str,
        signal: &AbortSignal,
    ) -> Result<Option<Changeset>> {
        let url = self.imodel_url(
            imodel_id,
            &format!("/changesets/{}", urlencoding::encode(changeset_id)),
        );

        match self
            .api
            .call_api::<ChangesetResponse>(ApiRequest::get(&url), signal)
            .await
        {
            Ok(response) => Ok(Some(response.changeset)),
            Err(e) if e.is_not_found() => {
                debug!("Changeset {changeset_id} not found in {imodel_id}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_changesets(&self, imodel_id: &str, signal: &AbortSignal) -> Result<Vec<Changeset>> {
        let url = format!(
            "{}?$top={CHANGESETS_PAGE_SIZE}",
            self.imodel_url(imodel_id, "/changesets")
        );

        self.api
            .call_paged_api(url, false, signal.clone())
            .collect_all("changesets")
            .await
    }

    async fn get_named_versions(
        &self,
        query: &NamedVersionQuery,
        signal: &AbortSignal,
    ) -> Result<Vec<NamedVersion>> {
        let url = self.named_versions_url(query)?;
        let response: NamedVersionsResponse = self
            .api
            .call_api(
                ApiRequest::get(&url).headers(&[("Prefer", "return=representation")]),
                signal,
            )
            .await?;

        let include_hidden = self.include_hidden;
        Ok(response
            .named_versions
            .into_iter()
            .filter(|nv| include_hidden || nv.state != NamedVersionState::Hidden)
            .collect())
    }
}
