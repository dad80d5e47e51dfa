//! Shared command setup: clients, baseline changeset, version lookup

use std::sync::Arc;
use tracing::debug;
use version_compare::abort::AbortSignal;
use version_compare::api::{ComparisonJobClient, IModelsApi, IModelsClient, ITwinApi};
use version_compare::auth::{get_env_auth, StaticTokenProvider, TokenProvider};
use version_compare::comparison::{ComparisonContext, ComparisonJobs};
use version_compare::config::ClientConfig;
use version_compare::error::{Error, Result};
use version_compare::types::VersionCompareEntry;
use version_compare::versions::{LoaderKey, NamedVersionLoader};

/// Which iModel and changeset a command works on
#[derive(Debug, Clone, Default)]
pub struct Target {
    /// Owning iTwin (needed for comparison jobs)
    pub itwin_id: Option<String>,
    /// iModel to browse
    pub imodel_id: Option<String>,
    /// Open changeset; latest when unset
    pub changeset: Option<String>,
    /// Access token; environment when unset
    pub token: Option<String>,
}

/// Connected clients for one iModel and baseline changeset
pub struct Session {
    /// Client settings
    pub config: ClientConfig,
    imodels: Arc<IModelsClient>,
    jobs_client: Arc<ComparisonJobClient>,
    itwin_id: Option<String>,
    /// iModel being browsed
    pub imodel_id: String,
    /// Baseline changeset
    pub changeset_id: String,
}

impl Session {
    /// Build clients and resolve the baseline changeset
    pub async fn connect(target: Target, signal: &AbortSignal) -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let token: Arc<dyn TokenProvider> = match target.token {
            Some(token) => Arc::new(StaticTokenProvider::new(token)),
            None => Arc::new(get_env_auth()?),
        };
        let imodel_id = target.imodel_id.ok_or_else(|| {
            Error::Config("missing iModel ID: pass --imodel-id or set IMODEL_ID".to_string())
        })?;

        let api = ITwinApi::new(&config, token)?;
        let imodels = Arc::new(IModelsClient::new(api.clone(), &config));
        let jobs_client = Arc::new(ComparisonJobClient::new(api, &config));

        let changeset_id = match target.changeset {
            Some(id) => id,
            None => {
                let changesets = imodels.get_changesets(&imodel_id, signal).await?;
                let latest = changesets
                    .last()
                    .ok_or_else(|| Error::Config(format!("iModel {imodel_id} has no changesets")))?;
                debug!("Using latest changeset #{} ({})", latest.index, latest.id);
                latest.id.clone()
            }
        };

        Ok(Self {
            config,
            imodels,
            jobs_client,
            itwin_id: target.itwin_id,
            imodel_id,
            changeset_id,
        })
    }

    /// A fresh loader for this iModel and baseline
    pub fn loader(&self) -> NamedVersionLoader {
        NamedVersionLoader::new(
            self.imodels.clone(),
            LoaderKey::new(&self.imodel_id, &self.changeset_id),
            self.config.page_size,
        )
    }

    /// Comparison jobs against the baseline
    pub fn jobs(&self) -> Result<ComparisonJobs> {
        let itwin_id = self.itwin_id.clone().ok_or_else(|| {
            Error::Config("missing iTwin ID: pass --itwin-id or set ITWIN_ID".to_string())
        })?;
        Ok(ComparisonJobs::new(
            self.jobs_client.clone(),
            ComparisonContext {
                itwin_id,
                imodel_id: self.imodel_id.clone(),
                current_changeset_id: self.changeset_id.clone(),
            },
            self.config.job_retry,
        ))
    }
}

/// Load the baseline and up to `max_pages` pages (all when `None`)
pub async fn load_pages(
    loader: &NamedVersionLoader,
    max_pages: Option<usize>,
    signal: &AbortSignal,
) -> Result<()> {
    loader.load().await;
    check(loader, signal)?;

    let mut pages = 0;
    while loader.has_next_page() && max_pages.is_none_or(|max| pages < max) {
        loader.load_next_page().await;
        check(loader, signal)?;
        pages += 1;
    }
    Ok(())
}

/// Find a version by ID or display name, paging until found
pub async fn find_version(
    loader: &NamedVersionLoader,
    query: &str,
    signal: &AbortSignal,
) -> Result<VersionCompareEntry> {
    loader.load().await;
    check(loader, signal)?;

    loop {
        let found = loader.entries().into_iter().find(|e| {
            let version = &e.named_version.named_version;
            version.id == query || version.display_name == query
        });
        if let Some(entry) = found {
            return Ok(entry);
        }
        if !loader.has_next_page() {
            return Err(Error::VersionNotFound(query.to_string()));
        }
        loader.load_next_page().await;
        check(loader, signal)?;
    }
}

/// Loader errors are state, not return values; surface them here
fn check(loader: &NamedVersionLoader, signal: &AbortSignal) -> Result<()> {
    signal.check()?;
    let snapshot = loader.snapshot();
    if snapshot.is_error {
        return Err(Error::Loader(
            snapshot.last_error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    Ok(())
}
