//! Client configuration
//!
//! Defaults target the public iTwin platform; each value can be overridden
//! from the environment.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default iTwin platform API root
pub const DEFAULT_API_URL: &str = "https://api.bentley.com";

/// Named versions fetched per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Attempts made to get-or-create a comparison job
pub const DEFAULT_JOB_RETRY_ATTEMPTS: u32 = 3;

/// Delay between job creation attempts
pub const DEFAULT_JOB_RETRY_DELAY: Duration = Duration::from_millis(5000);

/// Delay between job status polls
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5);

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retry budget for comparison job creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Wait between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_JOB_RETRY_ATTEMPTS,
            delay: DEFAULT_JOB_RETRY_DELAY,
        }
    }
}

/// Settings shared by the API clients, loader and orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root of the iModels API (`{root}/imodels/...`)
    pub imodels_base_url: String,
    /// Root of the comparison job API (`{root}/comparisonJob/...`)
    pub comparison_base_url: String,
    /// Named versions per page
    pub page_size: usize,
    /// Interval between job status polls
    pub polling_interval: Duration,
    /// Job creation retry budget
    pub job_retry: RetryPolicy,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// List hidden named versions too
    pub include_hidden_versions: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_api_url(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Config with both services under one platform root
    pub fn with_api_url(api_url: &str) -> Self {
        let root = api_url.trim_end_matches('/');
        Self {
            imodels_base_url: format!("{root}/imodels"),
            comparison_base_url: format!("{root}/changedelements"),
            page_size: DEFAULT_PAGE_SIZE,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            job_retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            include_hidden_versions: false,
        }
    }

    /// Load from process environment
    ///
    /// Reads:
    /// - `ITWIN_API_URL`
    /// - `VCOMPARE_PAGE_SIZE`
    /// - `VCOMPARE_POLL_INTERVAL_MS`
    /// - `VCOMPARE_INCLUDE_HIDDEN`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using a custom variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = lookup("ITWIN_API_URL")
            .map_or_else(Self::default, |url| Self::with_api_url(&url));

        if let Some(raw) = lookup("VCOMPARE_PAGE_SIZE") {
            let page_size: usize = raw
                .parse()
                .map_err(|_| Error::Config(format!("VCOMPARE_PAGE_SIZE is not a number: {raw}")))?;
            if page_size == 0 {
                return Err(Error::Config("VCOMPARE_PAGE_SIZE must be positive".to_string()));
            }
            config.page_size = page_size;
        }

        if let Some(raw) = lookup("VCOMPARE_POLL_INTERVAL_MS") {
            let millis: u64 = raw.parse().map_err(|_| {
                Error::Config(format!("VCOMPARE_POLL_INTERVAL_MS is not a number: {raw}"))
            })?;
            config.polling_interval = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup("VCOMPARE_INCLUDE_HIDDEN") {
            config.include_hidden_versions = matches!(raw.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.imodels_base_url, "https://api.bentley.com/imodels");
        assert_eq!(config.comparison_base_url, "https://api.bentley.com/changedelements");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.job_retry.attempts, 3);
        assert_eq!(config.job_retry.delay, Duration::from_millis(5000));
        assert!(!config.include_hidden_versions);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("ITWIN_API_URL", "https://qa-api.bentley.com/"),
            ("VCOMPARE_PAGE_SIZE", "5"),
            ("VCOMPARE_POLL_INTERVAL_MS", "250"),
            ("VCOMPARE_INCLUDE_HIDDEN", "true"),
        ]))
        .unwrap();

        assert_eq!(config.imodels_base_url, "https://qa-api.bentley.com/imodels");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.polling_interval, Duration::from_millis(250));
        assert!(config.include_hidden_versions);
    }

    #[test]
    fn test_invalid_page_size() {
        let err = ClientConfig::from_lookup(lookup_from(&[("VCOMPARE_PAGE_SIZE", "lots")]));
        assert!(matches!(err, Err(Error::Config(_))));

        let err = ClientConfig::from_lookup(lookup_from(&[("VCOMPARE_PAGE_SIZE", "0")]));
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
