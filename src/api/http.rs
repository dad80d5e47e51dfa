//! Authenticated JSON requests and HAL pagination

use crate::abort::AbortSignal;
use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Versioned media type of the iTwin platform APIs
pub const ITWIN_V2_ACCEPT: &str = "application/vnd.bentley.itwin-platform.v2+json";

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
}

/// A single API request
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: &'a str,
    /// Extra headers
    pub headers: &'a [(&'a str, &'a str)],
    /// JSON body
    pub body: Option<&'a Value>,
    /// Send the `Authorization` header
    pub authenticated: bool,
}

impl<'a> ApiRequest<'a> {
    /// Authenticated GET with default headers
    pub fn get(url: &'a str) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: &[],
            body: None,
            authenticated: true,
        }
    }

    /// Authenticated request with a JSON body
    pub fn with_body(method: Method, url: &'a str, body: &'a Value) -> Self {
        Self {
            method,
            url,
            headers: &[],
            body: Some(body),
            authenticated: true,
        }
    }

    /// Replace extra headers
    #[must_use]
    pub fn headers(mut self, headers: &'a [(&'a str, &'a str)]) -> Self {
        self.headers = headers;
        self
    }

    /// Skip the `Authorization` header (pre-signed URLs)
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// Thin authenticated wrapper around `reqwest`
#[derive(Clone)]
pub struct ITwinApi {
    client: Client,
    token: Arc<dyn TokenProvider>,
}

impl ITwinApi {
    /// Create a new API wrapper
    pub fn new(config: &ClientConfig, token: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, token })
    }

    /// Send a request and decode the JSON response
    pub async fn call_api<T: DeserializeOwned>(
        &self,
        request: ApiRequest<'_>,
        signal: &AbortSignal,
    ) -> Result<T> {
        let response = self.send(request, signal).await?;
        let body = response.json::<T>().await?;
        signal.check()?;
        Ok(body)
    }

    /// Send a request whose response carries no body
    pub async fn call_api_empty(&self, request: ApiRequest<'_>, signal: &AbortSignal) -> Result<()> {
        self.send(request, signal).await?;
        Ok(())
    }

    /// Follow HAL `_links` starting at `url`, one page per call
    pub fn call_paged_api(
        &self,
        url: impl Into<String>,
        backwards: bool,
        signal: AbortSignal,
    ) -> PagedRequest<'_> {
        PagedRequest {
            api: self,
            next_url: Some(url.into()),
            backwards,
            signal,
        }
    }

    async fn send(&self, request: ApiRequest<'_>, signal: &AbortSignal) -> Result<Response> {
        signal.check()?;
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url)
            .header(reqwest::header::ACCEPT, ITWIN_V2_ACCEPT);

        if request.authenticated {
            let token = self.token.access_token().await?;
            builder = builder.header(reqwest::header::AUTHORIZATION, token);
        }

        for (name, value) in request.headers {
            builder = builder.header(*name, *value);
        }

        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        // The request is not preempted; a late result is discarded instead
        signal.check()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &text))
    }
}

/// Build a structured error from a non-2xx response body
pub fn error_from_body(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => Error::Api {
            status: status.as_u16(),
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => Error::BadStatus {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        },
    }
}

/// Extract `_links.{rel}.href` from a HAL page
pub fn link_href(page: &Value, rel: &str) -> Option<String> {
    page.get("_links")?
        .get(rel)?
        .get("href")?
        .as_str()
        .filter(|href| !href.is_empty())
        .map(ToString::to_string)
}

/// Lazy, forward-only (or backward-only) walk over HAL pages
pub struct PagedRequest<'a> {
    api: &'a ITwinApi,
    next_url: Option<String>,
    backwards: bool,
    signal: AbortSignal,
}

impl PagedRequest<'_> {
    /// Fetch the next page, or `None` once the links run out
    pub async fn next_page(&mut self) -> Result<Option<Value>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };

        let page: Value = self.api.call_api(ApiRequest::get(&url), &self.signal).await?;
        let rel = if self.backwards { "prev" } else { "next" };
        self.next_url = link_href(&page, rel);
        Ok(Some(page))
    }

    /// Collect the array under `key` from every remaining page
    pub async fn collect_all<T: DeserializeOwned>(mut self, key: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(mut page) = self.next_page().await? {
            if let Some(values) = page.get_mut(key).map(Value::take) {
                items.extend(serde_json::from_value::<Vec<T>>(values)?);
            }
        }
        Ok(items)
    }
}
