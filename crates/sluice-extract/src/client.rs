//! HTTP client for the `JSONPlaceholder`-style REST API.
//!
//! Each resource is a plain `GET {base}/{resource}` returning a JSON array.
//! Failed requests go through [`retry_with_backoff`](crate::retry) before
//! the error reaches the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use sluice_core::config::DEFAULT_API_BASE_URL;
use sluice_core::AppConfig;

use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::retry::retry_with_backoff;
use crate::types::{RawRecord, Resource};

const USER_AGENT: &str = concat!("sluice/", env!("CARGO_PKG_VERSION"), " (etl-pipeline)");
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

impl ExtractConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            timeout_secs: config.api_timeout_secs,
            max_retries: config.api_max_retries,
            backoff_base_ms: config.api_retry_backoff_base_ms,
        }
    }
}

/// [`Extractor`] backed by the REST API.
///
/// Use [`PlaceholderClient::new`] with the configured settings or
/// [`PlaceholderClient::with_base_url`] to point at a mock server in tests.
pub struct PlaceholderClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PlaceholderClient {
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ExtractError::InvalidBaseUrl`] if
    /// `config.base_url` does not parse.
    pub fn new(config: &ExtractConfig) -> Result<Self, ExtractError> {
        Ok(Self::with_base_url(&config.base_url, config.timeout_secs)?
            .with_retry(config.max_retries, config.backoff_base_ms))
    }

    /// A client with no retries, for tests against a mock server.
    ///
    /// # Errors
    ///
    /// See [`PlaceholderClient::new`].
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        // Exactly one trailing slash, so joining a resource path appends to
        // the base path instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ExtractError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    fn resource_url(&self, resource: Resource) -> Result<Url, ExtractError> {
        self.base_url
            .join(resource.path())
            .map_err(|e| ExtractError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// One attempt at fetching `resource`, without retries.
    async fn fetch_once(
        &self,
        resource: Resource,
        url: &Url,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        tracing::debug!(%resource, %url, "requesting resource");
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ExtractError::Deserialize {
                context: url.to_string(),
                source: e,
            })?;

        match value {
            serde_json::Value::Array(records) => Ok(records),
            other => Err(ExtractError::UnexpectedShape {
                resource,
                found: json_kind(&other),
            }),
        }
    }
}

#[async_trait]
impl Extractor for PlaceholderClient {
    async fn extract(&self, resource: Resource) -> Result<Vec<RawRecord>, ExtractError> {
        let url = self.resource_url(resource)?;
        let records = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.fetch_once(resource, &url)
        })
        .await?;
        tracing::info!(%resource, count = records.len(), "extracted records");
        Ok(records)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
