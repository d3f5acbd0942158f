use thiserror::Error;

use crate::types::Resource;

/// Errors returned while extracting raw records.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Network or TLS failure, or a non-2xx status from the API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body was valid JSON but not the array of records expected.
    #[error("expected a JSON array of {resource}, got {found}")]
    UnexpectedShape {
        resource: Resource,
        found: &'static str,
    },

    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
