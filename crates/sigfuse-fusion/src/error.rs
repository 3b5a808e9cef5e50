use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("generation service returned no content")]
    EmptyResponse,

    #[error("generation call timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation service not configured: {0}")]
    NotConfigured(String),

    #[error("invalid structured payload: {0}")]
    InvalidPayload(String),
}
