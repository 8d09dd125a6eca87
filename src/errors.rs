//! Typed error hierarchy for repolens.
//!
//! Three top-level enums cover the three subsystems:
//! - `ApiError`: backend HTTP calls (structure, projects, chat request)
//! - `StreamError`: one chat exchange, including caller cancellation
//! - `ConfigError`: loading and parsing `repolens.toml`

use thiserror::Error;

/// Errors from the backend HTTP client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No authenticated session; {operation} requires an access token")]
    Unauthenticated { operation: &'static str },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid API base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl ApiError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that end a chat exchange.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The caller invoked the cancellation handle. Not a failure.
    #[error("Exchange cancelled")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Response stream broke: {0}")]
    Body(#[source] reqwest::Error),
}

impl StreamError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }
}

/// Errors from the configuration layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse repolens.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize repolens.toml: {0}")]
    Serialize(#[from] toml::ser::Error),
}
