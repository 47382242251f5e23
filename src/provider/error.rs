//! The single failure type every backend call is normalised into.

use thiserror::Error;

use crate::config::Provider;

/// Errors that can occur while dispatching a message to an AI backend.
///
/// Every variant names the backend it came from so the orchestrator can tell
/// the user which provider failed without inspecting backend-specific shapes.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// No API key was configured; no request was made.
    #[error("{provider}: API key is not set")]
    MissingApiKey { provider: Provider },

    /// A self-hosted backend has no base URL; no request was made.
    #[error("{provider}: API URL is required")]
    MissingApiUrl { provider: Provider },

    /// Connection, DNS, TLS or body-read failure.
    #[error("{provider}: HTTP request failed: {message}")]
    Transport { provider: Provider, message: String },

    /// The request did not complete within the configured timeout.
    #[error("{provider}: request timed out")]
    Timeout { provider: Provider },

    /// The backend answered with a non-2xx status.
    #[error("{provider}: backend returned HTTP {status}")]
    Status { provider: Provider, status: u16 },

    /// The response body did not have the expected shape.
    #[error("{provider}: unexpected response: {message}")]
    Parse { provider: Provider, message: String },
}

impl ProviderError {
    /// Map a `reqwest` failure, keeping timeouts distinguishable.
    ///
    /// The request URL is stripped from the message: Gemini carries its key
    /// in the query string.
    pub fn transport(provider: Provider, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout { provider }
        } else {
            ProviderError::Transport {
                provider,
                message: err.without_url().to_string(),
            }
        }
    }

    pub fn parse(provider: Provider, message: impl Into<String>) -> Self {
        ProviderError::Parse {
            provider,
            message: message.into(),
        }
    }

    /// The backend this error came from.
    pub fn provider(&self) -> Provider {
        match self {
            ProviderError::MissingApiKey { provider }
            | ProviderError::MissingApiUrl { provider }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Timeout { provider }
            | ProviderError::Status { provider, .. }
            | ProviderError::Parse { provider, .. } => *provider,
        }
    }

    /// `true` when the call was rejected before any network traffic.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ProviderError::MissingApiKey { .. } | ProviderError::MissingApiUrl { .. }
        )
    }
}
