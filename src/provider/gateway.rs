//! Core `ChatBackend` trait and the `ProviderGateway` implementation.
//!
//! `ProviderGateway` turns one user message plus a [`ProviderConfig`]
//! snapshot into reply text.  The backend is chosen by a single exhaustive
//! `match` on [`Provider`]; each arm delegates to that backend's module.
//! Base URLs and the timeout come from [`EndpointConfig`].

use async_trait::async_trait;

use crate::config::{EndpointConfig, Provider, ProviderConfig};
use crate::provider::error::ProviderError;
use crate::provider::{claude, dify, gemini, openai};

// ---------------------------------------------------------------------------
// ChatBackend trait
// ---------------------------------------------------------------------------

/// Async seam between the orchestrator and whatever produces replies.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn ChatBackend>`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `message` using `config` and return the reply text.
    async fn dispatch(&self, message: &str, config: &ProviderConfig)
        -> Result<String, ProviderError>;
}

// ---------------------------------------------------------------------------
// ProviderGateway
// ---------------------------------------------------------------------------

/// Routes messages to Gemini, the Claude relay, OpenAI or Dify.
pub struct ProviderGateway {
    client: reqwest::Client,
    endpoints: EndpointConfig,
}

impl ProviderGateway {
    /// Build a gateway whose HTTP client uses `endpoints.timeout_secs`.
    pub fn from_config(endpoints: &EndpointConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(endpoints.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoints: endpoints.clone(),
        }
    }

    async fn route(&self, message: &str, config: &ProviderConfig) -> Result<String, ProviderError> {
        if !config.has_api_key() {
            return Err(ProviderError::MissingApiKey {
                provider: config.provider,
            });
        }
        if config.provider.requires_api_url() && config.api_url().is_none() {
            return Err(ProviderError::MissingApiUrl {
                provider: config.provider,
            });
        }

        match config.provider {
            Provider::Gemini => {
                gemini::generate(&self.client, &self.endpoints.gemini_base_url, message, config)
                    .await
            }
            Provider::Claude => {
                claude::relay(&self.client, &self.endpoints.relay_base_url, message, config).await
            }
            Provider::OpenAi => {
                openai::complete(&self.client, &self.endpoints.openai_base_url, message, config)
                    .await
            }
            Provider::Dify => dify::chat_message(&self.client, message, config).await,
        }
    }
}

#[async_trait]
impl ChatBackend for ProviderGateway {
    async fn dispatch(
        &self,
        message: &str,
        config: &ProviderConfig,
    ) -> Result<String, ProviderError> {
        log::debug!("dispatching message to {} (len={})", config.provider, message.len());

        let result = self.route(message, config).await;
        if let Err(e) = &result {
            log::error!("error sending message: {e}");
        }
        result
    }
}

/// Reject non-2xx responses, then parse the body as JSON.
pub(crate) async fn read_json(
    provider: Provider,
    response: reqwest::Response,
) -> Result<serde_json::Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::parse(provider, e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
