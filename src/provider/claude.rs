//! Claude backend, reached through a relay.
//!
//! The relay keeps the upstream secret on the server side; this client only
//! forwards the message, persona and the user's key to it.

use serde_json::json;

use crate::config::{Provider, ProviderConfig};
use crate::provider::error::ProviderError;
use crate::provider::gateway::read_json;

/// Path of the relay endpoint, relative to `EndpointConfig::relay_base_url`.
pub const RELAY_PATH: &str = "/api/chat/claude";

pub(crate) async fn relay(
    client: &reqwest::Client,
    relay_base_url: &str,
    message: &str,
    config: &ProviderConfig,
) -> Result<String, ProviderError> {
    let provider = Provider::Claude;
    let url = format!("{}{RELAY_PATH}", relay_base_url.trim_end_matches('/'));

    let body = json!({
        "message": message,
        "systemPrompt": config.system_prompt,
        "apiKey": config.api_key,
    });

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;

    let json = read_json(provider, response).await?;

    json["response"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::parse(provider, "relay reply has no `response` field"))
}
