//! OpenAI chat-completions backend.

use serde_json::json;

use crate::config::{Provider, ProviderConfig};
use crate::provider::error::ProviderError;
use crate::provider::gateway::read_json;

/// Send `system` + `user` turns to `/v1/chat/completions`.
///
/// A completion without content (no choices, `null` content) is returned as
/// an empty string instead of an error.
pub(crate) async fn complete(
    client: &reqwest::Client,
    base_url: &str,
    message: &str,
    config: &ProviderConfig,
) -> Result<String, ProviderError> {
    let provider = Provider::OpenAi;
    let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));

    let body = json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": config.system_prompt },
            { "role": "user",   "content": message }
        ],
    });

    let response = client
        .post(&url)
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;

    let json = read_json(provider, response).await?;

    Ok(json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}
