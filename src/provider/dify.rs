//! Dify (self-hosted gateway) backend.
//!
//! The request asks for `response_mode: "streaming"`, but the body is read
//! as one JSON document and only its `answer` field is used, so callers see a
//! single complete reply.  Switching to incremental SSE consumption would
//! change that contract and is deliberately not done here.

use serde_json::json;

use crate::config::{Provider, ProviderConfig};
use crate::provider::error::ProviderError;
use crate::provider::gateway::read_json;

pub(crate) async fn chat_message(
    client: &reqwest::Client,
    message: &str,
    config: &ProviderConfig,
) -> Result<String, ProviderError> {
    let provider = Provider::Dify;

    // Checked before the request is built.
    let api_url = config
        .api_url()
        .ok_or(ProviderError::MissingApiUrl { provider })?;
    let url = format!("{}/chat-messages", api_url.trim_end_matches('/'));

    let body = json!({
        "query": message,
        "response_mode": "streaming",
        "conversation_id": "",
        "user": "user",
    });

    let response = client
        .post(&url)
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;

    let json = read_json(provider, response).await?;

    json["answer"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::parse(provider, "reply has no `answer` field"))
}
