//! Google Gemini backend.
//!
//! Single-shot `generateContent` against a fixed model.  The persona and the
//! user message travel as one text part rather than as structured turns.

use serde_json::json;

use crate::config::{Provider, ProviderConfig};
use crate::provider::error::ProviderError;
use crate::provider::gateway::read_json;

/// Gemini ignores `ProviderConfig::model`; this is the only model it is sent.
pub const GEMINI_MODEL: &str = "gemini-pro";

/// Combine persona and message into the single prompt Gemini receives.
///
/// ```
/// use avatar_chat::provider::gemini::build_prompt;
///
/// assert_eq!(build_prompt("Be terse.", "Hello"), "Be terse.\n\nUser: Hello");
/// ```
pub fn build_prompt(system_prompt: &str, message: &str) -> String {
    format!("{system_prompt}\n\nUser: {message}")
}

pub(crate) async fn generate(
    client: &reqwest::Client,
    base_url: &str,
    message: &str,
    config: &ProviderConfig,
) -> Result<String, ProviderError> {
    let provider = Provider::Gemini;
    let url = format!(
        "{}/v1beta/models/{GEMINI_MODEL}:generateContent",
        base_url.trim_end_matches('/')
    );

    let body = json!({
        "contents": [
            { "parts": [{ "text": build_prompt(&config.system_prompt, message) }] }
        ]
    });

    let response = client
        .post(&url)
        .query(&[("key", config.api_key.as_str())])
        .json(&body)
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;

    let json = read_json(provider, response).await?;

    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::parse(provider, "response has no candidate text"))
}
