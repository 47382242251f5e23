//! Speech-synthesis HTTP client.
//!
//! [`SpeechClient`] posts text to the voice-keyed synthesis endpoint and
//! returns the raw audio payload.  Connection details come from
//! [`EndpointConfig`]; model and voice settings from [`SpeechConfig`].

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::audio::PlaybackError;
use crate::config::{EndpointConfig, SpeechConfig, VoiceConfig};

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors from speech generation or from playing the generated audio.
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    /// The speech key or voice id was blank; no request was made.
    #[error("speech generation: API key or voice id is not set")]
    MissingVoice,

    /// HTTP transport or connection error.
    #[error("speech generation: HTTP request failed: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("speech generation: request timed out")]
    Timeout,

    /// The service answered with a non-2xx status.
    #[error("speech generation: service returned HTTP {0}")]
    Status(u16),

    /// Synthesis succeeded but the audio could not be played.
    #[error("speech playback: {0}")]
    Playback(#[from] PlaybackError),
}

impl From<reqwest::Error> for SpeechError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SpeechError::Timeout
        } else {
            SpeechError::Transport(e.without_url().to_string())
        }
    }
}

impl SpeechError {
    /// `true` when the audio was generated but local playback failed.
    pub fn is_playback(&self) -> bool {
        matches!(self, SpeechError::Playback(_))
    }
}

// ---------------------------------------------------------------------------
// SpeechBackend trait
// ---------------------------------------------------------------------------

/// Async trait for text-to-speech services.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesise `text` with `voice` and return the encoded audio payload.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SpeechError>;
}

// ---------------------------------------------------------------------------
// SpeechClient
// ---------------------------------------------------------------------------

/// Calls `POST <speech_base_url>/v1/text-to-speech/<voice_id>`.
pub struct SpeechClient {
    client: reqwest::Client,
    base_url: String,
    settings: SpeechConfig,
}

impl SpeechClient {
    /// Build a client whose HTTP timeout is `endpoints.timeout_secs`.
    pub fn from_config(endpoints: &EndpointConfig, settings: &SpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(endpoints.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: endpoints.speech_base_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
        }
    }

    /// Encoding requested from the service; the payload must be decoded with it.
    pub fn output_format(&self) -> &str {
        &self.settings.output_format
    }

    /// `<base>/v1/text-to-speech/<voice_id>`, with the voice id encoded as a
    /// single path segment.
    fn endpoint(&self, voice_id: &str) -> Result<reqwest::Url, SpeechError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SpeechError::Transport(format!("invalid speech base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SpeechError::Transport("speech base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice_id]);
        Ok(url)
    }
}

#[async_trait]
impl SpeechBackend for SpeechClient {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SpeechError> {
        if voice.api_key.trim().is_empty() || voice.voice_id.trim().is_empty() {
            return Err(SpeechError::MissingVoice);
        }

        let url = self.endpoint(voice.voice_id.trim())?;

        let body = json!({
            "text": text,
            "model_id": self.settings.model_id,
            "voice_settings": {
                "stability": self.settings.stability,
                "similarity_boost": self.settings.similarity_boost,
            },
        });

        let response = self
            .client
            .post(url)
            .query(&[("output_format", self.settings.output_format.as_str())])
            .header("xi-api-key", &voice.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Status(status.as_u16()));
        }

        let audio = response.bytes().await?;
        log::debug!("synthesised {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SpeechClient {
        let endpoints = EndpointConfig {
            speech_base_url: "http://127.0.0.1:9/".into(),
            timeout_secs: 2,
            ..EndpointConfig::default()
        };
        SpeechClient::from_config(&endpoints, &SpeechConfig::default())
    }

    #[tokio::test]
    async fn blank_voice_is_rejected_without_request() {
        let voice = VoiceConfig {
            api_key: "xi".into(),
            voice_id: " ".into(),
        };
        let err = client().synthesize("hi", &voice).await.unwrap_err();
        assert!(matches!(err, SpeechError::MissingVoice));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let voice = VoiceConfig {
            api_key: "xi".into(),
            voice_id: "voice".into(),
        };
        let err = client().synthesize("hi", &voice).await.unwrap_err();
        assert!(matches!(err, SpeechError::Transport(_) | SpeechError::Timeout));
        assert!(!err.is_playback());
    }

    #[test]
    fn playback_errors_convert() {
        let err: SpeechError = PlaybackError::EmptyClip.into();
        assert!(err.is_playback());
        assert!(err.to_string().starts_with("speech playback"));
    }

    #[test]
    fn voice_id_stays_one_path_segment() {
        let url = client().endpoint("team/voice?x#y").unwrap();
        assert_eq!(url.path(), "/v1/text-to-speech/team%2Fvoice%3Fx%23y");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn base_path_is_kept() {
        let endpoints = EndpointConfig {
            speech_base_url: "http://127.0.0.1:9/proxy/".into(),
            ..EndpointConfig::default()
        };
        let client = SpeechClient::from_config(&endpoints, &SpeechConfig::default());
        let url = client.endpoint("voice-1").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/proxy/v1/text-to-speech/voice-1");
    }

    #[tokio::test]
    async fn transport_error_text_omits_url() {
        let voice = VoiceConfig {
            api_key: "xi".into(),
            voice_id: "private-voice".into(),
        };
        let err = client().synthesize("hi", &voice).await.unwrap_err();
        assert!(!err.to_string().contains("private-voice"), "{err}");
    }

    #[test]
    fn output_format_comes_from_settings() {
        assert_eq!(client().output_format(), "pcm_16000");
    }
}
