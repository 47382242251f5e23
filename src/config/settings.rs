//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and snapshotted per turn.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The closed set of AI backends a turn can be routed to.
///
/// | Variant  | Transport                                   | Needs `api_url` |
/// |----------|---------------------------------------------|-----------------|
/// | Gemini   | `generateContent` REST call, fixed model    | No              |
/// | Claude   | same-origin relay `/api/chat/claude`        | No              |
/// | OpenAi   | `/v1/chat/completions`, configurable model  | No              |
/// | Dify     | self-hosted `<api_url>/chat-messages`       | Yes             |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Claude,
    OpenAi,
    Dify,
}

impl Provider {
    /// Every provider, in the order the settings menu lists them.
    pub const ALL: [Provider; 4] = [
        Provider::Gemini,
        Provider::Claude,
        Provider::OpenAi,
        Provider::Dify,
    ];

    /// Lower-case identifier used in config files and notifications.
    ///
    /// ```
    /// use avatar_chat::config::Provider;
    ///
    /// assert_eq!(Provider::OpenAi.as_str(), "openai");
    /// assert_eq!(Provider::Dify.as_str(), "dify");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
            Provider::OpenAi => "openai",
            Provider::Dify => "dify",
        }
    }

    /// Self-hosted backends need an explicit base URL.
    pub fn requires_api_url(&self) -> bool {
        matches!(self, Provider::Dify)
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::Gemini
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider '{s}' (expected gemini, claude, openai or dify)"))
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Credentials for one speech-synthesis voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub api_key: String,
    pub voice_id: String,
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// Settings that shape one conversational turn.
///
/// Fields that do not apply to the active `provider` are kept as-is and
/// ignored; the settings UI may fill them in while the user switches
/// providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Active backend.
    pub provider: Provider,
    /// Secret for the active backend.  An empty key rejects the turn.
    pub api_key: String,
    /// Model identifier; only consulted by backends with several models.
    pub model: String,
    /// Persona / instruction text sent with every request.
    pub system_prompt: String,
    /// Base URL of a self-hosted gateway (Dify only).
    pub api_url: Option<String>,
    /// Speech service key.  Speech is enabled when this and `voice_id` are set.
    pub voice_api_key: Option<String>,
    /// Speech service voice identifier.
    pub voice_id: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: String::new(),
            model: "gemini-pro".into(),
            system_prompt:
                "You are a helpful AI assistant. Please provide clear and concise responses."
                    .into(),
            api_url: None,
            voice_api_key: None,
            voice_id: None,
        }
    }
}

impl ProviderConfig {
    /// `true` when an API key has been entered.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The self-hosted base URL, if one is set and non-blank.
    pub fn api_url(&self) -> Option<&str> {
        non_blank(self.api_url.as_deref())
    }

    /// Voice credentials for this turn, present only when both the speech key
    /// and the voice id are non-blank.
    ///
    /// ```
    /// use avatar_chat::config::ProviderConfig;
    ///
    /// let mut cfg = ProviderConfig::default();
    /// assert!(cfg.voice().is_none());
    ///
    /// cfg.voice_api_key = Some("xi-key".into());
    /// assert!(cfg.voice().is_none());
    ///
    /// cfg.voice_id = Some("EXAVITQu4vr4xnSDxMaL".into());
    /// assert_eq!(cfg.voice().unwrap().voice_id, "EXAVITQu4vr4xnSDxMaL");
    /// ```
    pub fn voice(&self) -> Option<VoiceConfig> {
        let api_key = non_blank(self.voice_api_key.as_deref())?;
        let voice_id = non_blank(self.voice_id.as_deref())?;
        Some(VoiceConfig {
            api_key: api_key.to_string(),
            voice_id: voice_id.to_string(),
        })
    }

    /// Merge a partial update from the settings UI.
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(provider) = patch.provider {
            self.provider = provider;
        }
        if let Some(api_key) = patch.api_key {
            self.api_key = api_key;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(system_prompt) = patch.system_prompt {
            self.system_prompt = system_prompt;
        }
        if let Some(api_url) = patch.api_url {
            self.api_url = empty_to_none(api_url);
        }
        if let Some(voice_api_key) = patch.voice_api_key {
            self.voice_api_key = empty_to_none(voice_api_key);
        }
        if let Some(voice_id) = patch.voice_id {
            self.voice_id = empty_to_none(voice_id);
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn empty_to_none(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// ConfigPatch
// ---------------------------------------------------------------------------

/// A partial [`ProviderConfig`] update.  `None` leaves a field untouched;
/// an empty string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub api_url: Option<String>,
    pub voice_api_key: Option<String>,
    pub voice_id: Option<String>,
}

// ---------------------------------------------------------------------------
// EndpointConfig
// ---------------------------------------------------------------------------

/// Base URLs of the hosted services.  Overridable so tests and proxies can
/// redirect traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Google Generative Language API root.
    pub gemini_base_url: String,
    /// OpenAI API root (no trailing `/v1`).
    pub openai_base_url: String,
    /// Origin of the relay that holds the Claude key server-side.
    pub relay_base_url: String,
    /// Speech synthesis API root.
    pub speech_base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            gemini_base_url: "https://generativelanguage.googleapis.com".into(),
            openai_base_url: "https://api.openai.com".into(),
            relay_base_url: "http://localhost:3000".into(),
            speech_base_url: "https://api.elevenlabs.io".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Fixed synthesis parameters sent with every speech request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Multilingual synthesis model.
    pub model_id: String,
    /// Voice stability (0.0 – 1.0).
    pub stability: f32,
    /// Similarity boost (0.0 – 1.0).
    pub similarity_boost: f32,
    /// Requested audio encoding.  Only raw `pcm_<rate>` formats are playable.
    pub output_format: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model_id: "eleven_multilingual_v2".into(),
            stability: 0.5,
            similarity_boost: 0.75,
            output_format: "pcm_16000".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AvatarConfig
// ---------------------------------------------------------------------------

/// Mouth animation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Phase advance in radians per second while speaking.
    pub mouth_speed: f32,
    /// Upper bound of the mouth-open weight (0.0 – 1.0).
    pub max_open: f32,
    /// Name of the facial expression channel that opens the mouth.
    pub expression: String,
    /// Target frame rate of the host render loop.
    pub frame_rate: u32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            mouth_speed: 3.0,
            max_open: 0.7,
            expression: "aa".into(),
            frame_rate: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

/// Conversation behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Drop replies to requests that were sent before the last history reset.
    ///
    /// Off by default: a reply arriving after a reset is still appended.
    pub discard_stale_replies: bool,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use avatar_chat::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend selection, credentials and persona.
    pub provider: ProviderConfig,
    /// Hosted service URLs and timeout.
    pub endpoints: EndpointConfig,
    /// Speech synthesis parameters.
    pub speech: SpeechConfig,
    /// Mouth animation tuning.
    pub avatar: AvatarConfig,
    /// Conversation behaviour.
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario).
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
