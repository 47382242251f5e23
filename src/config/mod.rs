//! Configuration module for the avatar chat client.
//!
//! Provides `AppConfig` (top-level settings), the per-turn
//! [`ProviderConfig`] with its partial-update [`ConfigPatch`], sub-configs for
//! each subsystem, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AvatarConfig, ChatConfig, ConfigPatch, EndpointConfig, Provider, ProviderConfig,
    SpeechConfig, VoiceConfig,
};
