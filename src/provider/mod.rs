//! AI backend dispatch.
//!
//! This module provides:
//! * [`ChatBackend`]: async trait the orchestrator talks to.
//! * [`ProviderGateway`]: routes a message to Gemini, the Claude relay,
//!   OpenAI or Dify, selected by [`Provider`](crate::config::Provider).
//! * [`ProviderError`]: the single normalised failure type.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use avatar_chat::config::{AppConfig, Provider};
//! use avatar_chat::provider::{ChatBackend, ProviderGateway};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = AppConfig::default();
//!     config.provider.provider = Provider::OpenAi;
//!     config.provider.api_key = "sk-...".into();
//!     config.provider.model = "gpt-4o-mini".into();
//!
//!     let gateway = ProviderGateway::from_config(&config.endpoints);
//!     match gateway.dispatch("Hello", &config.provider).await {
//!         Ok(reply) => println!("{reply}"),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod claude;
pub mod dify;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod openai;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use error::ProviderError;
pub use gateway::{ChatBackend, ProviderGateway};
