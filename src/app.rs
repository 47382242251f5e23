//! Terminal host glue: console commands and a text-mode avatar.
//!
//! The binary reads one line at a time from stdin.  Lines starting with `/`
//! are [`ConsoleCommand`]s that stand in for the settings menu; anything
//! else is a chat message.
//!
//! | Command                         | Effect                                 |
//! |---------------------------------|----------------------------------------|
//! | `/reset`                        | clear chat history                     |
//! | `/provider <name>`              | gemini, claude, openai or dify         |
//! | `/key <api-key>`                | provider API key                       |
//! | `/model <model>`                | model for multi-model backends         |
//! | `/url [<url>]`                  | self-hosted base URL (empty clears)    |
//! | `/prompt <text>`                | system prompt                          |
//! | `/voice [<api-key> <voice-id>]` | speech credentials (empty clears)      |
//! | `/save`                         | write settings to disk                 |
//! | `/help`                         | list commands                          |
//! | `/quit`                         | exit                                   |

use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;

use thiserror::Error;

use crate::avatar::ExpressionTarget;
use crate::config::{ConfigPatch, Provider};

/// Printed for `/help`.
pub const HELP: &str = "\
commands:
  /reset                         clear chat history
  /provider <name>               gemini | claude | openai | dify
  /key <api-key>                 provider API key
  /model <model>                 model name
  /url [<url>]                   self-hosted base URL (no argument clears)
  /prompt <text>                 system prompt
  /voice [<api-key> <voice-id>]  speech credentials (no arguments clears)
  /save                          save settings
  /quit                          exit
anything else is sent as a chat message";

// ---------------------------------------------------------------------------
// ConsoleCommand
// ---------------------------------------------------------------------------

/// Errors for malformed console input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try /help)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    BadProvider(String),
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Chat(String),
    Reset,
    Provider(Provider),
    Key(String),
    Model(String),
    Url(String),
    Prompt(String),
    Voice { api_key: String, voice_id: String },
    Save,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse a line.  Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Ok(Some(ConsoleCommand::Chat(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "reset" => ConsoleCommand::Reset,
            "provider" => {
                if arg.is_empty() {
                    return Err(CommandError::Usage("/provider <gemini|claude|openai|dify>"));
                }
                ConsoleCommand::Provider(Provider::from_str(arg).map_err(CommandError::BadProvider)?)
            }
            "key" => ConsoleCommand::Key(required(arg, "/key <api-key>")?),
            "model" => ConsoleCommand::Model(required(arg, "/model <model>")?),
            "url" => ConsoleCommand::Url(arg.to_string()),
            "prompt" => ConsoleCommand::Prompt(required(arg, "/prompt <text>")?),
            "voice" => {
                let mut parts = arg.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (None, _, _) => ConsoleCommand::Voice {
                        api_key: String::new(),
                        voice_id: String::new(),
                    },
                    (Some(api_key), Some(voice_id), None) => ConsoleCommand::Voice {
                        api_key: api_key.to_string(),
                        voice_id: voice_id.to_string(),
                    },
                    _ => return Err(CommandError::Usage("/voice [<api-key> <voice-id>]")),
                }
            }
            "save" => ConsoleCommand::Save,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(CommandError::Unknown(format!("/{other}"))),
        };
        Ok(Some(command))
    }

    /// The settings edit this command stands for, if it is one.
    pub fn into_patch(self) -> Option<ConfigPatch> {
        let patch = match self {
            ConsoleCommand::Provider(provider) => ConfigPatch {
                provider: Some(provider),
                ..ConfigPatch::default()
            },
            ConsoleCommand::Key(api_key) => ConfigPatch {
                api_key: Some(api_key),
                ..ConfigPatch::default()
            },
            ConsoleCommand::Model(model) => ConfigPatch {
                model: Some(model),
                ..ConfigPatch::default()
            },
            ConsoleCommand::Url(api_url) => ConfigPatch {
                api_url: Some(api_url),
                ..ConfigPatch::default()
            },
            ConsoleCommand::Prompt(system_prompt) => ConfigPatch {
                system_prompt: Some(system_prompt),
                ..ConfigPatch::default()
            },
            ConsoleCommand::Voice { api_key, voice_id } => ConfigPatch {
                voice_api_key: Some(api_key),
                voice_id: Some(voice_id),
                ..ConfigPatch::default()
            },
            _ => return None,
        };
        Some(patch)
    }
}

fn required(arg: &str, usage: &'static str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(arg.to_string())
    }
}

// ---------------------------------------------------------------------------
// ConsoleAvatar
// ---------------------------------------------------------------------------

/// Glyph for a mouth-open weight.
pub fn mouth_glyph(weight: f32) -> char {
    match weight {
        w if w < 0.05 => '-',
        w if w < 0.25 => 'o',
        w if w < 0.5 => 'O',
        _ => '0',
    }
}

/// Text-mode stand-in for the 3-D avatar.
///
/// Keeps the latest weight of every expression channel and redraws a small
/// face on stderr whenever the mouth glyph changes.
#[derive(Debug)]
pub struct ConsoleAvatar {
    mouth_channel: String,
    weights: HashMap<String, f32>,
    last_glyph: Option<char>,
    draw: bool,
}

impl ConsoleAvatar {
    /// `mouth_channel` is the expression that opens the mouth (usually `aa`).
    pub fn new(mouth_channel: impl Into<String>) -> Self {
        Self {
            mouth_channel: mouth_channel.into(),
            weights: HashMap::new(),
            last_glyph: None,
            draw: true,
        }
    }

    /// An avatar that tracks weights without drawing.
    pub fn headless(mouth_channel: impl Into<String>) -> Self {
        Self {
            draw: false,
            ..Self::new(mouth_channel)
        }
    }

    pub fn weight(&self, name: &str) -> f32 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    /// The face as currently drawn.
    pub fn face(&self) -> String {
        format!("(^{}^)", mouth_glyph(self.weight(&self.mouth_channel)))
    }
}

impl ExpressionTarget for ConsoleAvatar {
    fn set_expression(&mut self, name: &str, weight: f32) {
        self.weights.insert(name.to_string(), weight.clamp(0.0, 1.0));
        if name != self.mouth_channel {
            return;
        }

        let glyph = mouth_glyph(weight);
        if self.last_glyph == Some(glyph) {
            return;
        }
        self.last_glyph = Some(glyph);

        if self.draw {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "\r{} ", self.face());
            let _ = err.flush();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ConsoleCommand {
        ConsoleCommand::parse(line).unwrap().unwrap()
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(ConsoleCommand::parse("").unwrap(), None);
        assert_eq!(ConsoleCommand::parse("   \n").unwrap(), None);
    }

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(parse("Hello there\n"), ConsoleCommand::Chat("Hello there".into()));
    }

    #[test]
    fn provider_names_are_case_insensitive() {
        assert_eq!(parse("/provider OpenAI"), ConsoleCommand::Provider(Provider::OpenAi));
        assert!(matches!(
            ConsoleCommand::parse("/provider llama"),
            Err(CommandError::BadProvider(_))
        ));
        assert!(matches!(
            ConsoleCommand::parse("/provider"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn prompt_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse("/prompt You are a pirate.  Speak like one."),
            ConsoleCommand::Prompt("You are a pirate.  Speak like one.".into())
        );
    }

    #[test]
    fn url_without_argument_clears() {
        assert_eq!(parse("/url"), ConsoleCommand::Url(String::new()));
        let patch = parse("/url").into_patch().unwrap();
        assert_eq!(patch.api_url.as_deref(), Some(""));
    }

    #[test]
    fn voice_takes_zero_or_two_arguments() {
        assert_eq!(
            parse("/voice xi-key EXAVITQu4vr4xnSDxMaL"),
            ConsoleCommand::Voice {
                api_key: "xi-key".into(),
                voice_id: "EXAVITQu4vr4xnSDxMaL".into(),
            }
        );
        assert!(matches!(parse("/voice"), ConsoleCommand::Voice { ref api_key, .. } if api_key.is_empty()));
        assert!(ConsoleCommand::parse("/voice only-one").is_err());
        assert!(ConsoleCommand::parse("/voice a b c").is_err());
    }

    #[test]
    fn key_requires_argument() {
        assert_eq!(
            ConsoleCommand::parse("/key"),
            Err(CommandError::Usage("/key <api-key>"))
        );
    }

    #[test]
    fn unknown_commands_are_errors() {
        assert_eq!(
            ConsoleCommand::parse("/dance"),
            Err(CommandError::Unknown("/dance".into()))
        );
    }

    #[test]
    fn only_settings_commands_become_patches() {
        let patch = parse("/key sk-123").into_patch().unwrap();
        assert_eq!(patch.api_key.as_deref(), Some("sk-123"));
        assert!(patch.provider.is_none());

        assert!(parse("/reset").into_patch().is_none());
        assert!(parse("/quit").into_patch().is_none());
        assert!(parse("hi").into_patch().is_none());
    }

    #[test]
    fn glyphs_grow_with_weight() {
        assert_eq!(mouth_glyph(0.0), '-');
        assert_eq!(mouth_glyph(0.1), 'o');
        assert_eq!(mouth_glyph(0.3), 'O');
        assert_eq!(mouth_glyph(0.7), '0');
    }

    #[test]
    fn console_avatar_tracks_weights() {
        let mut avatar = ConsoleAvatar::headless("aa");
        assert_eq!(avatar.face(), "(^-^)");

        avatar.set_expression("aa", 0.6);
        avatar.set_expression("happy", 2.0);

        assert_eq!(avatar.face(), "(^0^)");
        assert_eq!(avatar.weight("happy"), 1.0);
        assert_eq!(avatar.weight("blink"), 0.0);
    }
}
