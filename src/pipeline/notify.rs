//! User-visible notifications.
//!
//! Every rejected or failed turn produces exactly one [`Notification`] on
//! the orchestrator's channel.  The host decides how to show it.

use std::fmt;

use tokio::sync::mpsc;

use crate::config::Provider;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// The part of the turn a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The user's input was not accepted.
    Input,
    /// A provider call, named by its backend.
    Provider(Provider),
    /// Speech synthesis or playback.
    Speech,
    /// The chat history.
    History,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Input => f.write_str("input"),
            Stage::Provider(provider) => f.write_str(provider.as_str()),
            Stage::Speech => f.write_str("speech generation"),
            Stage::History => f.write_str("history"),
        }
    }
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub stage: Stage,
    pub message: String,
}

impl Notification {
    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            stage,
            message: message.into(),
        }
    }

    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            stage,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Sending half handed to the orchestrator.
pub type NotificationSender = mpsc::UnboundedSender<Notification>;

/// Receiving half read by the host.
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}
