//! Conversation identity and sidebar summaries.

use crate::model::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message source class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// SMS grouped by sender address.
    Sms,
    /// Push notifications grouped by package name.
    Push,
}

impl Channel {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Push => "push",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown channel '{0}' (expected 'sms' or 'push')")]
pub struct InvalidChannel(pub String);

impl FromStr for Channel {
    type Err = InvalidChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Channel::Sms),
            "push" | "fcm" | "wave" => Ok(Channel::Push),
            other => Err(InvalidChannel(other.to_string())),
        }
    }
}

/// Key of one conversation: `(channel, identity)`.
///
/// The same identity string on different channels is two distinct conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    channel: Channel,
    identity: Identity,
}

impl ConversationKey {
    /// Build a key.
    pub fn new(channel: Channel, identity: Identity) -> Self {
        Self { channel, identity }
    }

    /// SMS conversation with `sender`.
    pub fn sms(sender: Identity) -> Self {
        Self::new(Channel::Sms, sender)
    }

    /// Push conversation for `package`.
    pub fn push(package: Identity) -> Self {
        Self::new(Channel::Push, package)
    }

    /// Channel half of the key.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Identity half of the key.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.channel, self.identity)
    }
}

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    /// Sender or package.
    pub identity: Identity,
    /// Total messages.
    pub message_count: u64,
    /// Messages not yet read by the user.
    pub unread_count: u64,
    /// Messages still pending review.
    pub pending_count: u64,
}
