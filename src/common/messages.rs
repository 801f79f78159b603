//! Canonical message type for relay communication.
//!
//! Every transport turns its raw input into a [`ChatMessage`] before it
//! reaches the manager, and every outgoing send is expressed as one.

use std::fmt;

/// Discriminator carried by administrative broadcasts (server status, etc.).
pub const DISCRIMINATOR_ADMIN: &str = "admin";

/// Discriminator carried by game lines that echo a message we relayed ourselves.
pub const DISCRIMINATOR_EMOTE: &str = "emote";

/// Discriminator carried by in-game GM broadcasts.
pub const DISCRIMINATOR_BROADCAST: &str = "broadcast";

/// A normalized chat event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    /// Name of the endpoint the message came from.
    pub source: String,
    /// Name of the endpoint the message is being sent to (set during dispatch).
    pub destination: Option<String>,
    /// Destination-specific channel identifier.
    pub channel_id: String,
    /// Game protocol channel number (e.g. 260 for out-of-character).
    pub channel_number: Option<u32>,
    /// Sanitized display name of the author.
    pub author: String,
    /// Sanitized message body.
    pub message: String,
    /// Tag for non-chat traffic; only routes with a matching `custom` trigger see it.
    pub discriminator: Option<String>,
}

impl ChatMessage {
    /// Create a new message from a source endpoint.
    pub fn new(
        source: impl Into<String>,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            author: author.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Administrative broadcast with no author.
    pub fn admin(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, "", message).with_discriminator(DISCRIMINATOR_ADMIN)
    }

    /// Set the channel id.
    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// Set the channel number.
    pub fn with_channel_number(mut self, channel_number: u32) -> Self {
        self.channel_number = Some(channel_number);
        self
    }

    /// Set the discriminator.
    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }

    /// Whether the channel id or channel number equals `id`.
    pub fn is_on_channel(&self, id: &str) -> bool {
        if !self.channel_id.is_empty() && self.channel_id == id {
            return true;
        }
        self.channel_number
            .map(|number| number.to_string() == id)
            .unwrap_or(false)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.author.is_empty() {
            write!(f, "[{}] {}", self.source, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.source, self.author, self.message)
        }
    }
}
