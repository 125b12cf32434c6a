//! Dialogue transcript: append-only, cleared only by starting over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One dialogue turn.
///
/// Serialized as `{text, isUser, timestamp}`, the shape the assist endpoint
/// receives as `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Message::assistant(text));
    }

    /// Drop everything and start again from a single assistant message.
    pub fn reset_to(&mut self, greeting: impl Into<String>) {
        self.messages.clear();
        self.push_assistant(greeting);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}
