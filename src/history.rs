//! Conversation transcript and the events that mutate it.
//!
//! All transcript changes flow through [`ConversationHistory::apply`] so the
//! UI, the voice pipeline, and the server-loaded history all converge on one
//! ordering rule: append-only, with the single exception of attaching an
//! event link to the reply it belongs to.

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "now_rfc3339")]
    pub timestamp: String,
    /// Calendar event URL attached after the assistant creates an event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_link: Option<String>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: now_rfc3339(),
            event_link: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: now_rfc3339(),
            event_link: None,
        }
    }
}

/// Transcript mutation. Producers describe what happened; the reducer owns
/// how the transcript changes.
#[derive(Debug, Clone)]
pub enum HistoryEvent {
    UserMessage(String),
    AssistantMessage(String),
    /// Attach a calendar link to the most recent assistant reply. Dropped if
    /// the transcript is empty or ends with a user message.
    AttachEventLink(String),
    Clear,
    /// Replace the whole transcript, e.g. with server-side history on start.
    Replace(Vec<Message>),
}

#[derive(Debug, Default, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: HistoryEvent) {
        match event {
            HistoryEvent::UserMessage(content) => self.messages.push(Message::user(content)),
            HistoryEvent::AssistantMessage(content) => {
                self.messages.push(Message::assistant(content));
            }
            HistoryEvent::AttachEventLink(link) => {
                if let Some(last) = self.messages.last_mut() {
                    if last.role == Role::Assistant {
                        last.event_link = Some(link);
                    }
                }
            }
            HistoryEvent::Clear => self.messages.clear(),
            HistoryEvent::Replace(messages) => self.messages = messages,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
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
}
