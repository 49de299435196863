//! Wire types shared with the assistant backend.
//!
//! The backend speaks camelCase for a couple of fields; serde attributes keep
//! the Rust side idiomatic without changing what goes over the wire.

use crate::history::Message;
use serde::{Deserialize, Serialize};

/// Authenticated (or guest) account as reported by the session endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "isGuest", default)]
    pub is_guest: bool,
}

impl User {
    /// Best label available for display: name, then email, then id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Body of a chat turn. `is_speech` tells the backend whether the message
/// came from transcribed audio so it can synthesize a spoken reply.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub is_speech: bool,
}

/// Reply to a chat turn. Every field is optional; which ones are set drives
/// the client's handling (plain reply, spoken reply, re-auth prompt, or a
/// created calendar event link).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    /// Base64-encoded synthesized speech, present for spoken turns.
    #[serde(default)]
    pub audio: Option<String>,
    /// Set when the backend needs the user to re-run the consent flow.
    #[serde(alias = "authUrl", default)]
    pub auth_url: Option<String>,
    /// Link to a calendar event the assistant created for this turn.
    #[serde(default)]
    pub event_link: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply from the speech-to-text endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionReply {
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionReply {
    #[serde(default)]
    pub user: Option<User>,
}

/// Reply from the Google auth bootstrap endpoint. Either `auth_url` is set
/// (consent needed) or `user` is (already authorized).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleAuthReply {
    #[serde(alias = "authUrl", default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryReply {
    #[serde(default)]
    pub conversation_history: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_reply_accepts_both_auth_url_spellings() {
        let camel: ChatReply = serde_json::from_str(r#"{"authUrl":"https://a"}"#).unwrap();
        assert_eq!(camel.auth_url.as_deref(), Some("https://a"));

        let snake: ChatReply = serde_json::from_str(r#"{"auth_url":"https://b"}"#).unwrap();
        assert_eq!(snake.auth_url.as_deref(), Some("https://b"));
    }

    #[test]
    fn chat_reply_defaults_missing_fields() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert_eq!(reply.response.as_deref(), Some("hi"));
        assert!(reply.audio.is_none());
        assert!(reply.auth_url.is_none());
        assert!(reply.event_link.is_none());
        assert!(reply.error.is_none());
    }

    #[test]
    fn user_parses_guest_flag() {
        let user: User =
            serde_json::from_str(r#"{"id":"guest-1","name":"Guest","isGuest":true}"#).unwrap();
        assert!(user.is_guest);
        assert_eq!(user.display_name(), "Guest");
    }

    #[test]
    fn display_name_falls_back_to_email_then_id() {
        let user: User = serde_json::from_str(r#"{"id":"u1","email":"a@b.c"}"#).unwrap();
        assert_eq!(user.display_name(), "a@b.c");
        let bare: User = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(bare.display_name(), "u2");
    }

    #[test]
    fn chat_request_serializes_speech_flag() {
        let body = serde_json::to_value(ChatRequest {
            message: "hello",
            is_speech: true,
        })
        .unwrap();
        assert_eq!(body["message"], "hello");
        assert_eq!(body["is_speech"], true);
    }
}
