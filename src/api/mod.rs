//! Assistant backend client.
//!
//! `AssistantApi` is the seam between the UI/voice pipeline and the HTTP
//! client, so everything above it can be exercised against a fake.

mod http;
mod types;

pub use http::HttpApi;
pub use types::{
    AuthStatus, ChatReply, ChatRequest, GoogleAuthReply, HistoryReply, SessionReply,
    TranscriptionReply, User,
};

use crate::history::Message;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the session cookie. The client must surface a
    /// sign-in prompt; retrying the same request will not help.
    #[error("session expired")]
    SessionExpired,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Every backend operation the client performs.
pub trait AssistantApi: Send + Sync {
    /// Send a chat turn and get the assistant's reply.
    fn chat(&self, message: &str, is_speech: bool) -> ApiResult<ChatReply>;

    /// Submit captured speech as a WAV buffer for transcription.
    fn transcribe(&self, wav_bytes: Vec<u8>) -> ApiResult<TranscriptionReply>;

    fn conversation_history(&self) -> ApiResult<Vec<Message>>;

    fn clear_history(&self) -> ApiResult<()>;

    /// Lightweight poll used while waiting for browser consent to complete.
    fn auth_status(&self) -> ApiResult<AuthStatus>;

    /// Full session lookup, returning the current user if any.
    fn session(&self) -> ApiResult<SessionReply>;

    /// Start the Google consent flow; returns a URL to open or the user if
    /// the backend already holds valid credentials.
    fn begin_google_auth(&self) -> ApiResult<GoogleAuthReply>;

    fn logout(&self) -> ApiResult<()>;
}
