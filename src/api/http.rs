//! Blocking HTTP implementation of [`AssistantApi`].
//!
//! Sessions are cookie-based, so the client keeps a cookie store and every
//! request rides the same jar. 401 responses map to `SessionExpired` so
//! callers can distinguish "sign in again" from transport failures.

use super::types::{
    AuthStatus, ChatReply, ChatRequest, GoogleAuthReply, HistoryReply, SessionReply,
    TranscriptionReply,
};
use super::{ApiError, ApiResult, AssistantApi};
use crate::history::Message;
use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a response's status before the body is read. A 401 means the
    /// session cookie is no longer valid.
    fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

impl AssistantApi for HttpApi {
    fn chat(&self, message: &str, is_speech: bool) -> ApiResult<ChatReply> {
        tracing::debug!(is_speech, "sending chat turn");
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&ChatRequest { message, is_speech })
            .send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn transcribe(&self, wav_bytes: Vec<u8>) -> ApiResult<TranscriptionReply> {
        tracing::debug!(bytes = wav_bytes.len(), "uploading audio for transcription");
        let part = Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = Form::new().part("audio", part);
        let response = self
            .client
            .post(self.url("/api/speech-to-text"))
            .multipart(form)
            .send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn conversation_history(&self) -> ApiResult<Vec<Message>> {
        let response = self
            .client
            .get(self.url("/api/conversation_history"))
            .send()?;
        let reply: HistoryReply = Self::check(response)?.json()?;
        Ok(reply.conversation_history)
    }

    fn clear_history(&self) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url("/api/clear_chat_history"))
            .send()?;
        Self::check(response)?;
        Ok(())
    }

    fn auth_status(&self) -> ApiResult<AuthStatus> {
        let response = self.client.get(self.url("/api/auth_status")).send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn session(&self) -> ApiResult<SessionReply> {
        let response = self.client.get(self.url("/api/auth/session")).send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn begin_google_auth(&self) -> ApiResult<GoogleAuthReply> {
        let response = self.client.get(self.url("/api/auth/google")).send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn logout(&self) -> ApiResult<()> {
        let response = self.client.post(self.url("/api/auth/logout")).send()?;
        Self::check(response)?;
        Ok(())
    }
}
