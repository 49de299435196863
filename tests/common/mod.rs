//! Shared instrumentable fake of the backend API for integration tests.

use chatterm::api::{
    ApiError, ApiResult, AssistantApi, AuthStatus, ChatReply, GoogleAuthReply, SessionReply,
    TranscriptionReply, User,
};
use chatterm::history::Message;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted backend: responses are queued per endpoint and every chat call is
/// recorded so tests can assert on what was (or was not) sent.
#[derive(Default)]
pub struct FakeApi {
    pub chat_replies: Mutex<VecDeque<ApiResult<ChatReply>>>,
    pub transcriptions: Mutex<VecDeque<ApiResult<TranscriptionReply>>>,
    pub history: Mutex<Vec<Message>>,
    pub auth_statuses: Mutex<VecDeque<ApiResult<AuthStatus>>>,
    pub sessions: Mutex<VecDeque<ApiResult<SessionReply>>>,
    pub google_replies: Mutex<VecDeque<ApiResult<GoogleAuthReply>>>,
    pub chat_calls: Mutex<Vec<(String, bool)>>,
    pub clear_calls: Mutex<usize>,
    pub clear_should_fail: Mutex<bool>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_chat(&self, reply: ApiResult<ChatReply>) {
        self.chat_replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_transcription(&self, reply: ApiResult<TranscriptionReply>) {
        self.transcriptions.lock().unwrap().push_back(reply);
    }

    pub fn recorded_chat_calls(&self) -> Vec<(String, bool)> {
        self.chat_calls.lock().unwrap().clone()
    }
}

impl AssistantApi for FakeApi {
    fn chat(&self, message: &str, is_speech: bool) -> ApiResult<ChatReply> {
        self.chat_calls
            .lock()
            .unwrap()
            .push((message.to_string(), is_speech));
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Status(500)))
    }

    fn transcribe(&self, _wav_bytes: Vec<u8>) -> ApiResult<TranscriptionReply> {
        self.transcriptions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Status(500)))
    }

    fn conversation_history(&self) -> ApiResult<Vec<Message>> {
        Ok(self.history.lock().unwrap().clone())
    }

    fn clear_history(&self) -> ApiResult<()> {
        *self.clear_calls.lock().unwrap() += 1;
        if *self.clear_should_fail.lock().unwrap() {
            Err(ApiError::Status(500))
        } else {
            Ok(())
        }
    }

    fn auth_status(&self) -> ApiResult<AuthStatus> {
        self.auth_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(AuthStatus {
                    authenticated: true,
                    user: None,
                })
            })
    }

    fn session(&self) -> ApiResult<SessionReply> {
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(SessionReply {
                    user: Some(User {
                        id: "fake-user".to_string(),
                        name: Some("Fake User".to_string()),
                        ..User::default()
                    }),
                })
            })
    }

    fn begin_google_auth(&self) -> ApiResult<GoogleAuthReply> {
        self.google_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Status(500)))
    }

    fn logout(&self) -> ApiResult<()> {
        Ok(())
    }
}
