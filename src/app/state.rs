//! UI-independent application state.
//!
//! `AppState` owns the transcript, the recording state machine, and the
//! pending-retry bookkeeping for the consent flow. Input handlers return a
//! [`Command`] when side effects are needed; the event loop executes them.
//! Keeping side effects out of here is what makes the flows testable.

use crate::api::{ApiError, ChatReply};
use crate::auth::AuthEvent;
use crate::history::{ConversationHistory, HistoryEvent, Message};
use crate::session::SessionContext;
use crate::voice::VoiceJobMessage;

/// Voice-side state machine. Recording can only start from `Idle`; while a
/// reply is playing the record control is inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Playing,
}

/// Which interaction surface is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chat,
    Call,
}

/// Side effect requested by a state transition, executed by the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SendChat { message: String, is_speech: bool },
    BeginAuthFlow { auth_url: String },
    /// Fetch server-side history, e.g. right after a sign-in.
    LoadHistory,
    StartRecording,
    StopRecording,
}

pub struct AppState {
    pub mode: Mode,
    pub history: ConversationHistory,
    pub recording_state: RecordingState,
    /// A chat request is in flight; input is held until the reply lands.
    pub loading: bool,
    pub input: String,
    pub session: SessionContext,
    /// Most recent user message and whether it came from speech, retried
    /// verbatim after a successful consent flow.
    last_user_message: Option<(String, bool)>,
    pending_retry: Option<(String, bool)>,
    /// Set when the backend rejected our session; the UI shows a sign-in
    /// prompt and message submission is disabled.
    pub session_expired: bool,
}

impl AppState {
    pub fn new(session: SessionContext) -> Self {
        Self {
            mode: Mode::Chat,
            history: ConversationHistory::new(),
            recording_state: RecordingState::Idle,
            loading: false,
            input: String::new(),
            session,
            last_user_message: None,
            pending_retry: None,
            session_expired: false,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            Mode::Chat => Mode::Call,
            Mode::Call => Mode::Chat,
        };
    }

    /// Submit the typed input as a chat turn. The user's entry is echoed into
    /// the transcript immediately; the reply arrives asynchronously.
    pub fn submit_text(&mut self) -> Option<Command> {
        let message = self.input.trim().to_string();
        if message.is_empty() || self.loading || self.session_expired {
            return None;
        }
        if !self.session.is_authenticated() {
            return None;
        }
        self.input.clear();
        self.history.apply(HistoryEvent::UserMessage(message.clone()));
        self.last_user_message = Some((message.clone(), false));
        self.loading = true;
        Some(Command::SendChat {
            message,
            is_speech: false,
        })
    }

    /// Handle the record control. Only `Idle` starts a capture; pressing it
    /// again while recording requests a stop, and `Playing` ignores it.
    pub fn record_pressed(&mut self) -> Option<Command> {
        match self.recording_state {
            RecordingState::Idle => {
                if self.loading || self.session_expired || !self.session.is_authenticated() {
                    return None;
                }
                self.recording_state = RecordingState::Recording;
                Some(Command::StartRecording)
            }
            RecordingState::Recording => Some(Command::StopRecording),
            RecordingState::Playing => None,
        }
    }

    /// Called when starting the recorder failed after the state already moved
    /// to `Recording`.
    pub fn recording_failed(&mut self, reason: &str) {
        self.recording_state = RecordingState::Idle;
        self.history
            .apply(HistoryEvent::AssistantMessage(reason.to_string()));
    }

    pub fn handle_chat_outcome(&mut self, outcome: Result<ChatReply, ApiError>) -> Option<Command> {
        self.loading = false;
        match outcome {
            Ok(reply) => self.handle_chat_reply(reply),
            Err(ApiError::SessionExpired) => {
                self.mark_session_expired();
                None
            }
            Err(_) => {
                self.history.apply(HistoryEvent::AssistantMessage(
                    "Error processing request.".to_string(),
                ));
                None
            }
        }
    }

    /// Apply a reply to the transcript. An `auth_url` turns into a consent
    /// prompt plus a pending retry of the message that triggered it.
    pub fn handle_chat_reply(&mut self, reply: ChatReply) -> Option<Command> {
        if let Some(error) = reply.error {
            let text = reply
                .response
                .unwrap_or_else(|| format!("Error: {error}"));
            self.history.apply(HistoryEvent::AssistantMessage(text));
            return None;
        }

        if let Some(auth_url) = reply.auth_url {
            let text = reply.response.unwrap_or_else(|| {
                "I need access to your Google Calendar. Opening the authorization page..."
                    .to_string()
            });
            self.history.apply(HistoryEvent::AssistantMessage(text));
            self.pending_retry = self.last_user_message.clone();
            return Some(Command::BeginAuthFlow { auth_url });
        }

        if let Some(response) = reply.response {
            self.history.apply(HistoryEvent::AssistantMessage(response));
        }
        if let Some(link) = reply.event_link {
            self.history.apply(HistoryEvent::AttachEventLink(link));
        }
        None
    }

    /// Fold one voice-pipeline progress message into the state.
    pub fn handle_voice_message(&mut self, message: VoiceJobMessage) -> Option<Command> {
        match message {
            VoiceJobMessage::CaptureEnded { .. } => {
                self.recording_state = RecordingState::Idle;
                self.loading = true;
                None
            }
            VoiceJobMessage::TranscriptReady { text } => {
                self.last_user_message = Some((text.clone(), true));
                self.history.apply(HistoryEvent::UserMessage(text));
                None
            }
            VoiceJobMessage::ReplyReady { reply } => {
                self.loading = false;
                self.handle_chat_reply(reply)
            }
            VoiceJobMessage::PlaybackStarted => {
                self.recording_state = RecordingState::Playing;
                None
            }
            VoiceJobMessage::PlaybackFinished => {
                self.recording_state = RecordingState::Idle;
                None
            }
            VoiceJobMessage::Empty => {
                self.loading = false;
                self.recording_state = RecordingState::Idle;
                self.history.apply(HistoryEvent::AssistantMessage(
                    "Could not process audio.".to_string(),
                ));
                None
            }
            VoiceJobMessage::Error(text) => {
                self.loading = false;
                self.recording_state = RecordingState::Idle;
                self.history.apply(HistoryEvent::AssistantMessage(text));
                None
            }
        }
    }

    /// Fold the outcome of a consent watch into the state. On success the
    /// message that triggered the flow is retried without being re-echoed;
    /// when the flow established a brand-new session the server transcript is
    /// fetched so a returning user sees their prior conversation.
    pub fn handle_auth_event(&mut self, event: AuthEvent) -> Option<Command> {
        match event {
            AuthEvent::Authorized(user) => {
                let had_session = self.session.is_authenticated();
                if let Some(user) = user {
                    self.session.set_user(user);
                }
                self.session_expired = false;
                if let Some((message, is_speech)) = self.pending_retry.take() {
                    self.history.apply(HistoryEvent::AssistantMessage(
                        "Authorization successful! Retrying your request...".to_string(),
                    ));
                    self.loading = true;
                    Some(Command::SendChat { message, is_speech })
                } else {
                    self.history.apply(HistoryEvent::AssistantMessage(
                        "Authorization successful!".to_string(),
                    ));
                    if had_session {
                        None
                    } else {
                        Some(Command::LoadHistory)
                    }
                }
            }
            AuthEvent::Failed(reason) => {
                self.pending_retry = None;
                self.history.apply(HistoryEvent::AssistantMessage(format!(
                    "Authentication failed or cancelled: {reason}"
                )));
                None
            }
        }
    }

    pub fn handle_clear_outcome(&mut self, outcome: Result<(), ApiError>) {
        match outcome {
            Ok(()) => self.history.apply(HistoryEvent::Clear),
            Err(ApiError::SessionExpired) => self.mark_session_expired(),
            Err(_) => self.history.apply(HistoryEvent::AssistantMessage(
                "Failed to clear history.".to_string(),
            )),
        }
    }

    pub fn handle_history_loaded(&mut self, messages: Vec<Message>) {
        self.history.apply(HistoryEvent::Replace(messages));
    }

    pub fn handle_logout(&mut self) {
        self.session.clear();
        self.history.apply(HistoryEvent::Clear);
        self.pending_retry = None;
        self.last_user_message = None;
        self.session_expired = false;
    }

    fn mark_session_expired(&mut self) {
        self.session_expired = true;
        self.session.clear();
    }

    pub fn pending_retry(&self) -> Option<&str> {
        self.pending_retry.as_ref().map(|(message, _)| message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::User;
    use crate::history::Role;

    fn signed_in_state() -> AppState {
        let mut session = SessionContext::new();
        session.set_user(User {
            id: "u1".into(),
            name: Some("Test".into()),
            ..User::default()
        });
        AppState::new(session)
    }

    fn reply_with_response(text: &str) -> ChatReply {
        ChatReply {
            response: Some(text.to_string()),
            ..ChatReply::default()
        }
    }

    #[test]
    fn text_turn_echoes_then_appends_reply() {
        let mut state = signed_in_state();
        state.input = "hello".to_string();

        let command = state.submit_text().unwrap();
        assert_eq!(
            command,
            Command::SendChat {
                message: "hello".to_string(),
                is_speech: false
            }
        );
        assert!(state.loading);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history.last().unwrap().role, Role::User);

        assert!(state
            .handle_chat_outcome(Ok(reply_with_response("hi there")))
            .is_none());
        assert!(!state.loading);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history.last().unwrap().content, "hi there");
    }

    #[test]
    fn empty_or_busy_input_is_not_submitted() {
        let mut state = signed_in_state();
        state.input = "   ".to_string();
        assert!(state.submit_text().is_none());

        state.input = "hello".to_string();
        state.loading = true;
        assert!(state.submit_text().is_none());
        assert!(state.history.is_empty());
    }

    #[test]
    fn unauthenticated_input_is_not_submitted() {
        let mut state = AppState::new(SessionContext::new());
        state.input = "hello".to_string();
        assert!(state.submit_text().is_none());
        assert!(state.history.is_empty());
    }

    #[test]
    fn chat_failure_appends_generic_error() {
        let mut state = signed_in_state();
        state.input = "hello".to_string();
        state.submit_text();
        state.handle_chat_outcome(Err(ApiError::Status(500)));
        assert_eq!(
            state.history.last().unwrap().content,
            "Error processing request."
        );
        assert!(!state.loading);
    }

    #[test]
    fn expired_session_disables_submission() {
        let mut state = signed_in_state();
        state.input = "hello".to_string();
        state.submit_text();
        state.handle_chat_outcome(Err(ApiError::SessionExpired));
        assert!(state.session_expired);
        assert!(!state.session.is_authenticated());

        state.input = "again".to_string();
        assert!(state.submit_text().is_none());
    }

    #[test]
    fn reply_error_field_prefers_response_text() {
        let mut state = signed_in_state();
        state.handle_chat_reply(ChatReply {
            response: Some("Something went wrong.".into()),
            error: Some("boom".into()),
            ..ChatReply::default()
        });
        assert_eq!(
            state.history.last().unwrap().content,
            "Something went wrong."
        );

        state.handle_chat_reply(ChatReply {
            error: Some("boom".into()),
            ..ChatReply::default()
        });
        assert_eq!(state.history.last().unwrap().content, "Error: boom");
    }

    #[test]
    fn auth_url_reply_requests_consent_and_arms_retry() {
        let mut state = signed_in_state();
        state.input = "schedule a meeting".to_string();
        state.submit_text();

        let command = state.handle_chat_outcome(Ok(ChatReply {
            auth_url: Some("https://consent".into()),
            ..ChatReply::default()
        }));
        assert_eq!(
            command,
            Some(Command::BeginAuthFlow {
                auth_url: "https://consent".to_string()
            })
        );
        assert_eq!(state.pending_retry(), Some("schedule a meeting"));
        assert_eq!(state.history.last().unwrap().role, Role::Assistant);
    }

    #[test]
    fn successful_auth_retries_without_re_echoing_user_message() {
        let mut state = signed_in_state();
        state.input = "schedule a meeting".to_string();
        state.submit_text();
        state.handle_chat_outcome(Ok(ChatReply {
            auth_url: Some("https://consent".into()),
            ..ChatReply::default()
        }));

        let user_entries_before = state
            .history
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();

        let command = state.handle_auth_event(AuthEvent::Authorized(None));
        assert_eq!(
            command,
            Some(Command::SendChat {
                message: "schedule a meeting".to_string(),
                is_speech: false
            })
        );
        assert!(state.loading);

        let user_entries_after = state
            .history
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        assert_eq!(user_entries_before, user_entries_after);
        assert!(state.pending_retry().is_none());
    }

    #[test]
    fn fresh_sign_in_loads_server_history() {
        let mut state = AppState::new(SessionContext::new());
        let command = state.handle_auth_event(AuthEvent::Authorized(Some(User {
            id: "u1".into(),
            ..User::default()
        })));
        assert_eq!(command, Some(Command::LoadHistory));
        assert!(state.session.is_authenticated());
        assert_eq!(
            state.history.last().unwrap().content,
            "Authorization successful!"
        );
    }

    #[test]
    fn reauth_with_live_session_does_not_reload_history() {
        let mut state = signed_in_state();
        assert!(state.handle_auth_event(AuthEvent::Authorized(None)).is_none());
    }

    #[test]
    fn voice_retry_keeps_the_speech_flag() {
        let mut state = signed_in_state();
        state.handle_voice_message(VoiceJobMessage::TranscriptReady {
            text: "book a meeting".to_string(),
        });
        state.handle_chat_reply(ChatReply {
            auth_url: Some("https://consent".into()),
            ..ChatReply::default()
        });

        let command = state.handle_auth_event(AuthEvent::Authorized(None));
        assert_eq!(
            command,
            Some(Command::SendChat {
                message: "book a meeting".to_string(),
                is_speech: true
            })
        );
    }

    #[test]
    fn failed_auth_reports_and_drops_retry() {
        let mut state = signed_in_state();
        state.input = "schedule a meeting".to_string();
        state.submit_text();
        state.handle_chat_outcome(Ok(ChatReply {
            auth_url: Some("https://consent".into()),
            ..ChatReply::default()
        }));

        assert!(state
            .handle_auth_event(AuthEvent::Failed("timed out".into()))
            .is_none());
        assert!(state.pending_retry().is_none());
        assert!(state
            .history
            .last()
            .unwrap()
            .content
            .contains("Authentication failed or cancelled"));
    }

    #[test]
    fn event_link_is_attached_to_the_reply() {
        let mut state = signed_in_state();
        state.handle_chat_reply(ChatReply {
            response: Some("Event created.".into()),
            event_link: Some("https://cal/e/1".into()),
            ..ChatReply::default()
        });
        let last = state.history.last().unwrap();
        assert_eq!(last.content, "Event created.");
        assert_eq!(last.event_link.as_deref(), Some("https://cal/e/1"));
    }

    #[test]
    fn recording_starts_only_from_idle() {
        let mut state = signed_in_state();
        assert_eq!(state.record_pressed(), Some(Command::StartRecording));
        assert_eq!(state.recording_state, RecordingState::Recording);

        // Second press stops rather than starting a concurrent session.
        assert_eq!(state.record_pressed(), Some(Command::StopRecording));

        state.recording_state = RecordingState::Playing;
        assert!(state.record_pressed().is_none());
    }

    #[test]
    fn recording_requires_an_authenticated_idle_session() {
        let mut state = AppState::new(SessionContext::new());
        assert!(state.record_pressed().is_none());

        let mut state = signed_in_state();
        state.loading = true;
        assert!(state.record_pressed().is_none());
    }

    #[test]
    fn voice_turn_walks_through_the_expected_states() {
        let mut state = signed_in_state();
        state.record_pressed();

        state.handle_voice_message(VoiceJobMessage::CaptureEnded {
            metrics: Default::default(),
        });
        assert_eq!(state.recording_state, RecordingState::Idle);
        assert!(state.loading);

        state.handle_voice_message(VoiceJobMessage::TranscriptReady {
            text: "what's on my calendar".to_string(),
        });
        assert_eq!(state.history.last().unwrap().role, Role::User);

        state.handle_voice_message(VoiceJobMessage::ReplyReady {
            reply: reply_with_response("You have two events."),
        });
        assert!(!state.loading);
        assert_eq!(
            state.history.last().unwrap().content,
            "You have two events."
        );

        state.handle_voice_message(VoiceJobMessage::PlaybackStarted);
        assert_eq!(state.recording_state, RecordingState::Playing);
        state.handle_voice_message(VoiceJobMessage::PlaybackFinished);
        assert_eq!(state.recording_state, RecordingState::Idle);
    }

    #[test]
    fn empty_voice_capture_yields_single_notice() {
        let mut state = signed_in_state();
        state.record_pressed();
        state.handle_voice_message(VoiceJobMessage::CaptureEnded {
            metrics: Default::default(),
        });
        state.handle_voice_message(VoiceJobMessage::Empty);

        assert_eq!(state.recording_state, RecordingState::Idle);
        assert!(!state.loading);
        assert_eq!(state.history.len(), 1);
        assert_eq!(
            state.history.last().unwrap().content,
            "Could not process audio."
        );
    }

    #[test]
    fn clear_history_outcomes() {
        let mut state = signed_in_state();
        state.history.apply(HistoryEvent::UserMessage("hi".into()));

        state.handle_clear_outcome(Ok(()));
        assert!(state.history.is_empty());

        state.history.apply(HistoryEvent::UserMessage("hi".into()));
        state.handle_clear_outcome(Err(ApiError::Status(500)));
        assert_eq!(
            state.history.last().unwrap().content,
            "Failed to clear history."
        );
    }

    #[test]
    fn logout_clears_session_and_transcript() {
        let mut state = signed_in_state();
        state.history.apply(HistoryEvent::UserMessage("hi".into()));
        state.handle_logout();
        assert!(!state.session.is_authenticated());
        assert!(state.history.is_empty());
    }

    #[test]
    fn mode_toggles_between_chat_and_call() {
        let mut state = signed_in_state();
        assert_eq!(state.mode, Mode::Chat);
        state.toggle_mode();
        assert_eq!(state.mode, Mode::Call);
        state.toggle_mode();
        assert_eq!(state.mode, Mode::Chat);
    }
}
