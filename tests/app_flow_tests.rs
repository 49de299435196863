//! End-to-end flows through `AppState` driven by the scripted backend.

mod common;

use chatterm::api::{ApiError, AssistantApi, ChatReply, User};
use chatterm::app::state::{AppState, Command, RecordingState};
use chatterm::auth::AuthEvent;
use chatterm::history::Role;
use chatterm::session::SessionContext;
use chatterm::voice::VoiceJobMessage;
use common::FakeApi;

fn signed_in_state() -> AppState {
    let mut session = SessionContext::new();
    session.set_user(User {
        id: "u1".to_string(),
        name: Some("Test".to_string()),
        ..User::default()
    });
    AppState::new(session)
}

/// Run a SendChat command against the fake and fold the outcome back in.
fn run_chat_command(state: &mut AppState, api: &FakeApi, command: Command) -> Option<Command> {
    match command {
        Command::SendChat { message, is_speech } => {
            let outcome = api.chat(&message, is_speech);
            state.handle_chat_outcome(outcome)
        }
        other => panic!("expected SendChat, got {other:?}"),
    }
}

#[test]
fn text_turn_round_trips_through_the_backend() {
    let api = FakeApi::new();
    api.queue_chat(Ok(ChatReply {
        response: Some("hi there".to_string()),
        ..ChatReply::default()
    }));
    let mut state = signed_in_state();
    state.input = "hello".to_string();

    let command = state.submit_text().expect("command");
    assert!(run_chat_command(&mut state, &api, command).is_none());

    assert_eq!(api.recorded_chat_calls(), vec![("hello".to_string(), false)]);
    assert_eq!(state.history.len(), 2);
    assert_eq!(state.history.messages()[0].role, Role::User);
    assert_eq!(state.history.messages()[1].content, "hi there");
    assert!(!state.loading);
}

#[test]
fn consent_flow_retries_the_original_message_once() {
    let api = FakeApi::new();
    api.queue_chat(Ok(ChatReply {
        auth_url: Some("https://consent.example".to_string()),
        ..ChatReply::default()
    }));
    api.queue_chat(Ok(ChatReply {
        response: Some("Meeting scheduled.".to_string()),
        event_link: Some("https://cal/e/9".to_string()),
        ..ChatReply::default()
    }));
    let mut state = signed_in_state();
    state.input = "schedule a meeting tomorrow".to_string();

    let command = state.submit_text().expect("command");
    let follow_up = run_chat_command(&mut state, &api, command);
    assert_eq!(
        follow_up,
        Some(Command::BeginAuthFlow {
            auth_url: "https://consent.example".to_string()
        })
    );

    // Browser consent completes and the watch reports success.
    let retry = state
        .handle_auth_event(AuthEvent::Authorized(None))
        .expect("retry command");
    assert!(run_chat_command(&mut state, &api, retry).is_none());

    let calls = api.recorded_chat_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "schedule a meeting tomorrow");
    assert_eq!(calls[1].0, "schedule a meeting tomorrow");

    // The user's message appears exactly once in the transcript.
    let user_entries = state
        .history
        .messages()
        .iter()
        .filter(|m| m.role == Role::User)
        .count();
    assert_eq!(user_entries, 1);

    let last = state.history.last().unwrap();
    assert_eq!(last.content, "Meeting scheduled.");
    assert_eq!(last.event_link.as_deref(), Some("https://cal/e/9"));
}

#[test]
fn session_expiry_blocks_further_turns_until_reauth() {
    let api = FakeApi::new();
    api.queue_chat(Err(ApiError::SessionExpired));
    let mut state = signed_in_state();
    state.input = "hello".to_string();

    let command = state.submit_text().expect("command");
    run_chat_command(&mut state, &api, command);

    assert!(state.session_expired);
    state.input = "hello again".to_string();
    assert!(state.submit_text().is_none());
    assert_eq!(api.recorded_chat_calls().len(), 1);

    // A completed consent flow restores the session.
    state.handle_auth_event(AuthEvent::Authorized(Some(User {
        id: "u1".to_string(),
        ..User::default()
    })));
    assert!(!state.session_expired);
    state.input = "hello again".to_string();
    assert!(state.submit_text().is_some());
}

#[test]
fn voice_turn_updates_transcript_and_states() {
    let mut state = signed_in_state();
    assert_eq!(state.record_pressed(), Some(Command::StartRecording));

    state.handle_voice_message(VoiceJobMessage::CaptureEnded {
        metrics: Default::default(),
    });
    state.handle_voice_message(VoiceJobMessage::TranscriptReady {
        text: "read my schedule".to_string(),
    });
    state.handle_voice_message(VoiceJobMessage::ReplyReady {
        reply: ChatReply {
            response: Some("You are free all day.".to_string()),
            ..ChatReply::default()
        },
    });
    state.handle_voice_message(VoiceJobMessage::PlaybackStarted);

    // Record control is inert while the reply is playing.
    assert_eq!(state.recording_state, RecordingState::Playing);
    assert!(state.record_pressed().is_none());

    state.handle_voice_message(VoiceJobMessage::PlaybackFinished);
    assert_eq!(state.recording_state, RecordingState::Idle);

    let contents: Vec<&str> = state
        .history
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["read my schedule", "You are free all day."]);
}

#[test]
fn empty_voice_turn_leaves_one_notice() {
    let mut state = signed_in_state();
    state.record_pressed();
    state.handle_voice_message(VoiceJobMessage::CaptureEnded {
        metrics: Default::default(),
    });
    state.handle_voice_message(VoiceJobMessage::Empty);

    assert_eq!(state.history.len(), 1);
    assert_eq!(
        state.history.last().unwrap().content,
        "Could not process audio."
    );
    assert_eq!(state.recording_state, RecordingState::Idle);
    assert!(!state.loading);
}

#[test]
fn clear_history_uses_backend_outcome() {
    let api = FakeApi::new();
    let mut state = signed_in_state();
    state.input = "hello".to_string();
    api.queue_chat(Ok(ChatReply::default()));
    let command = state.submit_text().expect("command");
    run_chat_command(&mut state, &api, command);
    assert!(!state.history.is_empty());

    state.handle_clear_outcome(api.clear_history());
    assert!(state.history.is_empty());
    assert_eq!(*api.clear_calls.lock().unwrap(), 1);

    *api.clear_should_fail.lock().unwrap() = true;
    state.handle_clear_outcome(api.clear_history());
    assert_eq!(
        state.history.last().unwrap().content,
        "Failed to clear history."
    );
}

#[test]
fn sign_in_after_expiry_restores_server_history() {
    use chatterm::history::Message;
    let api = FakeApi::new();
    api.queue_chat(Err(ApiError::SessionExpired));
    api.history.lock().unwrap().extend(vec![
        Message::user("remind me about the standup"),
        Message::assistant("Reminder set."),
    ]);

    let mut state = signed_in_state();
    state.input = "hello".to_string();
    let command = state.submit_text().expect("command");
    run_chat_command(&mut state, &api, command);
    assert!(state.session_expired);

    // Consent completes with a fresh session; the state asks for the server
    // transcript instead of keeping the stale local one.
    let command = state.handle_auth_event(AuthEvent::Authorized(Some(User {
        id: "u1".to_string(),
        ..User::default()
    })));
    assert_eq!(command, Some(Command::LoadHistory));

    state.handle_history_loaded(api.conversation_history().unwrap());
    assert_eq!(state.history.len(), 2);
    assert_eq!(
        state.history.messages()[0].content,
        "remind me about the standup"
    );
    assert_eq!(state.history.messages()[1].content, "Reminder set.");
}

#[test]
fn server_history_replaces_local_transcript() {
    use chatterm::history::Message;
    let api = FakeApi::new();
    api.history.lock().unwrap().extend(vec![
        Message::user("earlier question"),
        Message::assistant("earlier answer"),
    ]);

    let mut state = signed_in_state();
    state.handle_history_loaded(api.conversation_history().unwrap());
    assert_eq!(state.history.len(), 2);
    assert_eq!(state.history.messages()[0].content, "earlier question");
}
