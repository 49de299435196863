//! Core runtime loop: keyboard input, worker results, voice progress, and
//! consent-watch events all land here and are folded into `AppState`.

use anyhow::Result;
use chatterm::api::{ApiError, ApiResult, AssistantApi, ChatReply, GoogleAuthReply};
use chatterm::app::state::{AppState, Command, Mode};
use chatterm::audio::{AudioSink, CaptureConfig, LiveMeter, Recorder};
use chatterm::auth::{self, AuthPollConfig, AuthWatch, UrlOpener};
use chatterm::history::{HistoryEvent, Message};
use chatterm::log_debug;
use chatterm::session::SessionContext;
use chatterm::voice::{start_voice_job, VoiceJob};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::Backend;
use ratatui::Terminal;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::ui;

const EVENT_POLL_MS: u64 = 50;

/// Results delivered back to the UI thread by request workers.
pub enum UiEvent {
    Chat(Result<ChatReply, ApiError>),
    HistoryLoaded(ApiResult<Vec<Message>>),
    Cleared(ApiResult<()>),
    LoggedOut(ApiResult<()>),
    /// Outcome of an explicit "connect Google" request.
    Integration(ApiResult<GoogleAuthReply>),
}

pub struct EventLoopDeps {
    pub api: Arc<dyn AssistantApi>,
    pub sink: Arc<dyn AudioSink>,
    pub opener: Box<dyn UrlOpener>,
    pub recorder: Option<Arc<Mutex<Recorder>>>,
    pub capture_cfg: CaptureConfig,
    pub auth_cfg: AuthPollConfig,
    pub meter: LiveMeter,
}

pub fn run_event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    session: SessionContext,
    deps: EventLoopDeps,
) -> Result<()> {
    let mut state = AppState::new(session);
    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();
    let mut voice_job: Option<VoiceJob> = None;
    let mut auth_watch: Option<AuthWatch> = None;

    if state.session.is_authenticated() {
        spawn_history_load(&deps.api, &ui_tx);
    }

    loop {
        terminal.draw(|frame| ui::draw(frame, &state, deps.meter.level()))?;

        let mut commands: Vec<Command> = Vec::new();

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match handle_key(key, &mut state, &deps, &ui_tx, &mut commands) {
                        KeyOutcome::Quit => break,
                        KeyOutcome::Continue => {}
                    }
                }
                _ => {}
            }
        }

        while let Ok(event) = ui_rx.try_recv() {
            handle_ui_event(event, &mut state, &mut auth_watch, &deps, &mut commands);
        }

        if let Some(job) = voice_job.as_ref() {
            while let Some(message) = job.try_message() {
                if let Some(command) = state.handle_voice_message(message) {
                    commands.push(command);
                }
            }
        }

        if let Some(watch) = auth_watch.as_ref() {
            if let Some(event) = watch.try_event() {
                auth_watch = None;
                if let Some(command) = state.handle_auth_event(event) {
                    commands.push(command);
                }
            }
        }

        for command in commands {
            execute_command(
                command,
                &mut state,
                &deps,
                &ui_tx,
                &mut voice_job,
                &mut auth_watch,
            );
        }
    }

    if let Some(job) = voice_job.take() {
        job.request_stop();
        job.join();
    }
    if let Some(watch) = auth_watch.take() {
        watch.cancel();
        watch.join();
    }
    Ok(())
}

enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(
    key: KeyEvent,
    state: &mut AppState,
    deps: &EventLoopDeps,
    ui_tx: &mpsc::Sender<UiEvent>,
    commands: &mut Vec<Command>,
) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') => return KeyOutcome::Quit,
            KeyCode::Char('l') => {
                spawn_clear_history(&deps.api, ui_tx);
                return KeyOutcome::Continue;
            }
            KeyCode::Char('g') => {
                spawn_reconnect_google(&deps.api, ui_tx);
                return KeyOutcome::Continue;
            }
            KeyCode::Char('o') => {
                spawn_logout(&deps.api, ui_tx);
                return KeyOutcome::Continue;
            }
            _ => return KeyOutcome::Continue,
        }
    }

    // Sign-in screen: only the sign-in shortcut is live.
    if !state.session.is_authenticated() {
        if matches!(key.code, KeyCode::Char('g')) {
            spawn_sign_in(&deps.api, ui_tx);
        }
        return KeyOutcome::Continue;
    }

    match key.code {
        KeyCode::Tab => state.toggle_mode(),
        KeyCode::Enter => {
            if state.mode == Mode::Chat {
                if let Some(command) = state.submit_text() {
                    commands.push(command);
                }
            }
        }
        KeyCode::Backspace => {
            if state.mode == Mode::Chat {
                state.input.pop();
            }
        }
        KeyCode::Char(' ') if state.mode == Mode::Call => {
            if let Some(command) = state.record_pressed() {
                commands.push(command);
            }
        }
        KeyCode::Char(c) => {
            if state.mode == Mode::Chat {
                state.input.push(c);
            }
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_ui_event(
    event: UiEvent,
    state: &mut AppState,
    auth_watch: &mut Option<AuthWatch>,
    deps: &EventLoopDeps,
    commands: &mut Vec<Command>,
) {
    match event {
        UiEvent::Chat(outcome) => {
            if let Some(command) = state.handle_chat_outcome(outcome) {
                commands.push(command);
            }
        }
        UiEvent::HistoryLoaded(Ok(messages)) => state.handle_history_loaded(messages),
        UiEvent::HistoryLoaded(Err(err)) => {
            log_debug(&format!("history load failed: {err}"));
        }
        UiEvent::Cleared(outcome) => state.handle_clear_outcome(outcome),
        UiEvent::LoggedOut(Ok(())) => state.handle_logout(),
        UiEvent::LoggedOut(Err(err)) => {
            log_debug(&format!("logout failed: {err}"));
            state.handle_logout();
        }
        UiEvent::Integration(Ok(reply)) => {
            if let Some(auth_url) = reply.auth_url {
                start_auth_watch(auth_url, state, deps, auth_watch);
            } else if let Some(user) = reply.user {
                let had_session = state.session.is_authenticated();
                state.session.set_user(user);
                state.history.apply(HistoryEvent::AssistantMessage(
                    reply
                        .message
                        .unwrap_or_else(|| "Google account connected.".to_string()),
                ));
                if !had_session {
                    commands.push(Command::LoadHistory);
                }
            }
        }
        UiEvent::Integration(Err(err)) => {
            state.history.apply(HistoryEvent::AssistantMessage(format!(
                "Could not start Google sign-in: {err}"
            )));
        }
    }
}

fn execute_command(
    command: Command,
    state: &mut AppState,
    deps: &EventLoopDeps,
    ui_tx: &mpsc::Sender<UiEvent>,
    voice_job: &mut Option<VoiceJob>,
    auth_watch: &mut Option<AuthWatch>,
) {
    match command {
        Command::SendChat { message, is_speech } => {
            let api = deps.api.clone();
            let sender = ui_tx.clone();
            thread::spawn(move || {
                let outcome = api.chat(&message, is_speech);
                let _ = sender.send(UiEvent::Chat(outcome));
            });
        }
        Command::BeginAuthFlow { auth_url } => {
            start_auth_watch(auth_url, state, deps, auth_watch);
        }
        Command::LoadHistory => {
            spawn_history_load(&deps.api, ui_tx);
        }
        Command::StartRecording => match deps.recorder.as_ref() {
            Some(recorder) => {
                *voice_job = Some(start_voice_job(
                    recorder.clone(),
                    deps.api.clone(),
                    deps.sink.clone(),
                    deps.capture_cfg.clone(),
                    Some(deps.meter.clone()),
                ));
            }
            None => {
                state.recording_failed("No microphone available on this machine.");
            }
        },
        Command::StopRecording => {
            if let Some(job) = voice_job.as_ref() {
                job.request_stop();
            }
        }
    }
}

fn start_auth_watch(
    auth_url: String,
    state: &mut AppState,
    deps: &EventLoopDeps,
    auth_watch: &mut Option<AuthWatch>,
) {
    // One consent flow at a time; a second trigger supersedes the first.
    if let Some(watch) = auth_watch.take() {
        watch.cancel();
    }
    match auth::begin_auth_flow(deps.api.clone(), deps.opener.as_ref(), &auth_url, deps.auth_cfg) {
        Ok(watch) => *auth_watch = Some(watch),
        Err(err) => {
            state.history.apply(HistoryEvent::AssistantMessage(format!(
                "Could not open the authorization page: {err}. Visit {auth_url} manually."
            )));
        }
    }
}

fn spawn_history_load(api: &Arc<dyn AssistantApi>, ui_tx: &mpsc::Sender<UiEvent>) {
    let api = api.clone();
    let sender = ui_tx.clone();
    thread::spawn(move || {
        let _ = sender.send(UiEvent::HistoryLoaded(api.conversation_history()));
    });
}

fn spawn_clear_history(api: &Arc<dyn AssistantApi>, ui_tx: &mpsc::Sender<UiEvent>) {
    let api = api.clone();
    let sender = ui_tx.clone();
    thread::spawn(move || {
        let _ = sender.send(UiEvent::Cleared(api.clear_history()));
    });
}

fn spawn_logout(api: &Arc<dyn AssistantApi>, ui_tx: &mpsc::Sender<UiEvent>) {
    let api = api.clone();
    let sender = ui_tx.clone();
    thread::spawn(move || {
        let _ = sender.send(UiEvent::LoggedOut(api.logout()));
    });
}

fn spawn_sign_in(api: &Arc<dyn AssistantApi>, ui_tx: &mpsc::Sender<UiEvent>) {
    let api = api.clone();
    let sender = ui_tx.clone();
    thread::spawn(move || {
        let _ = sender.send(UiEvent::Integration(api.begin_google_auth()));
    });
}

/// Reconnect the calendar integration: drop the current Google session first
/// so the backend issues a fresh consent URL instead of reusing stale tokens.
fn spawn_reconnect_google(api: &Arc<dyn AssistantApi>, ui_tx: &mpsc::Sender<UiEvent>) {
    let api = api.clone();
    let sender = ui_tx.clone();
    thread::spawn(move || {
        if let Err(err) = api.logout() {
            log_debug(&format!("pre-auth logout failed: {err}"));
        }
        let _ = sender.send(UiEvent::Integration(api.begin_google_auth()));
    });
}
