//! chatterm entrypoint: terminal chat client with voice calls.
//!
//! # Architecture
//!
//! - UI thread: ratatui draw loop plus keyboard handling
//! - Request workers: short-lived threads for chat/history/auth requests
//! - Voice worker: capture, transcription, and reply playback for one turn
//! - Auth watch: background polling while browser consent is pending

mod event_loop;
mod ui;

use anyhow::{Context, Result};
use chatterm::api::HttpApi;
use chatterm::audio::{LiveMeter, Recorder, RodioSink};
use chatterm::auth::SystemOpener;
use chatterm::config::AppConfig;
use chatterm::session::SessionContext;
use chatterm::{init_logging, init_tracing, log_debug, log_panic};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::panic;
use std::sync::{Arc, Mutex};

use crate::event_loop::{run_event_loop, EventLoopDeps};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;

    if config.list_input_devices {
        for name in Recorder::list_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    init_logging(&config);
    init_tracing(&config);
    log_debug("=== chatterm started ===");

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        default_hook(info);
    }));

    let api = Arc::new(HttpApi::new(&config.server_url, config.http_timeout())?);
    let session = match SessionContext::init(api.as_ref()) {
        Ok(session) => session,
        Err(err) => {
            log_debug(&format!("session init failed: {err}"));
            SessionContext::new()
        }
    };

    // A missing microphone downgrades voice mode instead of blocking chat.
    let recorder = match Recorder::new(config.input_device.as_deref()) {
        Ok(recorder) => {
            log_debug(&format!("input device: {}", recorder.device_name()));
            Some(Arc::new(Mutex::new(recorder)))
        }
        Err(err) => {
            log_debug(&format!("no recorder available: {err:#}"));
            None
        }
    };

    enable_raw_mode().context("failed to enter raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).context("failed to build terminal")?;

    let deps = EventLoopDeps {
        api,
        sink: Arc::new(RodioSink),
        opener: Box::new(SystemOpener),
        recorder,
        capture_cfg: config.capture_config(),
        auth_cfg: config.auth_poll_config(),
        meter: LiveMeter::new(),
    };

    let result = run_event_loop(&mut terminal, session, deps);

    disable_raw_mode().ok();
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture).ok();
    terminal.show_cursor().ok();

    log_debug("=== chatterm exiting ===");
    result
}
