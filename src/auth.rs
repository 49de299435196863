//! Google consent flow: open the consent URL in a browser and poll the
//! backend until the session shows up, with a hard cap on how long we wait.
//!
//! The terminal cannot observe the browser window, so completion is detected
//! purely through `auth_status` polling. The watch is cancellable and always
//! terminates: success, failure, cancel, or timeout.

use crate::api::{ApiError, AssistantApi, User};
use crate::log_debug;
use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Seam for launching the system browser so the flow is testable headless.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs with the platform launcher command.
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        #[cfg(target_os = "macos")]
        let mut command = {
            let mut c = Command::new("open");
            c.arg(url);
            c
        };
        #[cfg(target_os = "windows")]
        let mut command = {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", "", url]);
            c
        };
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let mut command = {
            let mut c = Command::new("xdg-open");
            c.arg(url);
            c
        };

        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to launch browser; open the URL manually")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthPollConfig {
    /// How often to ask the backend whether consent completed.
    pub poll_interval_ms: u64,
    /// Give up after this long without a session.
    pub max_wait_ms: u64,
    /// Grace period after the first authenticated poll, giving the backend
    /// time to finish persisting credentials before we fetch the session.
    pub settle_ms: u64,
}

impl Default for AuthPollConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_wait_ms: 120_000,
            settle_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthEvent {
    Authorized(Option<User>),
    Failed(String),
}

/// Handle to an in-flight consent watch. Dropping it does not stop the
/// thread; call [`AuthWatch::cancel`] to end the wait early.
pub struct AuthWatch {
    receiver: mpsc::Receiver<AuthEvent>,
    handle: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
}

impl AuthWatch {
    pub fn try_event(&self) -> Option<AuthEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Open the consent URL and start polling for the resulting session.
pub fn begin_auth_flow(
    api: Arc<dyn AssistantApi>,
    opener: &dyn UrlOpener,
    auth_url: &str,
    cfg: AuthPollConfig,
) -> Result<AuthWatch> {
    opener.open(auth_url)?;
    log_debug(&format!("auth flow started, polling every {}ms", cfg.poll_interval_ms));

    let (sender, receiver) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();
    let handle = thread::spawn(move || {
        let event = watch_authorization(api.as_ref(), &cancel_flag, cfg);
        let _ = sender.send(event);
    });

    Ok(AuthWatch {
        receiver,
        handle: Some(handle),
        cancel,
    })
}

fn watch_authorization(
    api: &dyn AssistantApi,
    cancel: &AtomicBool,
    cfg: AuthPollConfig,
) -> AuthEvent {
    let interval = Duration::from_millis(cfg.poll_interval_ms.max(1));
    let mut waited_ms = 0u64;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return AuthEvent::Failed("authorization cancelled".to_string());
        }
        if waited_ms >= cfg.max_wait_ms {
            return AuthEvent::Failed("authorization timed out".to_string());
        }

        match api.auth_status() {
            Ok(status) if status.authenticated => break,
            Ok(_) => {}
            // Expected while consent has not completed; keep polling.
            Err(ApiError::SessionExpired) => {}
            Err(err) => {
                return AuthEvent::Failed(format!("authorization check failed: {err}"));
            }
        }

        thread::sleep(interval);
        waited_ms = waited_ms.saturating_add(cfg.poll_interval_ms);
    }

    // The backend may still be finalizing tokens right after the redirect.
    thread::sleep(Duration::from_millis(cfg.settle_ms));

    match api.session() {
        Ok(session) => AuthEvent::Authorized(session.user),
        Err(err) => AuthEvent::Failed(format!("failed to load session: {err}")),
    }
}
