//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::Parser;
use std::time::Duration;

pub use defaults::{
    DEFAULT_AMPLITUDE_THRESHOLD, DEFAULT_AUTH_MAX_WAIT_MS, DEFAULT_AUTH_POLL_INTERVAL_MS,
    DEFAULT_AUTH_SETTLE_MS, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HTTP_TIMEOUT_MS,
    DEFAULT_MAX_CAPTURE_MS, DEFAULT_SERVER_URL, DEFAULT_SILENCE_TIMEOUT_MS,
};
use defaults::MAX_CAPTURE_HARD_LIMIT_MS;

use crate::audio::CaptureConfig;
use crate::auth::AuthPollConfig;

/// CLI options for the chatterm TUI.
#[derive(Debug, Parser, Clone)]
#[command(about = "Terminal chat client with voice calls", author, version)]
pub struct AppConfig {
    /// Base URL of the assistant backend
    #[arg(
        long = "server-url",
        env = "CHATTERM_SERVER_URL",
        default_value = DEFAULT_SERVER_URL
    )]
    pub server_url: String,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Normalized RMS level above which a frame counts as speech
    #[arg(long = "amplitude-threshold", default_value_t = DEFAULT_AMPLITUDE_THRESHOLD)]
    pub amplitude_threshold: f32,

    /// Trailing silence required before a recording stops (milliseconds)
    #[arg(long = "silence-timeout-ms", default_value_t = DEFAULT_SILENCE_TIMEOUT_MS)]
    pub silence_timeout_ms: u64,

    /// Maximum capture duration before a hard stop (milliseconds)
    #[arg(long = "max-capture-ms", default_value_t = DEFAULT_MAX_CAPTURE_MS)]
    pub max_capture_ms: u64,

    /// Frame channel capacity between the audio callback and the worker
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// How often to poll for consent completion (milliseconds)
    #[arg(long = "auth-poll-interval-ms", default_value_t = DEFAULT_AUTH_POLL_INTERVAL_MS)]
    pub auth_poll_interval_ms: u64,

    /// Give up on a consent flow after this long (milliseconds)
    #[arg(long = "auth-max-wait-ms", default_value_t = DEFAULT_AUTH_MAX_WAIT_MS)]
    pub auth_max_wait_ms: u64,

    /// Grace period after consent before fetching the session (milliseconds)
    #[arg(long = "auth-settle-ms", default_value_t = DEFAULT_AUTH_SETTLE_MS)]
    pub auth_settle_ms: u64,

    /// HTTP request timeout (milliseconds)
    #[arg(long = "http-timeout-ms", default_value_t = DEFAULT_HTTP_TIMEOUT_MS)]
    pub http_timeout_ms: u64,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "CHATTERM_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "CHATTERM_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging message/transcript snippets (debug log only)
    #[arg(
        long = "log-content",
        env = "CHATTERM_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}

impl AppConfig {
    /// Snapshot the CLI-controlled capture settings for the voice pipeline.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            amplitude_threshold: self.amplitude_threshold,
            silence_timeout_ms: self.silence_timeout_ms,
            max_capture_ms: self.max_capture_ms.min(MAX_CAPTURE_HARD_LIMIT_MS),
            channel_capacity: self.channel_capacity,
        }
    }

    pub fn auth_poll_config(&self) -> AuthPollConfig {
        AuthPollConfig {
            poll_interval_ms: self.auth_poll_interval_ms,
            max_wait_ms: self.auth_max_wait_ms,
            settle_ms: self.auth_settle_ms,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
