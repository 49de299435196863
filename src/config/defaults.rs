//! Default values for CLI flags, kept in one place so validation, help text,
//! and tests agree.

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

pub const DEFAULT_AMPLITUDE_THRESHOLD: f32 = 0.01;
pub const DEFAULT_SILENCE_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_MAX_CAPTURE_MS: u64 = 120_000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_AUTH_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_AUTH_MAX_WAIT_MS: u64 = 120_000;
pub const DEFAULT_AUTH_SETTLE_MS: u64 = 1_500;

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

pub const MAX_CAPTURE_HARD_LIMIT_MS: u64 = 600_000;
