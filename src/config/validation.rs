use super::defaults::MAX_CAPTURE_HARD_LIMIT_MS;
use super::AppConfig;
use anyhow::{bail, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the server URL.
    pub fn validate(&mut self) -> Result<()> {
        let trimmed = self.server_url.trim();
        if trimmed.is_empty() {
            bail!("--server-url cannot be empty");
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            bail!("--server-url must start with http:// or https://, got '{trimmed}'");
        }
        self.server_url = trimmed.trim_end_matches('/').to_string();

        if !(self.amplitude_threshold > 0.0 && self.amplitude_threshold < 1.0) {
            bail!(
                "--amplitude-threshold must be between 0.0 and 1.0 (exclusive), got {}",
                self.amplitude_threshold
            );
        }
        if self.max_capture_ms == 0 || self.max_capture_ms > MAX_CAPTURE_HARD_LIMIT_MS {
            bail!(
                "--max-capture-ms must be between 1 and {MAX_CAPTURE_HARD_LIMIT_MS} ms, got {}",
                self.max_capture_ms
            );
        }
        if self.silence_timeout_ms < 100 || self.silence_timeout_ms > self.max_capture_ms {
            bail!(
                "--silence-timeout-ms must be >=100 and <= --max-capture-ms ({})",
                self.max_capture_ms
            );
        }
        if !(8..=1024).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between 8 and 1024, got {}",
                self.channel_capacity
            );
        }
        if !(100..=10_000).contains(&self.auth_poll_interval_ms) {
            bail!(
                "--auth-poll-interval-ms must be between 100 and 10000, got {}",
                self.auth_poll_interval_ms
            );
        }
        if self.auth_max_wait_ms < self.auth_poll_interval_ms || self.auth_max_wait_ms > 600_000 {
            bail!(
                "--auth-max-wait-ms must be between {} and 600000",
                self.auth_poll_interval_ms
            );
        }
        if self.auth_settle_ms > 30_000 {
            bail!(
                "--auth-settle-ms must be at most 30000, got {}",
                self.auth_settle_ms
            );
        }
        if !(1_000..=300_000).contains(&self.http_timeout_ms) {
            bail!(
                "--http-timeout-ms must be between 1000 and 300000, got {}",
                self.http_timeout_ms
            );
        }

        Ok(())
    }
}
