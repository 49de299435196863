pub mod api;
pub mod app;
pub mod audio;
pub mod auth;
pub mod config;
pub mod history;
pub mod session;
mod telemetry;
pub mod voice;

pub use app::logging::{init_logging, log_debug, log_panic};
pub use telemetry::init_tracing;
pub use voice::{VoiceJob, VoiceJobMessage};
