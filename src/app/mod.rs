//! Application state and logging.

pub mod logging;
pub mod state;
