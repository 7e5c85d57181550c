//! Shared utilities for the kiosk terminal.

pub mod logging;
pub mod money;

pub use logging::{init_logging, LogFormat};
pub use money::format_cents;
