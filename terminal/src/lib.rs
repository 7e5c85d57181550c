//! Kiosk terminal library: configuration, signal handling and the checkout
//! flow shared by the `kiosk-terminal` binary and its tests.

pub mod config;
pub mod flow;
pub mod shutdown;

pub use config::{ConfigError, TerminalConfig};
pub use flow::{checkout, run_challenge, ChallengeOutcome, CheckoutOutcome, FlowError};
pub use shutdown::ShutdownController;
