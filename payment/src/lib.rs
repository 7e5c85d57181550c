//! Payment authorization for the kiosk terminal.
//!
//! The terminal never decides whether a payment may proceed. [`PaymentGate`]
//! attaches the liveness token (or an explicit "no token") to the request and
//! relays whatever the payment authority answers.

pub mod error;
pub mod gate;

pub use error::GateError;
pub use gate::PaymentGate;
