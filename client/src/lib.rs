//! Transport wrappers for the kiosk terminal.
//!
//! Every remote collaborator is reached through one [`ApiClient`] that owns the
//! base URL, the shared terminal credential and the response-envelope rules:
//! - [`VerifierClient`]: open a liveness session, submit frames, close it.
//! - [`PaymentAuthority`]: submit a payment with or without a liveness token.
//! - [`EmployeeDirectory`]: read the cashier view of a card holder.
//!
//! None of these keep state between calls and none of them retry.

pub mod api;
pub mod directory;
pub mod error;
pub mod payment;
pub mod verifier;

pub use api::{ApiClient, ApiConfig, TERMINAL_TOKEN_HEADER};
pub use directory::{EmployeeDirectory, EmployeeInfo};
pub use error::TransportError;
pub use payment::{
    ApprovedPayment, HttpPaymentAuthority, PaymentAuthority, PaymentRequest, PaymentVerdict,
};
pub use verifier::{CloseVerdict, FrameVerdict, HttpVerifier, OpenedSession, VerifierClient};
