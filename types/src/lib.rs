//! Fundamental types for the kiosk terminal.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! subject and session identifiers, frame cadence, liveness status literals, the
//! one-time liveness token, payment amounts, and captured frames.

pub mod amount;
pub mod cadence;
pub mod error;
pub mod frame;
pub mod ids;
pub mod status;
pub mod token;

pub use amount::AmountCents;
pub use cadence::Cadence;
pub use error::TypesError;
pub use frame::{Frame, FrameSource};
pub use ids::{SessionId, SubjectId};
pub use status::{CloseResult, Hint, LivenessStatus};
pub use token::LivenessToken;
