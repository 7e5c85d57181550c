//! Liveness challenge session for the kiosk terminal.
//!
//! A payment is only authorized with a one-time token, and the token only
//! exists after a live face challenge passes:
//! 1. **Open**: the verifier issues a session identity and a frame cadence.
//! 2. **Capture**: every cadence interval one frame is submitted; each reply
//!    carries a status and a hint. Capture stops on the first status that is
//!    not `IN_PROGRESS`, or on the first failed request.
//! 3. **Finish**: the final verdict is fetched; `PASSED` yields the token.
//!
//! [`LivenessSession`] holds the state and enforces the transitions.
//! [`SessionDriver`] runs the cadence timer and the requests on a single task.

pub mod driver;
pub mod error;
pub mod frames;
pub mod session;

pub use driver::{DriverHandle, SessionDriver, SessionStarted};
pub use error::LivenessError;
pub use frames::DirectoryFrameSource;
pub use session::{FinishOutcome, LivenessSession, SessionPhase, SessionSnapshot, TickOutcome};
