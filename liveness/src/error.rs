use kiosk_client::TransportError;
use kiosk_types::SessionId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LivenessError {
    #[error("no liveness session has been started")]
    NoSession,

    #[error("a liveness session is already starting")]
    StartInProgress,

    #[error("no liveness session is waiting for its open reply")]
    NotStarting,

    #[error("liveness session {0} is still running; finish is only valid after capture stops")]
    FinishWhileRunning(SessionId),

    #[error("liveness session {0} was already finished")]
    AlreadyFinished(SessionId),

    #[error("no liveness session is running")]
    NotRunning,

    #[error("liveness session start was cancelled before the verifier answered")]
    StartCancelled,

    #[error("result for session {received} does not belong to the active session")]
    StaleSession { received: SessionId },

    #[error("verifier request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("liveness session driver has shut down")]
    DriverClosed,
}

impl LivenessError {
    /// Whether the caller invoked an operation the current state does not allow.
    ///
    /// Misuse never changes session state.
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            Self::NoSession
                | Self::StartInProgress
                | Self::NotStarting
                | Self::FinishWhileRunning(_)
                | Self::AlreadyFinished(_)
                | Self::NotRunning
                | Self::StaleSession { .. }
        )
    }
}
