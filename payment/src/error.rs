use kiosk_client::TransportError;
use kiosk_types::SubjectId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// No verdict was obtained from the payment authority.
    #[error("payment authority unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("liveness token was issued for {token_subject}, not {subject}")]
    TokenSubjectMismatch {
        subject: SubjectId,
        token_subject: SubjectId,
    },
}
