//! Validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("subject identifier must not be empty")]
    EmptySubject,

    #[error("session identifier must not be empty")]
    EmptySessionId,

    #[error("frame cadence must be a positive number of milliseconds")]
    ZeroCadence,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("invalid amount {0:?}: expected a decimal with at most two fraction digits")]
    InvalidAmount(String),
}
