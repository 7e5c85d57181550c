//! Liveness status literals and instruction hints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict carried by every frame reply.
///
/// Moves from `InProgress` to exactly one terminal value. The verifier's older
/// `EXPIRED` literal is read as `TimedOut`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LivenessStatus {
    InProgress,
    Passed,
    Failed,
    #[serde(alias = "EXPIRED")]
    TimedOut,
    Error,
}

impl LivenessStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict returned when a session is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseResult {
    Passed,
    Failed,
    #[serde(alias = "EXPIRED")]
    TimedOut,
}

impl CloseResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
        }
    }
}

impl fmt::Display for CloseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short instruction shown to the person in front of the camera ("turn your head left").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hint(String);

impl Hint {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_literals_parse() {
        let s: LivenessStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(s, LivenessStatus::InProgress);
        let s: LivenessStatus = serde_json::from_str("\"TIMED_OUT\"").unwrap();
        assert_eq!(s, LivenessStatus::TimedOut);
        let s: LivenessStatus = serde_json::from_str("\"EXPIRED\"").unwrap();
        assert_eq!(s, LivenessStatus::TimedOut);
    }

    #[test]
    fn unknown_status_literal_rejected() {
        assert!(serde_json::from_str::<LivenessStatus>("\"PENDING\"").is_err());
        assert!(serde_json::from_str::<CloseResult>("\"IN_PROGRESS\"").is_err());
    }

    #[test]
    fn only_in_progress_is_non_terminal() {
        assert!(!LivenessStatus::InProgress.is_terminal());
        assert!(LivenessStatus::Passed.is_terminal());
        assert!(LivenessStatus::Error.is_terminal());
    }
}
