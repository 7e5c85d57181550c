//! The one-time liveness credential.

use std::fmt;

use crate::{SessionId, SubjectId};

/// Opaque credential issued when a session closes with `PASSED`.
///
/// Remembers which session and subject it was issued for so it can never be
/// presented as if it came from a different challenge. The value itself is not
/// interpreted here; the payment authority decides whether it is still valid.
#[derive(Clone, PartialEq, Eq)]
pub struct LivenessToken {
    session_id: SessionId,
    subject: SubjectId,
    value: String,
}

impl LivenessToken {
    pub fn new(session_id: SessionId, subject: SubjectId, value: impl Into<String>) -> Self {
        Self {
            session_id,
            subject,
            value: value.into(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// The raw credential, for the payment request body only.
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for LivenessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessToken")
            .field("session_id", &self.session_id)
            .field("subject", &self.subject)
            .field("value", &"<redacted>")
            .finish()
    }
}
