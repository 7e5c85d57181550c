//! Liveness verifier transport.
//!
//! Three exchanges, each one request and one response, no retries, no
//! buffering. Any reply that is missing a required field or carries an
//! unknown status literal is reported as [`TransportError::Malformed`].

use async_trait::async_trait;
use kiosk_types::{Cadence, CloseResult, Frame, Hint, LivenessStatus, SessionId, SubjectId};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::{ApiClient, TransportError};

/// Reply to a successful open: the new session and how it must be driven.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedSession {
    pub session_id: SessionId,
    pub cadence: Cadence,
    /// Instruction texts in challenge order. The first one is the initial hint.
    pub instructions: Vec<Hint>,
}

/// Incremental verdict returned for one submitted frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameVerdict {
    pub status: LivenessStatus,
    pub hint: Hint,
}

/// Final verdict returned by close. Only `Passed` carries a token.
#[derive(Clone, PartialEq, Eq)]
pub enum CloseVerdict {
    Passed { token: String },
    Failed { reason_code: Option<String> },
    TimedOut { reason_code: Option<String> },
}

impl CloseVerdict {
    pub fn result(&self) -> CloseResult {
        match self {
            Self::Passed { .. } => CloseResult::Passed,
            Self::Failed { .. } => CloseResult::Failed,
            Self::TimedOut { .. } => CloseResult::TimedOut,
        }
    }

    pub fn reason_code(&self) -> Option<&str> {
        match self {
            Self::Passed { .. } => None,
            Self::Failed { reason_code } | Self::TimedOut { reason_code } => {
                reason_code.as_deref()
            }
        }
    }
}

impl std::fmt::Debug for CloseVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed { .. } => f.write_str("Passed { token: <redacted> }"),
            Self::Failed { reason_code } => {
                f.debug_struct("Failed").field("reason_code", reason_code).finish()
            }
            Self::TimedOut { reason_code } => {
                f.debug_struct("TimedOut").field("reason_code", reason_code).finish()
            }
        }
    }
}

/// The remote liveness verifier.
///
/// Stateless: session identity is passed in on every call and owned by the caller.
#[async_trait]
pub trait VerifierClient: Send + Sync {
    async fn open_session(&self, subject: &SubjectId) -> Result<OpenedSession, TransportError>;

    async fn submit_frame(
        &self,
        session_id: &SessionId,
        frame: Frame,
    ) -> Result<FrameVerdict, TransportError>;

    async fn close_session(&self, session_id: &SessionId) -> Result<CloseVerdict, TransportError>;
}

// ── Wire format ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OpenRequest<'a> {
    card_uid: &'a str,
}

#[derive(Deserialize)]
struct OpenResponse {
    session_id: SessionId,
    frame_interval_ms: Cadence,
    commands: Vec<WireCommand>,
}

#[derive(Deserialize)]
struct WireCommand {
    text: String,
}

#[derive(Deserialize)]
struct FrameResponse {
    status: LivenessStatus,
    hint: Hint,
}

#[derive(Serialize)]
struct CloseRequest<'a> {
    session_id: &'a str,
}

#[derive(Deserialize)]
struct CloseResponse {
    #[serde(alias = "status")]
    result: CloseResult,
    #[serde(default)]
    liveness_token: Option<String>,
    #[serde(default, alias = "error_code")]
    reason_code: Option<String>,
}

impl From<OpenResponse> for OpenedSession {
    fn from(r: OpenResponse) -> Self {
        Self {
            session_id: r.session_id,
            cadence: r.frame_interval_ms,
            instructions: r.commands.into_iter().map(|c| Hint::new(c.text)).collect(),
        }
    }
}

impl TryFrom<CloseResponse> for CloseVerdict {
    type Error = TransportError;

    fn try_from(r: CloseResponse) -> Result<Self, Self::Error> {
        match r.result {
            CloseResult::Passed => match r.liveness_token {
                Some(token) if !token.is_empty() => Ok(Self::Passed { token }),
                _ => Err(TransportError::Malformed(
                    "PASSED close result without a liveness token".into(),
                )),
            },
            CloseResult::Failed => Ok(Self::Failed {
                reason_code: r.reason_code,
            }),
            CloseResult::TimedOut => Ok(Self::TimedOut {
                reason_code: r.reason_code,
            }),
        }
    }
}

// ── HTTP implementation ────────────────────────────────────────────────

/// [`VerifierClient`] over the kiosk backend's liveness endpoints.
#[derive(Clone)]
pub struct HttpVerifier {
    api: ApiClient,
}

impl HttpVerifier {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl VerifierClient for HttpVerifier {
    async fn open_session(&self, subject: &SubjectId) -> Result<OpenedSession, TransportError> {
        tracing::debug!(subject = %subject, "opening liveness session");
        let reply: OpenResponse = self
            .api
            .post_json(
                "/api/start_liveness",
                &OpenRequest {
                    card_uid: subject.as_str(),
                },
            )
            .await?;
        Ok(reply.into())
    }

    async fn submit_frame(
        &self,
        session_id: &SessionId,
        frame: Frame,
    ) -> Result<FrameVerdict, TransportError> {
        tracing::trace!(session_id = %session_id, bytes = frame.len(), "submitting frame");
        let image = Part::bytes(frame.into_bytes())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .text("session_id", session_id.to_string())
            .part("image", image);

        let reply: FrameResponse = self
            .api
            .post_multipart("/api/liveness_frame", form)
            .await?;
        Ok(FrameVerdict {
            status: reply.status,
            hint: reply.hint,
        })
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<CloseVerdict, TransportError> {
        tracing::debug!(session_id = %session_id, "closing liveness session");
        let reply: CloseResponse = self
            .api
            .post_json(
                "/api/finish_liveness",
                &CloseRequest {
                    session_id: session_id.as_str(),
                },
            )
            .await?;
        reply.try_into()
    }
}
