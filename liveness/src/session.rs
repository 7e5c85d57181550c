//! The liveness session state machine.
//!
//! ```text
//! Idle ──start──▶ Starting ──opened──▶ Running ──verdict──▶ Passed | Failed | TimedOut
//!   ▲                │                    │
//!   └──open failed───┘                    └──request failed──▶ Error
//! ```
//!
//! Terminal phases are only left by a fresh start, which discards everything the
//! previous session held. No I/O happens here: the driver performs the requests
//! and feeds each result back together with the session identity it was issued
//! for, and results for any other identity are discarded.

use kiosk_client::{CloseVerdict, FrameVerdict, OpenedSession, TransportError};
use kiosk_types::{
    Cadence, CloseResult, Hint, LivenessStatus, LivenessToken, SessionId, SubjectId,
};
use serde::Serialize;
use std::fmt;

use crate::LivenessError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Passed,
    Failed,
    TimedOut,
    Error,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Passed | Self::Failed | Self::TimedOut | Self::Error
        )
    }

    /// Whether capture is underway or about to be.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    fn from_status(status: LivenessStatus) -> Self {
        match status {
            LivenessStatus::InProgress => Self::Running,
            LivenessStatus::Passed => Self::Passed,
            LivenessStatus::Failed => Self::Failed,
            LivenessStatus::TimedOut => Self::TimedOut,
            LivenessStatus::Error => Self::Error,
        }
    }

    fn from_close(result: CloseResult) -> Self {
        match result {
            CloseResult::Passed => Self::Passed,
            CloseResult::Failed => Self::Failed,
            CloseResult::TimedOut => Self::TimedOut,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a frame reply did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still `IN_PROGRESS`; keep capturing.
    Continue,
    /// Capture must stop; the session is now in this terminal phase.
    Stopped(SessionPhase),
    /// The reply belonged to a session that is no longer active and was ignored.
    Stale,
}

/// Result of a completed finish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishOutcome {
    Passed(LivenessToken),
    NotPassed {
        result: CloseResult,
        reason_code: Option<String>,
        reason: String,
    },
}

impl FinishOutcome {
    pub fn token(&self) -> Option<&LivenessToken> {
        match self {
            Self::Passed(token) => Some(token),
            Self::NotPassed { .. } => None,
        }
    }
}

/// Read-only view of a session, published to the UI after every change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub session_id: Option<SessionId>,
    pub subject: Option<SubjectId>,
    pub cadence_ms: Option<u64>,
    pub hint: Option<Hint>,
    pub instructions: Vec<Hint>,
    pub last_status: Option<LivenessStatus>,
    pub reason: Option<String>,
    pub reason_code: Option<String>,
    pub frames_submitted: u64,
    pub finished: bool,
    pub has_token: bool,
}

/// One terminal's liveness challenge.
///
/// Owns the session identity, cadence, latest hint, terminal reason and the
/// token. A token is only ever stored while the phase is `Passed`.
#[derive(Debug, Default)]
pub struct LivenessSession {
    phase: SessionPhase,
    subject: Option<SubjectId>,
    session_id: Option<SessionId>,
    cadence: Option<Cadence>,
    instructions: Vec<Hint>,
    hint: Option<Hint>,
    last_status: Option<LivenessStatus>,
    reason: Option<String>,
    reason_code: Option<String>,
    token: Option<LivenessToken>,
    frames_submitted: u64,
    finished: bool,
}

impl LivenessSession {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn subject(&self) -> Option<&SubjectId> {
        self.subject.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn cadence(&self) -> Option<Cadence> {
        self.cadence
    }

    pub fn hint(&self) -> Option<&Hint> {
        self.hint.as_ref()
    }

    pub fn instructions(&self) -> &[Hint] {
        &self.instructions
    }

    pub fn last_status(&self) -> Option<LivenessStatus> {
        self.last_status
    }

    /// Human-readable reason for the current terminal phase.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn reason_code(&self) -> Option<&str> {
        self.reason_code.as_deref()
    }

    pub fn token(&self) -> Option<&LivenessToken> {
        self.token.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            session_id: self.session_id.clone(),
            subject: self.subject.clone(),
            cadence_ms: self.cadence.map(|c| c.as_millis()),
            hint: self.hint.clone(),
            instructions: self.instructions.clone(),
            last_status: self.last_status,
            reason: self.reason.clone(),
            reason_code: self.reason_code.clone(),
            frames_submitted: self.frames_submitted,
            finished: self.finished,
            has_token: self.token.is_some(),
        }
    }

    // ── Start ──────────────────────────────────────────────────────────

    /// Enter `Starting` for `subject`, discarding all prior session data.
    ///
    /// A running session is cancelled first and its identity returned, so the
    /// caller can stop that session's timer before anything else happens.
    pub fn begin_start(&mut self, subject: SubjectId) -> Result<Option<SessionId>, LivenessError> {
        if self.phase == SessionPhase::Starting {
            return Err(LivenessError::StartInProgress);
        }

        let cancelled = match self.phase {
            SessionPhase::Running => self.session_id.clone(),
            _ => None,
        };
        if let Some(id) = &cancelled {
            tracing::info!(session_id = %id, "cancelling running liveness session for a new start");
        }

        *self = Self {
            phase: SessionPhase::Starting,
            subject: Some(subject),
            ..Self::default()
        };
        Ok(cancelled)
    }

    /// Record the verifier's open reply and enter `Running`.
    pub fn on_opened(&mut self, opened: OpenedSession) -> Result<(), LivenessError> {
        if self.phase != SessionPhase::Starting {
            return Err(LivenessError::NotStarting);
        }

        tracing::info!(
            session_id = %opened.session_id,
            cadence = %opened.cadence,
            instructions = opened.instructions.len(),
            "liveness session running"
        );
        self.hint = opened.instructions.first().cloned();
        self.session_id = Some(opened.session_id);
        self.cadence = Some(opened.cadence);
        self.instructions = opened.instructions;
        self.phase = SessionPhase::Running;
        Ok(())
    }

    /// The open request failed: back to `Idle` with nothing retained.
    pub fn on_open_failed(&mut self, error: &TransportError) {
        if self.phase != SessionPhase::Starting {
            return;
        }
        tracing::warn!(
            subject = ?self.subject.as_ref().map(SubjectId::as_str),
            %error,
            "liveness session could not be opened"
        );
        *self = Self::default();
    }

    /// Abandon a starting or running session and return to `Idle`.
    ///
    /// Returns the identity of the abandoned session, if it had one yet.
    pub fn cancel(&mut self) -> Result<Option<SessionId>, LivenessError> {
        if !self.phase.is_active() {
            return Err(LivenessError::NotRunning);
        }
        let cancelled = self.session_id.take();
        tracing::info!(session_id = ?cancelled.as_ref().map(SessionId::as_str), "liveness session cancelled");
        *self = Self::default();
        Ok(cancelled)
    }

    // ── Capture ────────────────────────────────────────────────────────

    /// The session a frame should be submitted for, if capture is underway.
    pub fn frame_target(&self) -> Option<&SessionId> {
        match self.phase {
            SessionPhase::Running => self.session_id.as_ref(),
            _ => None,
        }
    }

    /// Apply the result of one frame submission issued for `session_id`.
    ///
    /// A failed request stops capture with `Error` whatever earlier ticks
    /// reported. A reply for any session other than the running one is stale.
    pub fn apply_frame_result(
        &mut self,
        session_id: &SessionId,
        result: Result<FrameVerdict, TransportError>,
    ) -> TickOutcome {
        if self.phase != SessionPhase::Running || self.session_id.as_ref() != Some(session_id) {
            tracing::warn!(
                session_id = %session_id,
                active = ?self.session_id.as_ref().map(SessionId::as_str),
                phase = %self.phase,
                "discarding frame result for inactive session"
            );
            return TickOutcome::Stale;
        }

        match result {
            Err(error) => {
                tracing::warn!(session_id = %session_id, %error, "frame submission failed; capture stopped");
                self.phase = SessionPhase::Error;
                self.reason_code = error.remote_code().map(str::to_string);
                self.reason = Some(format!("frame submission failed: {error}"));
                TickOutcome::Stopped(SessionPhase::Error)
            }
            Ok(verdict) => {
                self.frames_submitted += 1;
                self.last_status = Some(verdict.status);
                tracing::debug!(
                    session_id = %session_id,
                    status = %verdict.status,
                    hint = %verdict.hint,
                    frame = self.frames_submitted,
                    "frame verdict"
                );
                self.hint = Some(verdict.hint);

                if !verdict.status.is_terminal() {
                    return TickOutcome::Continue;
                }
                let phase = SessionPhase::from_status(verdict.status);
                tracing::info!(session_id = %session_id, status = %verdict.status, "liveness capture finished");
                self.phase = phase;
                self.reason = Some(format!("verifier reported {}", verdict.status));
                TickOutcome::Stopped(phase)
            }
        }
    }

    // ── Finish ─────────────────────────────────────────────────────────

    /// Claim the single finish of a stopped session and return its identity.
    pub fn begin_finish(&mut self) -> Result<SessionId, LivenessError> {
        let session_id = match (&self.phase, &self.session_id) {
            (SessionPhase::Idle | SessionPhase::Starting, _) | (_, None) => {
                return Err(LivenessError::NoSession)
            }
            (SessionPhase::Running, Some(id)) => {
                return Err(LivenessError::FinishWhileRunning(id.clone()))
            }
            (_, Some(id)) => id.clone(),
        };
        if self.finished {
            return Err(LivenessError::AlreadyFinished(session_id));
        }
        self.finished = true;
        Ok(session_id)
    }

    /// Apply the close verdict for `session_id`.
    ///
    /// The token is kept only when both the last observed status and the close
    /// result are `PASSED`. A failed close request moves the session to `Error`.
    pub fn apply_close_result(
        &mut self,
        session_id: &SessionId,
        result: Result<CloseVerdict, TransportError>,
    ) -> Result<FinishOutcome, LivenessError> {
        if !self.phase.is_terminal() || self.session_id.as_ref() != Some(session_id) {
            return Err(LivenessError::StaleSession {
                received: session_id.clone(),
            });
        }
        let subject = self.subject.clone().ok_or(LivenessError::NoSession)?;

        let verdict = match result {
            Ok(verdict) => verdict,
            Err(error) => {
                tracing::warn!(session_id = %session_id, %error, "closing liveness session failed");
                self.phase = SessionPhase::Error;
                self.reason_code = error.remote_code().map(str::to_string);
                self.reason = Some(format!("closing session failed: {error}"));
                return Err(error.into());
            }
        };

        match verdict {
            CloseVerdict::Passed { token } if self.phase == SessionPhase::Passed => {
                tracing::info!(session_id = %session_id, "liveness passed; token issued");
                let token = LivenessToken::new(session_id.clone(), subject, token);
                self.token = Some(token.clone());
                Ok(FinishOutcome::Passed(token))
            }
            CloseVerdict::Passed { .. } => {
                tracing::warn!(
                    session_id = %session_id,
                    observed = %self.phase,
                    "close verdict PASSED contradicts observed status; token withheld"
                );
                let reason = format!("close verdict PASSED contradicts observed {}", self.phase);
                self.reason = Some(reason.clone());
                Ok(FinishOutcome::NotPassed {
                    result: CloseResult::Passed,
                    reason_code: None,
                    reason,
                })
            }
            other => {
                let result = other.result();
                let reason_code = other.reason_code().map(str::to_string);
                if self.phase == SessionPhase::Passed {
                    self.phase = SessionPhase::from_close(result);
                }
                let reason = match &reason_code {
                    Some(code) => format!("liveness {result}: {code}"),
                    None => format!("liveness {result}"),
                };
                tracing::info!(
                    session_id = %session_id,
                    %result,
                    reason_code = ?reason_code,
                    "liveness not passed"
                );
                self.reason = Some(reason.clone());
                self.reason_code = reason_code.clone();
                Ok(FinishOutcome::NotPassed {
                    result,
                    reason_code,
                    reason,
                })
            }
        }
    }

    /// Hand the token over for a payment. Single use: later calls return `None`.
    pub fn take_token(&mut self) -> Option<LivenessToken> {
        self.token.take()
    }
}
