//! Nullable verifier: scripted replies, recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use kiosk_client::{CloseVerdict, FrameVerdict, OpenedSession, TransportError, VerifierClient};
use kiosk_types::{Cadence, Frame, Hint, LivenessStatus, SessionId, SubjectId};

use crate::lock;

/// One call the code under test made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifierCall {
    Open(SubjectId),
    Frame { session_id: SessionId, bytes: usize },
    Close(SessionId),
}

struct Step<T> {
    delay: Duration,
    reply: Result<T, TransportError>,
}

#[derive(Default)]
struct Script {
    opens: VecDeque<Step<OpenedSession>>,
    frames: HashMap<String, VecDeque<Step<FrameVerdict>>>,
    closes: HashMap<String, Step<CloseVerdict>>,
    calls: Vec<VerifierCall>,
}

/// A verifier that answers from a script.
///
/// Open replies are consumed in order. Frame replies are scripted per session;
/// once a session's script runs out it keeps answering `IN_PROGRESS`. An
/// unscripted open fails with a network error, an unscripted close is malformed.
#[derive(Default)]
pub struct NullVerifier {
    script: Mutex<Script>,
}

impl NullVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_open(&self, reply: Result<OpenedSession, TransportError>) -> &Self {
        self.script_open_after(Duration::ZERO, reply)
    }

    pub fn script_open_after(
        &self,
        delay: Duration,
        reply: Result<OpenedSession, TransportError>,
    ) -> &Self {
        lock(&self.script).opens.push_back(Step { delay, reply });
        self
    }

    pub fn script_frame(&self, session_id: &str, reply: Result<FrameVerdict, TransportError>) -> &Self {
        self.script_frame_after(session_id, Duration::ZERO, reply)
    }

    pub fn script_frame_after(
        &self,
        session_id: &str,
        delay: Duration,
        reply: Result<FrameVerdict, TransportError>,
    ) -> &Self {
        lock(&self.script)
            .frames
            .entry(session_id.to_string())
            .or_default()
            .push_back(Step { delay, reply });
        self
    }

    pub fn script_close(&self, session_id: &str, reply: Result<CloseVerdict, TransportError>) -> &Self {
        lock(&self.script).closes.insert(
            session_id.to_string(),
            Step {
                delay: Duration::ZERO,
                reply,
            },
        );
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<VerifierCall> {
        lock(&self.script).calls.clone()
    }

    pub fn frames_submitted(&self, session_id: &str) -> usize {
        lock(&self.script)
            .calls
            .iter()
            .filter(|c| matches!(c, VerifierCall::Frame { session_id: s, .. } if s.as_str() == session_id))
            .count()
    }

    pub fn closes(&self) -> usize {
        lock(&self.script)
            .calls
            .iter()
            .filter(|c| matches!(c, VerifierCall::Close(_)))
            .count()
    }

    async fn play<T>(step: Step<T>) -> Result<T, TransportError> {
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.reply
    }
}

#[async_trait]
impl VerifierClient for NullVerifier {
    async fn open_session(&self, subject: &SubjectId) -> Result<OpenedSession, TransportError> {
        let step = {
            let mut script = lock(&self.script);
            script.calls.push(VerifierCall::Open(subject.clone()));
            script.opens.pop_front()
        };
        match step {
            Some(step) => Self::play(step).await,
            None => Err(TransportError::Network("no scripted open reply".into())),
        }
    }

    async fn submit_frame(
        &self,
        session_id: &SessionId,
        frame: Frame,
    ) -> Result<FrameVerdict, TransportError> {
        let step = {
            let mut script = lock(&self.script);
            script.calls.push(VerifierCall::Frame {
                session_id: session_id.clone(),
                bytes: frame.len(),
            });
            script
                .frames
                .get_mut(session_id.as_str())
                .and_then(VecDeque::pop_front)
        };
        match step {
            Some(step) => Self::play(step).await,
            None => Ok(verdict(LivenessStatus::InProgress, "hold still")),
        }
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<CloseVerdict, TransportError> {
        let step = {
            let mut script = lock(&self.script);
            script.calls.push(VerifierCall::Close(session_id.clone()));
            script.closes.remove(session_id.as_str())
        };
        match step {
            Some(step) => Self::play(step).await,
            None => Err(TransportError::Malformed("no scripted close reply".into())),
        }
    }
}

/// Open reply for session `session_id` driven every `cadence_ms`.
///
/// Panics on an empty id or zero cadence; test input only.
pub fn opened(session_id: &str, cadence_ms: u64, instructions: &[&str]) -> OpenedSession {
    OpenedSession {
        session_id: SessionId::new(session_id).expect("scripted session id"),
        cadence: Cadence::from_millis(cadence_ms).expect("scripted cadence"),
        instructions: instructions.iter().map(|t| Hint::new(*t)).collect(),
    }
}

pub fn verdict(status: LivenessStatus, hint: &str) -> FrameVerdict {
    FrameVerdict {
        status,
        hint: Hint::new(hint),
    }
}
