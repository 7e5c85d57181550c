//! Cooperative capture loop.
//!
//! One task owns the [`LivenessSession`], the frame source and the verifier
//! client. It multiplexes three event sources with a biased `select!`:
//!
//! 1. commands from [`DriverHandle`]s (start, cancel, finish, ...),
//! 2. the verifier's reply to a pending open,
//! 3. completion of the one frame submission in flight,
//! 4. the cadence timer, polled only while nothing is in flight.
//!
//! A pending open does not hold up the command queue, so a cancel is served
//! at once and the open request is dropped.
//!
//! A submission keeps running when its session is cancelled or replaced. Its
//! result is then fed back with the old session identity and discarded, and the
//! new session's first tick waits until it has drained.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kiosk_client::{FrameVerdict, OpenedSession, TransportError, VerifierClient};
use kiosk_types::{Cadence, FrameSource, Hint, LivenessToken, SessionId, SubjectId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::session::{FinishOutcome, LivenessSession, SessionSnapshot, TickOutcome};
use crate::LivenessError;

const COMMAND_QUEUE: usize = 16;

type Submission =
    Pin<Box<dyn Future<Output = (SessionId, Result<FrameVerdict, TransportError>)> + Send>>;

type StartReply = oneshot::Sender<Result<SessionStarted, LivenessError>>;

/// An open request waiting for the verifier, with the caller to answer.
struct PendingStart {
    request: Pin<Box<dyn Future<Output = Result<OpenedSession, TransportError>> + Send>>,
    cancelled: Option<SessionId>,
    reply: StartReply,
}

/// What a successful start reports back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStarted {
    pub session_id: SessionId,
    pub cadence: Cadence,
    pub instructions: Vec<Hint>,
    /// The running session this start replaced, if any.
    pub cancelled: Option<SessionId>,
}

enum Command {
    Start {
        subject: SubjectId,
        reply: StartReply,
    },
    Cancel {
        reply: oneshot::Sender<Result<Option<SessionId>, LivenessError>>,
    },
    Finish {
        reply: oneshot::Sender<Result<FinishOutcome, LivenessError>>,
    },
    TakeToken {
        reply: oneshot::Sender<Option<LivenessToken>>,
    },
    Shutdown,
}

pub struct SessionDriver<V, F> {
    session: LivenessSession,
    verifier: Arc<V>,
    frames: F,
    commands: mpsc::Receiver<Command>,
    updates: watch::Sender<SessionSnapshot>,
    ticker: Option<Interval>,
    starting: Option<PendingStart>,
    in_flight: Option<Submission>,
}

impl<V, F> SessionDriver<V, F>
where
    V: VerifierClient + 'static,
    F: FrameSource + 'static,
{
    pub fn new(verifier: Arc<V>, frames: F) -> (Self, DriverHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (update_tx, update_rx) = watch::channel(SessionSnapshot::default());
        let driver = Self {
            session: LivenessSession::new(),
            verifier,
            frames,
            commands: command_rx,
            updates: update_tx,
            ticker: None,
            starting: None,
            in_flight: None,
        };
        let handle = DriverHandle {
            commands: command_tx,
            updates: update_rx,
        };
        (driver, handle)
    }

    /// Build a driver and run it on a new task.
    pub fn spawn(verifier: Arc<V>, frames: F) -> (DriverHandle, JoinHandle<()>) {
        let (driver, handle) = Self::new(verifier, frames);
        (handle, tokio::spawn(driver.run()))
    }

    /// Run until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!("liveness driver started");
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                opened = next_open(&mut self.starting), if self.starting.is_some() => {
                    self.on_open_result(opened);
                }
                (session_id, result) = next_submission(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    self.on_frame_result(session_id, result);
                }
                _ = next_tick(&mut self.ticker), if self.in_flight.is_none() && self.ticker.is_some() => {
                    self.on_tick();
                }
            }
        }

        if self.session.phase().is_active() {
            let _ = self.session.cancel();
            self.publish();
        }
        tracing::debug!("liveness driver stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start { subject, reply } => self.start(subject, reply),
            Command::Cancel { reply } => {
                let result = self.session.cancel();
                if result.is_ok() {
                    self.ticker = None;
                    if let Some(pending) = self.starting.take() {
                        let _ = pending.reply.send(Err(LivenessError::StartCancelled));
                    }
                    self.publish();
                }
                let _ = reply.send(result);
            }
            Command::Finish { reply } => {
                let result = self.finish().await;
                let _ = reply.send(result);
            }
            Command::TakeToken { reply } => {
                let token = self.session.take_token();
                if token.is_some() {
                    self.publish();
                }
                let _ = reply.send(token);
            }
            Command::Shutdown => {}
        }
    }

    fn start(&mut self, subject: SubjectId, reply: StartReply) {
        let cancelled = match self.session.begin_start(subject.clone()) {
            Ok(cancelled) => cancelled,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };
        self.ticker = None;
        self.publish();

        let verifier = Arc::clone(&self.verifier);
        self.starting = Some(PendingStart {
            request: Box::pin(async move { verifier.open_session(&subject).await }),
            cancelled,
            reply,
        });
    }

    fn on_open_result(&mut self, result: Result<OpenedSession, TransportError>) {
        let Some(PendingStart {
            cancelled, reply, ..
        }) = self.starting.take()
        else {
            return;
        };

        let opened = match result {
            Ok(opened) => opened,
            Err(e) => {
                self.session.on_open_failed(&e);
                self.publish();
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        let started = SessionStarted {
            session_id: opened.session_id.clone(),
            cadence: opened.cadence,
            instructions: opened.instructions.clone(),
            cancelled,
        };
        if let Err(e) = self.session.on_opened(opened) {
            let _ = reply.send(Err(e));
            return;
        }

        let period = started.cadence.as_duration();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        self.publish();
        let _ = reply.send(Ok(started));
    }

    async fn finish(&mut self) -> Result<FinishOutcome, LivenessError> {
        let session_id = self.session.begin_finish()?;
        self.publish();
        let result = self.verifier.close_session(&session_id).await;
        let outcome = self.session.apply_close_result(&session_id, result);
        self.publish();
        outcome
    }

    fn on_tick(&mut self) {
        let Some(session_id) = self.session.frame_target().cloned() else {
            self.ticker = None;
            return;
        };
        let Some(frame) = self.frames.capture() else {
            tracing::trace!(session_id = %session_id, "frame source not ready; tick skipped");
            return;
        };

        let verifier = Arc::clone(&self.verifier);
        self.in_flight = Some(Box::pin(async move {
            let result = verifier.submit_frame(&session_id, frame).await;
            (session_id, result)
        }));
    }

    fn on_frame_result(
        &mut self,
        session_id: SessionId,
        result: Result<FrameVerdict, TransportError>,
    ) {
        match self.session.apply_frame_result(&session_id, result) {
            TickOutcome::Continue => {}
            TickOutcome::Stopped(_) => self.ticker = None,
            TickOutcome::Stale => return,
        }
        self.publish();
    }

    fn publish(&self) {
        self.updates.send_replace(self.session.snapshot());
    }
}

async fn next_open(starting: &mut Option<PendingStart>) -> Result<OpenedSession, TransportError> {
    match starting {
        Some(pending) => pending.request.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn next_submission(
    in_flight: &mut Option<Submission>,
) -> (SessionId, Result<FrameVerdict, TransportError>) {
    match in_flight {
        Some(submission) => submission.await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`SessionDriver`].
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    updates: watch::Receiver<SessionSnapshot>,
}

impl DriverHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, LivenessError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| LivenessError::DriverClosed)?;
        response.await.map_err(|_| LivenessError::DriverClosed)
    }

    /// Open a new session for `subject` and start capturing.
    ///
    /// A session that is still running is cancelled first. A [`cancel`](Self::cancel)
    /// issued while the open is pending makes this return `StartCancelled`.
    pub async fn start(&self, subject: SubjectId) -> Result<SessionStarted, LivenessError> {
        self.request(|reply| Command::Start { subject, reply }).await?
    }

    pub async fn cancel(&self) -> Result<Option<SessionId>, LivenessError> {
        self.request(|reply| Command::Cancel { reply }).await?
    }

    /// Fetch the final verdict. Only valid once capture has stopped, and only once.
    pub async fn finish(&self) -> Result<FinishOutcome, LivenessError> {
        self.request(|reply| Command::Finish { reply }).await?
    }

    /// Take the token of a passed session. Later calls return `None`.
    pub async fn take_token(&self) -> Result<Option<LivenessToken>, LivenessError> {
        self.request(|reply| Command::TakeToken { reply }).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.clone()
    }

    /// Wait until the session is neither starting nor running.
    pub async fn wait_until_stopped(&self) -> Result<SessionSnapshot, LivenessError> {
        let mut updates = self.updates.clone();
        let snapshot = updates
            .wait_for(|s| !s.phase.is_active())
            .await
            .map_err(|_| LivenessError::DriverClosed)?;
        Ok(snapshot.clone())
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}
