//! The cashier flow: liveness challenge, then payment.

use std::future::Future;

use kiosk_client::{PaymentAuthority, PaymentVerdict};
use kiosk_liveness::{DriverHandle, FinishOutcome, LivenessError, SessionPhase, SessionSnapshot};
use kiosk_payment::{GateError, PaymentGate};
use kiosk_types::{AmountCents, CloseResult, Hint, LivenessToken, SubjectId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Liveness(#[from] LivenessError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

/// How a liveness challenge ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Passed(LivenessToken),
    NotPassed {
        /// Phase capture stopped in.
        phase: SessionPhase,
        /// Close verdict, when the verifier gave one.
        result: Option<CloseResult>,
        reason_code: Option<String>,
        reason: String,
    },
    /// Cancelled before capture stopped.
    Interrupted,
}

impl ChallengeOutcome {
    pub fn into_token(self) -> Option<LivenessToken> {
        match self {
            Self::Passed(token) => Some(token),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Completed {
        challenge: ChallengeOutcome,
        verdict: PaymentVerdict,
    },
    Interrupted,
}

/// Run one challenge for `subject` to completion and collect its token.
///
/// `on_hint` sees every new hint while capture runs. If `interrupt` resolves
/// first the session is cancelled and nothing is finished.
pub async fn run_challenge(
    driver: &DriverHandle,
    subject: &SubjectId,
    interrupt: impl Future<Output = ()>,
    mut on_hint: impl FnMut(&Hint),
) -> Result<ChallengeOutcome, LivenessError> {
    let mut updates = driver.subscribe();
    tokio::pin!(interrupt);

    let started = tokio::select! {
        biased;
        _ = &mut interrupt => return abandon(driver).await,
        started = driver.start(subject.clone()) => started?,
    };
    tracing::info!(
        subject = %subject,
        session_id = %started.session_id,
        cadence = %started.cadence,
        "liveness challenge started"
    );

    let stopped = tokio::select! {
        biased;
        _ = &mut interrupt => return abandon(driver).await,
        stopped = follow_hints(&mut updates, &mut on_hint) => stopped?,
    };

    if stopped.phase == SessionPhase::Idle {
        return Ok(ChallengeOutcome::Interrupted);
    }

    match driver.finish().await {
        Ok(FinishOutcome::Passed(_)) => match driver.take_token().await? {
            Some(token) => Ok(ChallengeOutcome::Passed(token)),
            None => Err(LivenessError::NoSession),
        },
        Ok(FinishOutcome::NotPassed {
            result,
            reason_code,
            reason,
        }) => Ok(ChallengeOutcome::NotPassed {
            phase: stopped.phase,
            result: Some(result),
            reason_code,
            reason,
        }),
        Err(LivenessError::Transport(e)) => Ok(ChallengeOutcome::NotPassed {
            phase: SessionPhase::Error,
            result: None,
            reason_code: e.remote_code().map(str::to_string),
            reason: format!("closing session failed: {e}"),
        }),
        Err(e) => Err(e),
    }
}

async fn abandon(driver: &DriverHandle) -> Result<ChallengeOutcome, LivenessError> {
    match driver.cancel().await {
        Ok(_) | Err(LivenessError::NotRunning) => Ok(ChallengeOutcome::Interrupted),
        Err(e) => Err(e),
    }
}

async fn follow_hints(
    updates: &mut tokio::sync::watch::Receiver<SessionSnapshot>,
    on_hint: &mut impl FnMut(&Hint),
) -> Result<SessionSnapshot, LivenessError> {
    let mut shown: Option<Hint> = None;
    loop {
        let snapshot = updates.borrow_and_update().clone();
        if let Some(hint) = &snapshot.hint {
            if shown.as_ref() != Some(hint) {
                on_hint(hint);
                shown = Some(hint.clone());
            }
        }
        if !snapshot.phase.is_active() {
            return Ok(snapshot);
        }
        updates
            .changed()
            .await
            .map_err(|_| LivenessError::DriverClosed)?;
    }
}

/// Full checkout: challenge, then payment with whatever token the challenge produced.
///
/// A failed challenge still goes to the payment authority, with an explicit
/// "no token", so the authority's own policy decides.
pub async fn checkout<A: PaymentAuthority>(
    driver: &DriverHandle,
    gate: &PaymentGate<A>,
    subject: &SubjectId,
    amount: AmountCents,
    interrupt: impl Future<Output = ()>,
    on_hint: impl FnMut(&Hint),
) -> Result<CheckoutOutcome, FlowError> {
    let challenge = run_challenge(driver, subject, interrupt, on_hint).await?;
    let token = match &challenge {
        ChallengeOutcome::Interrupted => return Ok(CheckoutOutcome::Interrupted),
        ChallengeOutcome::Passed(token) => Some(token.clone()),
        ChallengeOutcome::NotPassed { phase, reason, .. } => {
            tracing::info!(subject = %subject, %phase, %reason, "paying without liveness token");
            None
        }
    };

    let verdict = gate.authorize(subject, amount, token).await?;
    Ok(CheckoutOutcome::Completed { challenge, verdict })
}
