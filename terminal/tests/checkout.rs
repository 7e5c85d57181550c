use std::sync::{Arc, Mutex};
use std::time::Duration;

use kiosk_client::{CloseVerdict, PaymentVerdict, TransportError};
use kiosk_liveness::{SessionDriver, SessionPhase};
use kiosk_nullables::{opened, verdict, NullFrameSource, NullPaymentAuthority, NullVerifier};
use kiosk_payment::PaymentGate;
use kiosk_terminal::{checkout, run_challenge, ChallengeOutcome, CheckoutOutcome, ShutdownController};
use kiosk_types::{AmountCents, CloseResult, Hint, LivenessStatus, SubjectId};

fn subject() -> SubjectId {
    SubjectId::new("04A1B2C3").unwrap()
}

fn hint_log() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&Hint)) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |hint: &Hint| {
        sink.lock().unwrap().push(hint.to_string())
    })
}

#[tokio::test(start_paused = true)]
async fn passed_challenge_pays_with_its_token() {
    let verifier = Arc::new(NullVerifier::new());
    verifier
        .script_open(Ok(opened("s1", 150, &["turn left"])))
        .script_frame("s1", Ok(verdict(LivenessStatus::InProgress, "now blink")))
        .script_frame("s1", Ok(verdict(LivenessStatus::Passed, "thank you")))
        .script_close(
            "s1",
            Ok(CloseVerdict::Passed {
                token: "tok-abc".into(),
            }),
        );
    let (driver, _task) = SessionDriver::spawn(verifier, NullFrameSource::ready());
    let gate = PaymentGate::new(NullPaymentAuthority::new());
    let (hints, on_hint) = hint_log();

    let outcome = checkout(
        &driver,
        &gate,
        &subject(),
        AmountCents::new(15000).unwrap(),
        std::future::pending(),
        on_hint,
    )
    .await
    .unwrap();

    let CheckoutOutcome::Completed { challenge, verdict } = outcome else {
        panic!("checkout was interrupted");
    };
    assert_eq!(challenge.into_token().unwrap().expose(), "tok-abc");
    assert!(verdict.is_approved());

    let requests = gate.authority().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_cents, 15000);
    assert_eq!(requests[0].liveness_token.as_deref(), Some("tok-abc"));
    assert_eq!(
        *hints.lock().unwrap(),
        vec!["turn left", "now blink", "thank you"]
    );

    // the token was consumed by the payment
    assert!(driver.take_token().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_challenge_still_asks_the_authority_without_token() {
    let verifier = Arc::new(NullVerifier::new());
    verifier
        .script_open(Ok(opened("s1", 150, &["look up"])))
        .script_frame("s1", Ok(verdict(LivenessStatus::Failed, "spoof suspected")))
        .script_close(
            "s1",
            Ok(CloseVerdict::Failed {
                reason_code: Some("SPOOF".into()),
            }),
        );
    let (driver, _task) = SessionDriver::spawn(verifier, NullFrameSource::ready());
    let authority = NullPaymentAuthority::new();
    authority.decline("LIVENESS_REQUIRED", "face check required");
    let gate = PaymentGate::new(authority);

    let outcome = checkout(
        &driver,
        &gate,
        &subject(),
        AmountCents::new(90000).unwrap(),
        std::future::pending(),
        |_: &Hint| {},
    )
    .await
    .unwrap();

    let CheckoutOutcome::Completed { challenge, verdict } = outcome else {
        panic!("checkout was interrupted");
    };
    assert_eq!(
        challenge,
        ChallengeOutcome::NotPassed {
            phase: SessionPhase::Failed,
            result: Some(CloseResult::Failed),
            reason_code: Some("SPOOF".into()),
            reason: "liveness FAILED: SPOOF".into(),
        }
    );
    assert!(matches!(verdict, PaymentVerdict::Declined { ref code, .. } if code == "LIVENESS_REQUIRED"));

    let requests = gate.authority().requests();
    assert_eq!(requests[0].liveness_token, None);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_mid_capture_pays_without_token() {
    let verifier = Arc::new(NullVerifier::new());
    verifier
        .script_open(Ok(opened("s1", 150, &[])))
        .script_frame("s1", Err(TransportError::Timeout))
        .script_close("s1", Ok(CloseVerdict::TimedOut { reason_code: None }));
    let (driver, _task) = SessionDriver::spawn(verifier, NullFrameSource::ready());
    let gate = PaymentGate::new(NullPaymentAuthority::new());

    let outcome = checkout(
        &driver,
        &gate,
        &subject(),
        AmountCents::new(100).unwrap(),
        std::future::pending(),
        |_: &Hint| {},
    )
    .await
    .unwrap();

    let CheckoutOutcome::Completed { challenge, .. } = outcome else {
        panic!("checkout was interrupted");
    };
    assert!(matches!(
        challenge,
        ChallengeOutcome::NotPassed {
            phase: SessionPhase::Error,
            ..
        }
    ));
    assert_eq!(gate.authority().requests()[0].liveness_token, None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_cancels_the_challenge() {
    let verifier = Arc::new(NullVerifier::new());
    verifier.script_open(Ok(opened("s1", 150, &["hold still"])));
    let (driver, _task) = SessionDriver::spawn(verifier.clone(), NullFrameSource::ready());
    let gate = PaymentGate::new(NullPaymentAuthority::new());

    let controller = Arc::new(ShutdownController::new());
    let interrupt = controller.signalled();
    let trigger = Arc::clone(&controller);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.trigger();
    });

    let outcome = checkout(
        &driver,
        &gate,
        &subject(),
        AmountCents::new(100).unwrap(),
        interrupt,
        |_: &Hint| {},
    )
    .await
    .unwrap();

    assert_eq!(outcome, CheckoutOutcome::Interrupted);
    assert_eq!(driver.snapshot().phase, SessionPhase::Idle);
    assert!(gate.authority().requests().is_empty());
    assert_eq!(verifier.closes(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_does_not_wait_for_a_slow_open() {
    let verifier = Arc::new(NullVerifier::new());
    verifier.script_open_after(Duration::from_secs(5), Ok(opened("s1", 150, &[])));
    let (driver, _task) = SessionDriver::spawn(verifier.clone(), NullFrameSource::ready());

    let controller = Arc::new(ShutdownController::new());
    let interrupt = controller.signalled();
    let trigger = Arc::clone(&controller);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.trigger();
    });

    let t0 = tokio::time::Instant::now();
    let outcome = run_challenge(&driver, &subject(), interrupt, |_: &Hint| {})
        .await
        .unwrap();

    assert_eq!(outcome, ChallengeOutcome::Interrupted);
    assert!(t0.elapsed() < Duration::from_secs(1));
    assert_eq!(driver.snapshot().phase, SessionPhase::Idle);
    assert_eq!(verifier.frames_submitted("s1"), 0);
}

#[tokio::test(start_paused = true)]
async fn unreachable_verifier_surfaces_an_error() {
    let verifier = Arc::new(NullVerifier::new());
    verifier.script_open(Err(TransportError::Network("connection refused".into())));
    let (driver, _task) = SessionDriver::spawn(verifier, NullFrameSource::ready());

    let err = run_challenge(&driver, &subject(), std::future::pending(), |_: &Hint| {})
        .await
        .unwrap_err();
    assert!(!err.is_caller_misuse());
    assert_eq!(driver.snapshot().phase, SessionPhase::Idle);
}
