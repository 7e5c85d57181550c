use kiosk_client::{PaymentVerdict, TransportError};
use kiosk_nullables::NullPaymentAuthority;
use kiosk_payment::{GateError, PaymentGate};
use kiosk_types::{AmountCents, LivenessToken, SessionId, SubjectId};

fn subject() -> SubjectId {
    SubjectId::new("04A1B2C3").unwrap()
}

fn token_for(subject: &SubjectId, value: &str) -> LivenessToken {
    LivenessToken::new(SessionId::new("s1").unwrap(), subject.clone(), value)
}

fn amount(cents: u64) -> AmountCents {
    AmountCents::new(cents).unwrap()
}

#[tokio::test]
async fn token_is_forwarded_verbatim() {
    let gate = PaymentGate::new(NullPaymentAuthority::new());
    let verdict = gate
        .authorize(&subject(), amount(15000), Some(token_for(&subject(), "tok-abc")))
        .await
        .unwrap();

    assert!(verdict.is_approved());
    let requests = gate.authority().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].card_uid, "04A1B2C3");
    assert_eq!(requests[0].amount_cents, 15000);
    assert_eq!(requests[0].liveness_token.as_deref(), Some("tok-abc"));
}

#[tokio::test]
async fn missing_token_is_sent_as_explicit_absence() {
    let gate = PaymentGate::new(NullPaymentAuthority::new());
    gate.authorize(&subject(), amount(500), None).await.unwrap();

    let requests = gate.authority().requests();
    assert_eq!(requests[0].liveness_token, None);
    assert!(!requests[0].has_token());
}

#[tokio::test]
async fn operator_token_is_forwarded_without_a_session() {
    let authority = NullPaymentAuthority::new();
    authority.decline("LIVENESS_INVALID", "unknown token");
    let gate = PaymentGate::new(authority);

    let verdict = gate
        .authorize_operator_token(&subject(), amount(2500), "typed-in".to_string())
        .await
        .unwrap();

    assert!(matches!(verdict, PaymentVerdict::Declined { ref code, .. } if code == "LIVENESS_INVALID"));
    let requests = gate.authority().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].card_uid, "04A1B2C3");
    assert_eq!(requests[0].amount_cents, 2500);
    assert_eq!(requests[0].liveness_token.as_deref(), Some("typed-in"));
}

#[tokio::test]
async fn verdicts_are_relayed_unchanged() {
    let authority = NullPaymentAuthority::new();
    authority
        .decline("LIVENESS_REQUIRED", "face check required above subsidy")
        .script(Ok(PaymentVerdict::Error {
            code: "INTERNAL".into(),
            message: "try later".into(),
        }));
    let gate = PaymentGate::new(authority);

    let declined = gate.authorize(&subject(), amount(90000), None).await.unwrap();
    assert_eq!(
        declined,
        PaymentVerdict::Declined {
            code: "LIVENESS_REQUIRED".into(),
            message: "face check required above subsidy".into(),
        }
    );

    let errored = gate.authorize(&subject(), amount(90000), None).await.unwrap();
    assert!(matches!(errored, PaymentVerdict::Error { ref code, .. } if code == "INTERNAL"));
}

#[tokio::test]
async fn transport_failure_is_not_a_verdict() {
    let authority = NullPaymentAuthority::new();
    authority.script(Err(TransportError::Timeout));
    let gate = PaymentGate::new(authority);

    let err = gate
        .authorize(&subject(), amount(100), Some(token_for(&subject(), "tok")))
        .await
        .unwrap_err();
    assert_eq!(err, GateError::Transport(TransportError::Timeout));
}

#[tokio::test]
async fn token_of_another_subject_is_refused_before_sending() {
    let gate = PaymentGate::new(NullPaymentAuthority::new());
    let other = SubjectId::new("FFEE0011").unwrap();

    let err = gate
        .authorize(&subject(), amount(100), Some(token_for(&other, "tok")))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::TokenSubjectMismatch { .. }));
    assert!(gate.authority().requests().is_empty());
}
