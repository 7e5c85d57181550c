use proptest::prelude::*;

use kiosk_client::{CloseVerdict, FrameVerdict, OpenedSession, TransportError};
use kiosk_liveness::{LivenessError, LivenessSession, SessionPhase, TickOutcome};
use kiosk_types::{Cadence, Hint, LivenessStatus, SessionId, SubjectId};

fn tick_result() -> impl Strategy<Value = Result<FrameVerdict, TransportError>> {
    prop_oneof![
        4 => Just(Some(LivenessStatus::InProgress)),
        1 => Just(Some(LivenessStatus::Passed)),
        1 => Just(Some(LivenessStatus::Failed)),
        1 => Just(Some(LivenessStatus::TimedOut)),
        1 => Just(Some(LivenessStatus::Error)),
        1 => Just(None),
    ]
    .prop_map(|status| match status {
        Some(status) => Ok(FrameVerdict {
            status,
            hint: Hint::new(status.as_str()),
        }),
        None => Err(TransportError::Timeout),
    })
}

fn close_result() -> impl Strategy<Value = Result<CloseVerdict, TransportError>> {
    prop_oneof![
        Just(Ok(CloseVerdict::Passed {
            token: "tok".into()
        })),
        Just(Ok(CloseVerdict::Failed { reason_code: None })),
        Just(Ok(CloseVerdict::TimedOut {
            reason_code: Some("EXPIRED".into())
        })),
        Just(Err(TransportError::Network("reset".into()))),
    ]
}

fn running(id: &str) -> LivenessSession {
    let mut session = LivenessSession::new();
    session
        .begin_start(SubjectId::new("card").unwrap())
        .unwrap();
    session
        .on_opened(OpenedSession {
            session_id: SessionId::new(id).unwrap(),
            cadence: Cadence::from_millis(150).unwrap(),
            instructions: vec![],
        })
        .unwrap();
    session
}

proptest! {
    /// A token exists after finish iff the last observed status and the close result are both PASSED.
    #[test]
    fn token_iff_observed_and_closed_passed(
        ticks in prop::collection::vec(tick_result(), 1..20),
        close in close_result(),
    ) {
        let id = SessionId::new("s1").unwrap();
        let mut session = running("s1");

        let mut stopped_by = None;
        for tick in ticks {
            let expected_stale = stopped_by.is_some();
            let outcome = session.apply_frame_result(&id, tick.clone());
            if expected_stale {
                prop_assert_eq!(outcome, TickOutcome::Stale);
                continue;
            }
            match tick {
                Err(_) => {
                    prop_assert_eq!(outcome, TickOutcome::Stopped(SessionPhase::Error));
                    stopped_by = Some(None);
                }
                Ok(v) if v.status == LivenessStatus::InProgress => {
                    prop_assert_eq!(outcome, TickOutcome::Continue);
                }
                Ok(v) => {
                    prop_assert!(matches!(outcome, TickOutcome::Stopped(_)));
                    stopped_by = Some(Some(v.status));
                }
            }
        }

        let Some(stopped_by) = stopped_by else {
            prop_assert_eq!(session.phase(), SessionPhase::Running);
            prop_assert_eq!(session.begin_finish(), Err(LivenessError::FinishWhileRunning(id)));
            return Ok(());
        };
        prop_assert!(session.phase().is_terminal());

        let finish_id = session.begin_finish().unwrap();
        let close_passed = matches!(close, Ok(CloseVerdict::Passed { .. }));
        let close_failed = close.is_err();
        let outcome = session.apply_close_result(&finish_id, close);

        let expect_token = stopped_by == Some(LivenessStatus::Passed) && close_passed;
        prop_assert_eq!(session.token().is_some(), expect_token);
        if close_failed {
            prop_assert!(outcome.is_err());
            prop_assert_eq!(session.phase(), SessionPhase::Error);
        } else {
            prop_assert_eq!(outcome.unwrap().token().is_some(), expect_token);
        }
        prop_assert!(matches!(session.begin_finish(), Err(LivenessError::AlreadyFinished(_))));
    }

    /// A request failure at any tick ends the session in ERROR, regardless of prior progress.
    #[test]
    fn transport_failure_at_any_tick_is_error(progress in 0usize..30) {
        let id = SessionId::new("s1").unwrap();
        let mut session = running("s1");
        for _ in 0..progress {
            let outcome = session.apply_frame_result(&id, Ok(FrameVerdict {
                status: LivenessStatus::InProgress,
                hint: Hint::new("keep going"),
            }));
            prop_assert_eq!(outcome, TickOutcome::Continue);
        }
        let outcome = session.apply_frame_result(&id, Err(TransportError::Timeout));
        prop_assert_eq!(outcome, TickOutcome::Stopped(SessionPhase::Error));
        prop_assert_eq!(session.frames_submitted(), progress as u64);
        prop_assert!(session.token().is_none());
    }

    /// Results addressed to any other session never change state.
    #[test]
    fn foreign_results_are_ignored(other in "[a-z0-9]{1,8}", ticks in prop::collection::vec(tick_result(), 1..10)) {
        prop_assume!(other != "s1");
        let foreign = SessionId::new(other).unwrap();
        let mut session = running("s1");
        let before = session.snapshot();
        for tick in ticks {
            prop_assert_eq!(session.apply_frame_result(&foreign, tick), TickOutcome::Stale);
        }
        prop_assert_eq!(session.snapshot(), before);
    }
}
