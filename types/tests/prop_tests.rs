use proptest::prelude::*;

use kiosk_types::{AmountCents, Cadence, SubjectId};

proptest! {
    /// Any positive cent value survives formatting in major units and parsing back.
    #[test]
    fn amount_major_units_roundtrip(cents in 1u64..10_000_000_000) {
        let amount = AmountCents::new(cents).unwrap();
        let parsed = AmountCents::from_major_str(&amount.to_string()).unwrap();
        prop_assert_eq!(parsed, amount);
    }

    /// Cadence accepts exactly the positive millisecond values.
    #[test]
    fn cadence_positive_only(ms in 0u64..100_000) {
        prop_assert_eq!(Cadence::from_millis(ms).is_ok(), ms > 0);
    }

    /// Subject identifiers never keep surrounding whitespace.
    #[test]
    fn subject_is_always_trimmed(uid in "[A-F0-9]{4,16}", pad in "[ \t]{0,3}") {
        let subject = SubjectId::new(format!("{pad}{uid}{pad}")).unwrap();
        prop_assert_eq!(subject.as_str(), uid.as_str());
    }
}
