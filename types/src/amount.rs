//! Payment amounts in minor currency units.
//!
//! Amounts are integers to avoid floating-point errors. The CLI accepts major
//! units ("150.50"), which are parsed exactly rather than through `f64`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// A strictly positive amount in minor units (kopecks, cents).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct AmountCents(u64);

impl AmountCents {
    pub fn new(cents: u64) -> Result<Self, TypesError> {
        if cents == 0 {
            return Err(TypesError::ZeroAmount);
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Parse a major-unit decimal such as `"150"`, `"150.5"` or `"150,05"`.
    pub fn from_major_str(raw: &str) -> Result<Self, TypesError> {
        let s = raw.trim();
        let invalid = || TypesError::InvalidAmount(raw.to_string());

        let (whole, fraction) = match s.find(['.', ',']) {
            Some(idx) => (&s[..idx], &s[idx + 1..]),
            None => (s, ""),
        };
        if whole.is_empty()
            || fraction.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let fraction: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(invalid)?;
        Self::new(cents)
    }
}

impl fmt::Display for AmountCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl TryFrom<u64> for AmountCents {
    type Error = TypesError;
    fn try_from(cents: u64) -> Result<Self, Self::Error> {
        Self::new(cents)
    }
}

impl From<AmountCents> for u64 {
    fn from(a: AmountCents) -> Self {
        a.0
    }
}
