//! Minimum interval between frame submissions, fixed by the verifier at open.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::TypesError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Cadence(u64);

impl Cadence {
    pub fn from_millis(ms: u64) -> Result<Self, TypesError> {
        if ms == 0 {
            return Err(TypesError::ZeroCadence);
        }
        Ok(Self(ms))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl TryFrom<u64> for Cadence {
    type Error = TypesError;
    fn try_from(ms: u64) -> Result<Self, Self::Error> {
        Self::from_millis(ms)
    }
}

impl From<Cadence> for u64 {
    fn from(c: Cadence) -> Self {
        c.0
    }
}
