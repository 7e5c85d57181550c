//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the terminal (the liveness verifier, the
//! camera, the payment authority) has a test-friendly implementation here that:
//! - Replies from a script instead of the network
//! - Records every call for assertions
//! - Can delay a reply on tokio's clock, so paused-time tests control ordering
//!
//! Usage: swap real implementations for nullables in tests.

pub mod frames;
pub mod payment;
pub mod verifier;

pub use frames::NullFrameSource;
pub use payment::NullPaymentAuthority;
pub use verifier::{opened, verdict, NullVerifier, VerifierCall};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a script, ignoring poisoning from a panicked test thread.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
