//! Nullable payment authority: record requests, answer from a script.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use kiosk_client::{
    ApprovedPayment, PaymentAuthority, PaymentRequest, PaymentVerdict, TransportError,
};

use crate::lock;

/// A payment authority that records every request.
///
/// Scripted verdicts are consumed in order; once they run out every request is
/// approved for its full amount.
#[derive(Default)]
pub struct NullPaymentAuthority {
    replies: Mutex<VecDeque<Result<PaymentVerdict, TransportError>>>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl NullPaymentAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, reply: Result<PaymentVerdict, TransportError>) -> &Self {
        lock(&self.replies).push_back(reply);
        self
    }

    pub fn decline(&self, code: &str, message: &str) -> &Self {
        self.script(Ok(PaymentVerdict::Declined {
            code: code.to_string(),
            message: message.to_string(),
        }))
    }

    /// All requests received (for assertions).
    pub fn requests(&self) -> Vec<PaymentRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl PaymentAuthority for NullPaymentAuthority {
    async fn pay(&self, request: &PaymentRequest) -> Result<PaymentVerdict, TransportError> {
        lock(&self.requests).push(request.clone());
        let scripted = lock(&self.replies).pop_front();
        scripted.unwrap_or_else(|| {
            Ok(PaymentVerdict::Approved(ApprovedPayment {
                amount_cents: request.amount_cents,
                subsidy_spent_cents: 0,
                monthly_spent_cents: request.amount_cents,
                subsidy_today_left_cents: 0,
                monthly_left_cents: 0,
            }))
        })
    }
}
