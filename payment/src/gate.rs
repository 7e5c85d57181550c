//! The payment gate.

use kiosk_client::{PaymentAuthority, PaymentRequest, PaymentVerdict};
use kiosk_types::{AmountCents, LivenessToken, SubjectId};

use crate::GateError;

/// Forwards purchases to the payment authority.
///
/// The token is an opaque credential: the gate never checks whether it is still
/// valid and never makes one up. Without a token the request carries an explicit
/// `null`, so the authority can apply its own policy to unverified payments.
pub struct PaymentGate<A> {
    authority: A,
}

impl<A: PaymentAuthority> PaymentGate<A> {
    pub fn new(authority: A) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Ask the authority to approve `amount` for `subject` and relay its verdict.
    ///
    /// A token issued for a different subject is refused before anything is sent.
    pub async fn authorize(
        &self,
        subject: &SubjectId,
        amount: AmountCents,
        token: Option<LivenessToken>,
    ) -> Result<PaymentVerdict, GateError> {
        if let Some(token) = &token {
            if token.subject() != subject {
                tracing::warn!(
                    subject = %subject,
                    token_subject = %token.subject(),
                    session_id = %token.session_id(),
                    "refusing liveness token issued for another subject"
                );
                return Err(GateError::TokenSubjectMismatch {
                    subject: subject.clone(),
                    token_subject: token.subject().clone(),
                });
            }
        }

        let request = PaymentRequest::new(subject, amount, token.as_ref());
        tracing::info!(
            subject = %subject,
            amount_cents = amount.cents(),
            with_token = request.has_token(),
            "requesting payment authorization"
        );
        self.submit(subject, &request).await
    }

    /// Like [`authorize`](Self::authorize), with a token value typed in by the
    /// operator instead of one this terminal obtained from a session.
    ///
    /// Nothing about the value can be checked locally; it goes to the authority as is.
    pub async fn authorize_operator_token(
        &self,
        subject: &SubjectId,
        amount: AmountCents,
        token: String,
    ) -> Result<PaymentVerdict, GateError> {
        let request = PaymentRequest::with_operator_token(subject, amount, token);
        tracing::info!(
            subject = %subject,
            amount_cents = amount.cents(),
            "requesting payment authorization with operator-supplied token"
        );
        self.submit(subject, &request).await
    }

    async fn submit(
        &self,
        subject: &SubjectId,
        request: &PaymentRequest,
    ) -> Result<PaymentVerdict, GateError> {
        let verdict = self.authority.pay(request).await.map_err(|e| {
            tracing::warn!(subject = %subject, error = %e, "payment authorization failed");
            GateError::from(e)
        })?;

        match &verdict {
            PaymentVerdict::Approved(approved) => {
                tracing::info!(subject = %subject, amount_cents = approved.amount_cents, "payment approved")
            }
            PaymentVerdict::Declined { code, .. } => {
                tracing::info!(subject = %subject, %code, "payment declined")
            }
            PaymentVerdict::Error { code, message } => {
                tracing::warn!(subject = %subject, %code, %message, "payment authority returned an error")
            }
        }
        Ok(verdict)
    }
}
