//! Payment authority transport.

use async_trait::async_trait;
use kiosk_types::{AmountCents, LivenessToken, SubjectId};
use serde::{Deserialize, Serialize};

use crate::{ApiClient, TransportError};

/// Body of a payment request.
///
/// `liveness_token` is always serialized: JSON `null` when there is no token,
/// so the authority can tell "no token" apart from an empty string.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub card_uid: String,
    pub amount_cents: u64,
    pub liveness_token: Option<String>,
}

impl PaymentRequest {
    pub fn new(subject: &SubjectId, amount: AmountCents, token: Option<&LivenessToken>) -> Self {
        Self {
            card_uid: subject.as_str().to_string(),
            amount_cents: amount.cents(),
            liveness_token: token.map(|t| t.expose().to_string()),
        }
    }

    /// Request carrying a token value the operator typed in.
    ///
    /// There is no session behind it on this terminal, so it is forwarded as
    /// raw text and only the authority can tell whether it is genuine.
    pub fn with_operator_token(
        subject: &SubjectId,
        amount: AmountCents,
        token: impl Into<String>,
    ) -> Self {
        Self {
            card_uid: subject.as_str().to_string(),
            amount_cents: amount.cents(),
            liveness_token: Some(token.into()),
        }
    }

    pub fn has_token(&self) -> bool {
        self.liveness_token.is_some()
    }
}

impl std::fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("card_uid", &self.card_uid)
            .field("amount_cents", &self.amount_cents)
            .field(
                "liveness_token",
                &self.liveness_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Balances reported with an approved payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedPayment {
    pub amount_cents: u64,
    #[serde(default)]
    pub subsidy_spent_cents: u64,
    #[serde(default)]
    pub monthly_spent_cents: u64,
    #[serde(default)]
    pub subsidy_today_left_cents: u64,
    #[serde(default)]
    pub monthly_left_cents: u64,
}

/// The payment authority's verdict, relayed as received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentVerdict {
    Approved(ApprovedPayment),
    Declined { code: String, message: String },
    /// The authority answered with an error envelope instead of a verdict.
    Error { code: String, message: String },
}

impl PaymentVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved(_))
    }
}

/// The remote authority that approves or declines payments.
#[async_trait]
pub trait PaymentAuthority: Send + Sync {
    async fn pay(&self, request: &PaymentRequest) -> Result<PaymentVerdict, TransportError>;
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
enum PayResponse {
    Approved(ApprovedPayment),
    Declined {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    },
}

/// [`PaymentAuthority`] over the kiosk backend's `/api/pay` endpoint.
#[derive(Clone)]
pub struct HttpPaymentAuthority {
    api: ApiClient,
}

impl HttpPaymentAuthority {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PaymentAuthority for HttpPaymentAuthority {
    async fn pay(&self, request: &PaymentRequest) -> Result<PaymentVerdict, TransportError> {
        match self.api.post_json::<_, PayResponse>("/api/pay", request).await {
            Ok(PayResponse::Approved(approved)) => Ok(PaymentVerdict::Approved(approved)),
            Ok(PayResponse::Declined { code, message }) => {
                Ok(PaymentVerdict::Declined { code, message })
            }
            Err(TransportError::Remote { code, message }) => {
                Ok(PaymentVerdict::Error { code, message })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_types::SessionId;

    fn subject() -> SubjectId {
        SubjectId::new("04A1B2C3").unwrap()
    }

    #[test]
    fn absent_token_is_explicit_null() {
        let request = PaymentRequest::new(&subject(), AmountCents::new(15000).unwrap(), None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["liveness_token"], serde_json::Value::Null);
        assert!(json.as_object().unwrap().contains_key("liveness_token"));
        assert!(!request.has_token());
    }

    #[test]
    fn empty_token_stays_distinguishable_from_absent() {
        let mut request = PaymentRequest::new(&subject(), AmountCents::new(100).unwrap(), None);
        request.liveness_token = Some(String::new());
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""liveness_token":"""#));
    }

    #[test]
    fn token_value_is_forwarded_verbatim() {
        let token = LivenessToken::new(SessionId::new("s1").unwrap(), subject(), "tok-abc");
        let request =
            PaymentRequest::new(&subject(), AmountCents::new(15000).unwrap(), Some(&token));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["liveness_token"], "tok-abc");
        assert_eq!(json["amount_cents"], 15000);
        assert_eq!(json["card_uid"], "04A1B2C3");
        assert!(!format!("{request:?}").contains("tok-abc"));
    }

    #[test]
    fn pay_response_variants_decode() {
        let approved: PayResponse = serde_json::from_str(
            r#"{"status": "APPROVED", "amount_cents": 15000, "subsidy_spent_cents": 10000,
                "monthly_spent_cents": 5000, "subsidy_today_left_cents": 0,
                "monthly_left_cents": 95000}"#,
        )
        .unwrap();
        assert!(matches!(approved, PayResponse::Approved(ref a) if a.monthly_spent_cents == 5000));

        let declined: PayResponse = serde_json::from_str(
            r#"{"status": "DECLINED", "code": "MONTHLY_LIMIT_EXCEEDED", "message": "no funds"}"#,
        )
        .unwrap();
        assert!(matches!(declined, PayResponse::Declined { ref code, .. } if code == "MONTHLY_LIMIT_EXCEEDED"));
    }
}
