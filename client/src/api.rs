//! Shared HTTP plumbing: base URL, terminal credential, response envelopes.

use reqwest::{multipart::Form, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::TransportError;

/// Header carrying the terminal's shared credential on every request.
pub const TERMINAL_TOKEN_HEADER: &str = "X-Terminal-Token";

/// Longest slice of a non-envelope error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// Connection settings shared by every remote collaborator.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub terminal_token: String,
    /// Whole-request timeout. Bounds a capture tick, so keep it below the
    /// verifier's session lifetime.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, terminal_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            terminal_token: terminal_token.into(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// HTTP client for the kiosk backend.
///
/// Wraps `reqwest::Client` with the base URL and credential and decodes the
/// `{"ok": .., "data": ..}` envelope every endpoint answers with.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    terminal_token: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            terminal_token: config.terminal_token.clone(),
        })
    }

    /// The configured base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode the envelope's `data`.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(path))
            .header(TERMINAL_TOKEN_HEADER, &self.terminal_token)
            .json(body)
            .send()
            .await?;
        decode_response(response).await
    }

    /// POST a multipart form and decode the envelope's `data`.
    pub async fn post_multipart<T>(&self, path: &str, form: Form) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(path))
            .header(TERMINAL_TOKEN_HEADER, &self.terminal_token)
            .multipart(form)
            .send()
            .await?;
        decode_response(response).await
    }

    /// GET with query parameters and decode the envelope's `data`.
    pub async fn get_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, TransportError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(self.url(path))
            .header(TERMINAL_TOKEN_HEADER, &self.terminal_token)
            .query(query)
            .send()
            .await?;
        decode_response(response).await
    }
}

// ── Envelope decoding ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default, alias = "error_code")]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    let body = response.bytes().await?;
    decode_envelope(status, &body)
}

/// Decode a response body into the envelope's `data`.
///
/// A failure envelope wins over the HTTP status, so the server's own code and
/// message reach the caller even on 4xx/5xx. Anything else on a non-2xx
/// status is a status error, including a body claiming `ok: true`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, TransportError> {
    let status_error = || TransportError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body)
            .chars()
            .take(MAX_ERROR_BODY)
            .collect(),
    };
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => return Err(status_error()),
        Err(e) => {
            return Err(TransportError::Malformed(format!(
                "response is not an envelope: {e}"
            )))
        }
    };

    if !envelope.ok {
        return Err(TransportError::Remote {
            code: envelope.code.unwrap_or_else(|| "UNKNOWN".to_string()),
            message: envelope.message.unwrap_or_default(),
        });
    }
    if !status.is_success() {
        return Err(status_error());
    }

    let data = envelope
        .data
        .ok_or_else(|| TransportError::Malformed("success envelope without data".into()))?;
    serde_json::from_value(data).map_err(|e| TransportError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn success_envelope_yields_data() {
        let body = br#"{"ok": true, "data": {"value": 7}}"#;
        let decoded: Payload = decode_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(decoded, Payload { value: 7 });
    }

    #[test]
    fn failure_envelope_wins_over_status() {
        let body = br#"{"ok": false, "code": "CARD_BLOCKED", "message": "blocked"}"#;
        let err = decode_envelope::<Payload>(StatusCode::FORBIDDEN, body).unwrap_err();
        assert_eq!(
            err,
            TransportError::Remote {
                code: "CARD_BLOCKED".into(),
                message: "blocked".into()
            }
        );
    }

    #[test]
    fn success_envelope_on_error_status_is_status_error() {
        let body = br#"{"ok": true, "data": {"value": 7}}"#;
        let err = decode_envelope::<Payload>(StatusCode::INTERNAL_SERVER_ERROR, body).unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
    }

    #[test]
    fn error_code_alias_accepted() {
        let body = br#"{"ok": false, "error_code": "LIVENESS_EXPIRED"}"#;
        let err = decode_envelope::<Payload>(StatusCode::CONFLICT, body).unwrap_err();
        assert_eq!(err.remote_code(), Some("LIVENESS_EXPIRED"));
    }

    #[test]
    fn non_envelope_error_body_is_status_error() {
        let err = decode_envelope::<Payload>(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 502, .. }));
    }

    #[test]
    fn missing_field_is_malformed() {
        let body = br#"{"ok": true, "data": {"other": 1}}"#;
        let err = decode_envelope::<Payload>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));

        let err = decode_envelope::<Payload>(StatusCode::OK, br#"{"ok": true}"#).unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));

        let err = decode_envelope::<Payload>(StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }
}
