//! Employee directory: the read-only cashier view of a card holder.

use kiosk_types::SubjectId;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{ApiClient, TransportError};

/// What the cashier screen shows after a card is tapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub employee_id: String,
    pub full_name: String,
    #[serde(default)]
    pub employee_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Reference photo, base64-encoded JPEG.
    #[serde(default, skip_serializing)]
    pub photo_base64: Option<String>,
    pub subsidy_today_left_cents: u64,
    pub monthly_left_cents: u64,
    #[serde(default)]
    pub needs_face_enrollment: bool,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }
    Ok(match Id::deserialize(d)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[derive(Serialize)]
struct LookupQuery<'a> {
    card_uid: &'a str,
}

#[derive(Clone)]
pub struct EmployeeDirectory {
    api: ApiClient,
}

impl EmployeeDirectory {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn employee_info(&self, subject: &SubjectId) -> Result<EmployeeInfo, TransportError> {
        self.api
            .get_query(
                "/api/employee_info",
                &LookupQuery {
                    card_uid: subject.as_str(),
                },
            )
            .await
    }
}
