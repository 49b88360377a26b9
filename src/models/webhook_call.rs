use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Error;

/// Failure recorded on a call by the last processing attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookException {
    pub code: String,
    pub message: String,
    pub trace: String,
}

impl From<&Error> for WebhookException {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            trace: err.trace(),
        }
    }
}

/// Durable record of one inbound webhook notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCall {
    pub id: Uuid,
    pub description: String,
    pub payload: JsonValue,
    pub exception: Option<WebhookException>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookCall {
    /// Pulls the `description` tag out of an inbound body; anything other
    /// than a string field on a JSON object counts as unclassified.
    pub fn description_of(payload: &JsonValue) -> String {
        payload
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct WebhookCallRow {
    pub id: Uuid,
    pub description: String,
    pub payload: JsonValue,
    pub exception: Option<Json<WebhookException>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookCallRow> for WebhookCall {
    fn from(row: WebhookCallRow) -> Self {
        Self {
            id: row.id,
            description: row.description,
            payload: row.payload,
            exception: row.exception.map(|Json(e)| e),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
