use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson;

/// Append-only record of one send attempt.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EmailLogEntry {
    pub to: String,
    pub template_key: String,
    pub status: EmailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Sent,
    Failed,
    /// Template inactive, send bypassed.
    Skipped,
}
