use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use mongodb::bson;

/// One-time passcode record, keyed by normalized lowercase email.
/// Upserted on each request (only the latest code is valid), deleted on
/// successful verification.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OtpRecord {
    /// Normalized email, the natural key.
    #[serde(rename = "_id")]
    pub email: String,
    pub code: String,
    pub attempts: i32,
    pub application_id: ObjectId,
    /// Snapshot of the member identifier at issue time, so verification can
    /// mint claims without a second lookup.
    pub member_id: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
