use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use mongodb::bson;

/// Per-member recommendation list, overwritten on each batch run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemberMatches {
    #[serde(rename = "_id")]
    pub application_id: ObjectId,
    pub matches: Vec<SuggestedMatch>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SuggestedMatch {
    pub application_id: ObjectId,
    pub member_id: String,
    pub name: String,
    pub reason: String,
}
