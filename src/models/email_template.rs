use serde::{Deserialize, Serialize};

/// Stored subject/body pair with `{{token}}` placeholders. Read-only from
/// the sender's perspective.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EmailTemplate {
    /// Template key.
    #[serde(rename = "_id")]
    pub key: String,
    pub subject: String,
    pub body: String,
    pub active: bool,
}
