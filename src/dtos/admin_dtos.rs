use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailRequest {
    #[validate(email(message = "A valid recipient email is required"))]
    pub to: String,
    #[validate(length(min = 1, message = "Template key is required"))]
    pub template_key: String,
    #[serde(default)]
    pub vars: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MatchmakingRunResponse {
    pub success: bool,
    pub members_matched: u64,
}
