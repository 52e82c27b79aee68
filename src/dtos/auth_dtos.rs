use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RequestCodeRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

/// Success acknowledgement only; the code itself is never returned.
#[derive(Debug, Serialize)]
pub struct RequestCodeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub token: String,
    pub application_id: String,
    pub member_id: String,
}
