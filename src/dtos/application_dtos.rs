use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::application::Application;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApplicationRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<String>,
    pub looking_for: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
}

impl ApplicationResponse {
    pub fn from_model(app: &Application) -> Self {
        ApplicationResponse {
            id: app._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: app.name.clone(),
            email: app.email.clone(),
            status: app.status.as_str().to_string(),
            member_id: app.member_id.clone(),
        }
    }
}
