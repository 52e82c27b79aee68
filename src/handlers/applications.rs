use axum::{extract::State, response::Json};
use chrono::Utc;
use mongodb::{Collection, bson::doc};
use validator::Validate;

use crate::dtos::application_dtos::{ApplicationResponse, CreateApplicationRequest};
use crate::errors::{AppError, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::services::notifications;
use crate::services::otp_service::normalize_email;
use crate::state::AppState;

/// Public intake: one document written per submission, then the received
/// notification fires off the write path.
pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<CreateApplicationRequest>,
) -> Result<Json<ApplicationResponse>> {
    payload.validate()?;

    let collection: Collection<Application> = state.db.collection("applications");
    let email = normalize_email(&payload.email);

    let existing = collection.find_one(doc! { "email": &email }).await?;
    if existing.is_some() {
        return Err(AppError::invalid_argument(
            "An application with this email already exists",
        ));
    }

    let now = Utc::now();
    let mut application = Application {
        _id: None,
        name: payload.name.trim().to_string(),
        email,
        company: payload.company,
        role: payload.role,
        status: ApplicationStatus::New,
        member_id: None,
        bio: payload.bio,
        interests: payload.interests,
        looking_for: payload.looking_for,
        created_at: now,
        updated_at: now,
    };

    let insert_result = collection.insert_one(&application).await?;
    application._id = insert_result.inserted_id.as_object_id();

    notifications::on_status_changed(&state.mail, &application).await;

    Ok(Json(ApplicationResponse::from_model(&application)))
}
