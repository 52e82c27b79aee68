use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use futures_util::TryStreamExt;
use mongodb::{
    Collection,
    bson::{self, doc, oid::ObjectId},
};
use serde::Deserialize;
use validator::Validate;

use crate::dtos::admin_dtos::{MatchmakingRunResponse, SendEmailRequest, SendEmailResponse};
use crate::dtos::application_dtos::{ApplicationResponse, UpdateStatusRequest};
use crate::errors::{AppError, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::services::notifications;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ApplicationResponse>>> {
    let collection: Collection<Application> = state.db.collection("applications");

    let filter = match &query.status {
        Some(status) => {
            parse_status(status)?;
            doc! { "status": status }
        }
        None => doc! {},
    };

    let applications: Vec<Application> = collection.find(filter).await?.try_collect().await?;

    Ok(Json(
        applications
            .iter()
            .map(ApplicationResponse::from_model)
            .collect(),
    ))
}

fn parse_status(raw: &str) -> Result<ApplicationStatus> {
    match raw {
        "new" => Ok(ApplicationStatus::New),
        "pending" => Ok(ApplicationStatus::Pending),
        "review" => Ok(ApplicationStatus::Review),
        "accepted" => Ok(ApplicationStatus::Accepted),
        "rejected" => Ok(ApplicationStatus::Rejected),
        other => Err(AppError::invalid_argument(format!(
            "Unknown status: {}",
            other
        ))),
    }
}

/// Status transition. On acceptance the member-ID allocator runs first, so
/// the notification already carries the assigned identifier. Notification
/// failures never roll the transition back.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationResponse>> {
    let application_id = ObjectId::parse_str(&id)?;
    let status = parse_status(&payload.status)?;

    let collection: Collection<Application> = state.db.collection("applications");
    collection
        .find_one(doc! { "_id": application_id })
        .await?
        .ok_or(AppError::NotFound("Application"))?;

    if status == ApplicationStatus::Accepted {
        state.member_ids.allocate(&application_id).await?;
    }

    let now = bson::DateTime::from_millis(chrono::Utc::now().timestamp_millis());
    collection
        .update_one(
            doc! { "_id": application_id },
            doc! { "$set": { "status": status.as_str(), "updated_at": now } },
        )
        .await?;

    let updated = collection
        .find_one(doc! { "_id": application_id })
        .await?
        .ok_or(AppError::NotFound("Application"))?;

    notifications::on_status_changed(&state.mail, &updated).await;

    Ok(Json(ApplicationResponse::from_model(&updated)))
}

pub async fn send_admin_email(
    State(state): State<AppState>,
    Json(payload): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>> {
    payload.validate()?;

    let status = state
        .mail
        .send_templated(&payload.to, &payload.template_key, &payload.vars, None)
        .await?;

    Ok(Json(SendEmailResponse {
        success: true,
        status: format!("{:?}", status).to_lowercase(),
    }))
}

pub async fn run_matchmaking(
    State(state): State<AppState>,
) -> Result<Json<MatchmakingRunResponse>> {
    let members_matched = state.matchmaking.run().await?;

    Ok(Json(MatchmakingRunResponse {
        success: true,
        members_matched,
    }))
}
