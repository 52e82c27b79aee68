use std::collections::HashMap;

use axum::{extract::State, response::Json};
use mongodb::{Collection, bson::doc};
use validator::Validate;

use crate::dtos::auth_dtos::{
    MagicLinkRequest, RequestCodeRequest, RequestCodeResponse, VerifyCodeRequest,
    VerifyCodeResponse,
};
use crate::errors::{AppError, Result};
use crate::models::application::Application;
use crate::services::notifications::{MAGIC_LINK_FALLBACK, MEMBER_CODE_FALLBACK};
use crate::services::otp_service::{normalize_email, MAGIC_LINK_TTL_MINUTES, OTP_TTL_MINUTES};
use crate::state::AppState;

/// Only accepted members may request a code. A non-member email gets a
/// permission-denied rather than a generic not-found; that this confirms
/// address existence is a deliberate product trade-off.
async fn find_accepted_member(state: &AppState, email: &str) -> Result<Application> {
    let applications: Collection<Application> = state.db.collection("applications");

    applications
        .find_one(doc! { "email": email, "status": "accepted" })
        .await?
        .ok_or(AppError::PermissionDenied(
            "Only approved members may sign in",
        ))
}

pub async fn request_code(
    State(state): State<AppState>,
    Json(payload): Json<RequestCodeRequest>,
) -> Result<Json<RequestCodeResponse>> {
    payload.validate()?;

    let email = normalize_email(&payload.email);
    let member = find_accepted_member(&state, &email).await?;

    let application_id = member
        ._id
        .ok_or_else(|| AppError::internal("Application missing _id"))?;
    let member_id = member.member_id.clone().unwrap_or_default();

    // Code is persisted before the send; if the mail provider fails, a retry
    // overwrites and resends.
    let record = state.otp.issue(&email, application_id, &member_id).await?;

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("name".to_string(), member.name.clone());
    vars.insert("code".to_string(), record.code.clone());
    vars.insert("expires_minutes".to_string(), OTP_TTL_MINUTES.to_string());

    state
        .mail
        .send_templated(&email, "member_code", &vars, Some(MEMBER_CODE_FALLBACK))
        .await?;

    Ok(Json(RequestCodeResponse {
        success: true,
        message: "Code sent".to_string(),
    }))
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>> {
    payload.validate()?;

    let email = normalize_email(&payload.email);
    let verified = state.otp.verify(&email, &payload.code).await?;

    Ok(Json(VerifyCodeResponse {
        success: true,
        token: verified.token,
        application_id: verified.application_id.to_hex(),
        member_id: verified.member_id,
    }))
}

pub async fn magic_link(
    State(state): State<AppState>,
    Json(payload): Json<MagicLinkRequest>,
) -> Result<Json<RequestCodeResponse>> {
    payload.validate()?;

    let email = normalize_email(&payload.email);
    let member = find_accepted_member(&state, &email).await?;

    let application_id = member
        ._id
        .ok_or_else(|| AppError::internal("Application missing _id"))?;
    let member_id = member.member_id.clone().unwrap_or_default();

    let token =
        state
            .otp
            .mint_member_token(&application_id, &member_id, MAGIC_LINK_TTL_MINUTES)?;
    let link = format!("{}/auth?token={}", state.config.app_base_url, token);

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("name".to_string(), member.name.clone());
    vars.insert("link".to_string(), link);
    vars.insert(
        "expires_minutes".to_string(),
        MAGIC_LINK_TTL_MINUTES.to_string(),
    );

    state
        .mail
        .send_templated(&email, "magic_link", &vars, Some(MAGIC_LINK_FALLBACK))
        .await?;

    Ok(Json(RequestCodeResponse {
        success: true,
        message: "Sign-in link sent".to_string(),
    }))
}
