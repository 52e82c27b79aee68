use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use mongodb::{
    Collection,
    bson::{doc, oid::ObjectId},
};

use crate::errors::Result;
use crate::models::application::{Application, ApplicationStatus};
use crate::state::AppState;

const PASS_SHELL: &str = include_str!("../../static/pass.html");
const META_MARKER: &str = "<!-- social-preview -->";

/// Unauthenticated pass page: `/pass/{id}` or `/p/{id}` where `{id}` is the
/// member identifier (fallback: document id hex). Unknown or not-accepted
/// identifiers redirect home instead of 404ing, so stale share links fail
/// soft.
pub async fn pass_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let applications: Collection<Application> = state.db.collection("applications");

    let mut member = applications.find_one(doc! { "member_id": &id }).await?;
    if member.is_none() {
        if let Ok(oid) = ObjectId::parse_str(&id) {
            member = applications.find_one(doc! { "_id": oid }).await?;
        }
    }

    let member = match member {
        Some(m) if m.status == ApplicationStatus::Accepted => m,
        _ => return Ok(Redirect::to("/").into_response()),
    };

    Ok(Html(render_pass_page(&member, &state.config.app_base_url)).into_response())
}

fn render_pass_page(member: &Application, base_url: &str) -> String {
    let member_id = member.member_id.as_deref().unwrap_or("");
    let title = format!("{} · Founder Pass {}", member.name, member_id);
    let description = match (&member.role, &member.company) {
        (Some(role), Some(company)) => format!("{} at {}", role, company),
        (Some(role), None) => role.clone(),
        (None, Some(company)) => company.clone(),
        (None, None) => "Founder Pass member".to_string(),
    };
    let url = format!("{}/pass/{}", base_url, member_id);

    let meta = format!(
        r#"<meta property="og:title" content="{title}">
    <meta property="og:description" content="{description}">
    <meta property="og:url" content="{url}">
    <meta property="og:type" content="profile">
    <meta name="twitter:card" content="summary">"#,
        title = escape_attr(&title),
        description = escape_attr(&description),
        url = escape_attr(&url),
    );

    PASS_SHELL.replace(META_MARKER, &meta)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
