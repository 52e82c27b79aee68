use axum::{routing::post, Router};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(crate::handlers::applications::submit_application))
}
