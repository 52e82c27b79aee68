use axum::{routing::get, Router};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pass/:id", get(crate::handlers::pass::pass_page))
        .route("/p/:id", get(crate::handlers::pass::pass_page))
}
