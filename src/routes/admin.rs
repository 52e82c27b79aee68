use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::middleware::auth::require_admin;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/applications", get(crate::handlers::admin::list_applications))
        .route(
            "/applications/:id/status",
            put(crate::handlers::admin::update_status),
        )
        .route("/email", post(crate::handlers::admin::send_admin_email))
        .route(
            "/matchmaking/run",
            post(crate::handlers::admin::run_matchmaking),
        )
        .layer(from_fn_with_state(state, require_admin))
}
