use axum::{
    routing::post,
    Router,
};

use crate::{
    handlers::auth_otp,
    state::AppState,
};

pub fn auth_otp_routes() -> Router<AppState> {
    Router::new()
        // Request a one-time sign-in code
        .route("/request-code", post(auth_otp::request_code))

        // Exchange the code for a member bearer token
        .route("/verify-code", post(auth_otp::verify_code))

        // Email a tokenized sign-in link instead of a code
        .route("/magic-link", post(auth_otp::magic_link))
}
