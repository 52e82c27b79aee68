pub(crate) mod admin;
pub(crate) mod applications;
pub(crate) mod auth_otp_routes;
pub(crate) mod pass;
