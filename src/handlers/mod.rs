pub(crate) mod admin;
pub(crate) mod applications;
pub(crate) mod auth_otp;
pub(crate) mod pass;
