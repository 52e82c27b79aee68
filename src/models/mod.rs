pub mod application;
pub mod otp;

pub(crate) mod email_log;
pub(crate) mod email_template;
pub(crate) mod matches;
