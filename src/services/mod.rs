pub(crate) mod mail_service;
pub(crate) mod matchmaking_service;
pub(crate) mod member_id_service;
pub(crate) mod notifications;
pub(crate) mod otp_service;
pub(crate) mod template;
