pub(crate) mod admin_dtos;
pub(crate) mod application_dtos;
pub(crate) mod auth_dtos;
