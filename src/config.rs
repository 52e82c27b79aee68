// config.rs
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub app_base_url: String,
    pub model_api_key: String,
    pub model_api_url: String,
    pub member_id_prefix: String,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        AppConfig {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            mail_api_key: env::var("MAIL_API_KEY").unwrap_or_default(),
            // Fallback sender identity if unset
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Founder Pass <hello@founderpass.app>".to_string()),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "https://founderpass.app".to_string()),
            model_api_key: env::var("MODEL_API_KEY").unwrap_or_default(),
            model_api_url: env::var("MODEL_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            member_id_prefix: env::var("MEMBER_ID_PREFIX")
                .unwrap_or_else(|_| "FP".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .expect("PORT must be a number"),
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
        }
    }
}
