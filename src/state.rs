use std::sync::Arc;

use mongodb::{Client, Database};

use crate::config::AppConfig;
use crate::services::mail_service::{
    HttpMailTransport, MailService, MailTransport, MongoEmailLog, MongoTemplateStore,
};
use crate::services::matchmaking_service::{GenerativeApiSuggester, MatchmakingService};
use crate::services::member_id_service::MemberIdService;
use crate::services::otp_service::{MongoOtpStore, OtpService};

/// Explicitly constructed service objects, wired once at startup and handed
/// to every handler through axum state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub mail: Arc<MailService>,
    pub otp: Arc<OtpService>,
    pub member_ids: Arc<MemberIdService>,
    pub matchmaking: Arc<MatchmakingService>,
}

impl AppState {
    pub fn new(client: Client, db: Database, config: AppConfig) -> Self {
        let transport: Arc<dyn MailTransport> =
            Arc::new(HttpMailTransport::new(config.mail_api_key.clone()));
        let mail = Arc::new(MailService::new(
            Arc::new(MongoTemplateStore::new(db.clone())),
            Arc::new(MongoEmailLog::new(db.clone())),
            transport,
            config.mail_from.clone(),
        ));

        let otp = Arc::new(OtpService::new(
            Arc::new(MongoOtpStore::new(db.clone())),
            config.jwt_secret.clone(),
        ));

        let member_ids = Arc::new(MemberIdService::new(
            client,
            db.clone(),
            config.member_id_prefix.clone(),
        ));

        let suggester = Arc::new(GenerativeApiSuggester::new(
            config.model_api_key.clone(),
            config.model_api_url.clone(),
        ));
        let matchmaking = Arc::new(MatchmakingService::new(db.clone(), suggester));

        AppState {
            db,
            config,
            mail,
            otp,
            member_ids,
            matchmaking,
        }
    }
}
