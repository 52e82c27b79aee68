use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::{Collection, Database, bson::doc};
use reqwest::Client;
use serde_json::json;

use crate::errors::{AppError, Result};
use crate::models::email_log::{EmailLogEntry, EmailStatus};
use crate::models::email_template::EmailTemplate;
use crate::services::template;

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html: String,
}

/// Delivery seam, so tests can substitute a recording fake for the real
/// mail-provider client.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, msg: &OutboundEmail) -> Result<()>;
}

/// Transactional-mail provider (Resend-compatible JSON API).
pub struct HttpMailTransport {
    api_key: String,
    client: Client,
}

impl HttpMailTransport {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn deliver(&self, msg: &OutboundEmail) -> Result<()> {
        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": msg.from,
                "to": [msg.to],
                "subject": msg.subject,
                "html": msg.html,
            }))
            .send()
            .await
            .map_err(|e| AppError::external_api(format!("Mail API error: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::external_api(format!(
                "Mail sending failed with status: {}",
                response.status()
            )))
        }
    }
}

/// Template lookup seam.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<EmailTemplate>>;
}

pub struct MongoTemplateStore {
    db: Database,
}

impl MongoTemplateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateStore for MongoTemplateStore {
    async fn get(&self, key: &str) -> Result<Option<EmailTemplate>> {
        let templates: Collection<EmailTemplate> = self.db.collection("email_templates");
        Ok(templates.find_one(doc! { "_id": key }).await?)
    }
}

/// Append-only audit log seam.
#[async_trait]
pub trait EmailLog: Send + Sync {
    async fn append(&self, entry: EmailLogEntry) -> Result<()>;
}

pub struct MongoEmailLog {
    db: Database,
}

impl MongoEmailLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EmailLog for MongoEmailLog {
    async fn append(&self, entry: EmailLogEntry) -> Result<()> {
        let log: Collection<EmailLogEntry> = self.db.collection("email_log");
        log.insert_one(&entry).await?;
        Ok(())
    }
}

/// Hardcoded subject/body used when no override template is configured or
/// active for a key.
#[derive(Debug, Clone, Copy)]
pub struct Fallback {
    pub subject: &'static str,
    pub body: &'static str,
}

pub(crate) enum Resolution {
    Use { subject: String, body: String },
    Skip,
    Missing,
}

pub(crate) fn resolve_template(
    stored: Option<EmailTemplate>,
    fallback: Option<Fallback>,
) -> Resolution {
    if let Some(t) = &stored {
        if t.active {
            return Resolution::Use {
                subject: t.subject.clone(),
                body: t.body.clone(),
            };
        }
    }
    // Inactive or absent: use the caller's builtin if there is one. An
    // inactive template without a builtin bypasses the send entirely.
    match (fallback, stored.is_some()) {
        (Some(f), _) => Resolution::Use {
            subject: f.subject.to_string(),
            body: f.body.to_string(),
        },
        (None, true) => Resolution::Skip,
        (None, false) => Resolution::Missing,
    }
}

pub struct MailService {
    templates: Arc<dyn TemplateStore>,
    log: Arc<dyn EmailLog>,
    transport: Arc<dyn MailTransport>,
    from: String,
}

impl MailService {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        log: Arc<dyn EmailLog>,
        transport: Arc<dyn MailTransport>,
        from: String,
    ) -> Self {
        Self {
            templates,
            log,
            transport,
            from,
        }
    }

    /// Fetches the template for `template_key`, substitutes `vars`, delivers
    /// the result, and appends an email-log entry for the attempt.
    pub async fn send_templated(
        &self,
        to: &str,
        template_key: &str,
        vars: &HashMap<String, String>,
        fallback: Option<Fallback>,
    ) -> Result<EmailStatus> {
        let stored = self.templates.get(template_key).await?;

        let (subject, body) = match resolve_template(stored, fallback) {
            Resolution::Use { subject, body } => (subject, body),
            Resolution::Skip => {
                self.record(to, template_key, EmailStatus::Skipped, None).await;
                return Ok(EmailStatus::Skipped);
            }
            Resolution::Missing => return Err(AppError::NotFound("Email template")),
        };

        let rendered = template::render(&subject, &body, vars);
        let msg = OutboundEmail {
            to: to.to_string(),
            from: self.from.clone(),
            subject: rendered.subject,
            html: rendered.body,
        };

        match self.transport.deliver(&msg).await {
            Ok(()) => {
                self.record(to, template_key, EmailStatus::Sent, None).await;
                Ok(EmailStatus::Sent)
            }
            Err(e) => {
                self.record(to, template_key, EmailStatus::Failed, Some(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    // Log-write failures are traced, never surfaced: the log is an audit
    // trail, not part of the send contract.
    async fn record(&self, to: &str, template_key: &str, status: EmailStatus, error: Option<String>) {
        let entry = EmailLogEntry {
            to: to.to_string(),
            template_key: template_key.to_string(),
            status,
            error,
            created_at: Utc::now(),
        };
        if let Err(e) = self.log.append(entry).await {
            tracing::error!("Failed to write email log entry for {}: {}", to, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn tpl(active: bool) -> EmailTemplate {
        EmailTemplate {
            key: "member_code".to_string(),
            subject: "Your code".to_string(),
            body: "Code: {{code}}".to_string(),
            active,
        }
    }

    const FALLBACK: Fallback = Fallback {
        subject: "fallback subject",
        body: "fallback body",
    };

    #[test]
    fn active_template_wins_over_fallback() {
        match resolve_template(Some(tpl(true)), Some(FALLBACK)) {
            Resolution::Use { subject, .. } => assert_eq!(subject, "Your code"),
            _ => panic!("expected stored template"),
        }
    }

    #[test]
    fn inactive_template_without_fallback_skips() {
        assert!(matches!(
            resolve_template(Some(tpl(false)), None),
            Resolution::Skip
        ));
    }

    #[test]
    fn inactive_template_with_fallback_uses_fallback() {
        match resolve_template(Some(tpl(false)), Some(FALLBACK)) {
            Resolution::Use { subject, .. } => assert_eq!(subject, "fallback subject"),
            _ => panic!("expected fallback"),
        }
    }

    #[test]
    fn missing_template_without_fallback_is_missing() {
        assert!(matches!(resolve_template(None, None), Resolution::Missing));
    }

    #[derive(Default)]
    struct FakeTransport {
        fail: bool,
        sent: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl MailTransport for FakeTransport {
        async fn deliver(&self, msg: &OutboundEmail) -> Result<()> {
            if self.fail {
                return Err(AppError::external_api("wire down"));
            }
            self.sent.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }

    struct MemoryTemplates(Option<EmailTemplate>);

    #[async_trait]
    impl TemplateStore for MemoryTemplates {
        async fn get(&self, _key: &str) -> Result<Option<EmailTemplate>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct MemoryLog(Mutex<Vec<EmailLogEntry>>);

    #[async_trait]
    impl EmailLog for MemoryLog {
        async fn append(&self, entry: EmailLogEntry) -> Result<()> {
            self.0.lock().unwrap().push(entry);
            Ok(())
        }
    }

    fn service(
        stored: Option<EmailTemplate>,
        fail: bool,
    ) -> (MailService, Arc<FakeTransport>, Arc<MemoryLog>) {
        let transport = Arc::new(FakeTransport {
            fail,
            sent: Mutex::new(Vec::new()),
        });
        let log = Arc::new(MemoryLog::default());
        let service = MailService::new(
            Arc::new(MemoryTemplates(stored)),
            log.clone(),
            transport.clone(),
            "Founder Pass <hello@founderpass.app>".to_string(),
        );
        (service, transport, log)
    }

    fn vars() -> HashMap<String, String> {
        HashMap::from([("code".to_string(), "123456".to_string())])
    }

    #[tokio::test]
    async fn delivered_send_is_rendered_and_logged_sent() {
        let (service, transport, log) = service(Some(tpl(true)), false);

        let status = service
            .send_templated("jane@x.com", "member_code", &vars(), None)
            .await
            .unwrap();

        assert_eq!(status, EmailStatus::Sent);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].html, "Code: 123456");
        let entries = log.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, EmailStatus::Sent);
        assert!(entries[0].error.is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_logged_with_error_text() {
        let (service, _transport, log) = service(Some(tpl(true)), true);

        let result = service
            .send_templated("jane@x.com", "member_code", &vars(), None)
            .await;

        assert!(matches!(result, Err(AppError::ExternalApi(_))));
        let entries = log.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, EmailStatus::Failed);
        assert!(entries[0].error.as_deref().unwrap().contains("wire down"));
    }

    #[tokio::test]
    async fn inactive_template_bypasses_delivery() {
        let (service, transport, log) = service(Some(tpl(false)), false);

        let status = service
            .send_templated("jane@x.com", "member_code", &vars(), None)
            .await
            .unwrap();

        assert_eq!(status, EmailStatus::Skipped);
        assert!(transport.sent.lock().unwrap().is_empty());
        let entries = log.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, EmailStatus::Skipped);
    }
}
