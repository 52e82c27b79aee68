use std::collections::HashMap;

use crate::models::application::{Application, ApplicationStatus};
use crate::services::mail_service::{Fallback, MailService};

/// Status-change notifications, invoked explicitly from the write paths that
/// mutate an application. Failures here are logged, never propagated: the
/// status transition itself must not roll back because an email did not go
/// out.

pub fn template_for_status(status: ApplicationStatus) -> Option<&'static str> {
    match status {
        ApplicationStatus::New => Some("application_received"),
        ApplicationStatus::Accepted => Some("application_accepted"),
        ApplicationStatus::Rejected => Some("application_rejected"),
        ApplicationStatus::Pending | ApplicationStatus::Review => None,
    }
}

pub async fn on_status_changed(mail: &MailService, app: &Application) {
    let Some(template_key) = template_for_status(app.status) else {
        return;
    };

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("name".to_string(), app.name.clone());
    vars.insert("email".to_string(), app.email.clone());
    vars.insert("status".to_string(), app.status.as_str().to_string());
    if let Some(member_id) = &app.member_id {
        vars.insert("member_id".to_string(), member_id.clone());
    }

    if let Err(e) = mail.send_templated(&app.email, template_key, &vars, None).await {
        tracing::error!(
            "Status notification '{}' to {} failed: {}",
            template_key,
            app.email,
            e
        );
    }
}

pub const MEMBER_CODE_FALLBACK: Fallback = Fallback {
    subject: "Your Founder Pass sign-in code",
    body: "<p>Hi {{name}},</p>\
           <p>Your sign-in code is <strong>{{code}}</strong>. \
           It expires in {{expires_minutes}} minutes.</p>",
};

pub const MAGIC_LINK_FALLBACK: Fallback = Fallback {
    subject: "Your Founder Pass sign-in link",
    body: "<p>Hi {{name}},</p>\
           <p><a href=\"{{link}}\">Click here to sign in</a>. \
           The link expires in {{expires_minutes}} minutes.</p>",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_map_to_templates() {
        assert_eq!(
            template_for_status(ApplicationStatus::New),
            Some("application_received")
        );
        assert_eq!(
            template_for_status(ApplicationStatus::Accepted),
            Some("application_accepted")
        );
        assert_eq!(
            template_for_status(ApplicationStatus::Rejected),
            Some("application_rejected")
        );
    }

    #[test]
    fn intermediate_statuses_send_nothing() {
        assert_eq!(template_for_status(ApplicationStatus::Pending), None);
        assert_eq!(template_for_status(ApplicationStatus::Review), None);
    }
}
