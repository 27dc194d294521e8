//! Admin notification sink. Sign-up emits one pending-signup event; the
//! sink delivers it as an email to the administrator. Delivery is
//! fire-and-forget and never fails the sign-up itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use site_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::NotificationSettings;

/// Event emitted when a profile is created in the pending queue.
#[derive(Debug, Clone)]
pub struct PendingSignup {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingSignup {
    /// Display name when given, otherwise the email address.
    pub fn who(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_pending_signup(&self, event: &PendingSignup) -> Result<(), AppError>;
}

/// SMTP-backed sink sending the admin an HTML alert.
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from_email: String,
    admin_email: String,
    public_base_url: String,
}

impl SmtpNotifier {
    pub fn new(settings: &NotificationSettings, public_base_url: String) -> Result<Self, AppError> {
        let creds = Credentials::new(
            settings.smtp_user.clone(),
            settings.smtp_password.expose_secret().clone(),
        );

        let mailer = SmtpTransport::relay(&settings.smtp_host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %settings.smtp_host, "Notification mailer initialized");

        Ok(Self {
            mailer,
            from_email: settings.from_email.clone(),
            admin_email: settings.admin_email.clone(),
            public_base_url,
        })
    }

    fn html_body(&self, event: &PendingSignup) -> String {
        let name = event.display_name.as_deref().unwrap_or("—");
        let signed_up = event.created_at.format("%d %B %Y, %H:%M UTC");
        let admin_url = format!("{}/members/admin", self.public_base_url);

        format!(
            r#"<html>
<body style="font-family: sans-serif;">
  <h2>New member sign-up</h2>
  <p>A new member has signed up and is awaiting your approval.</p>
  <table>
    <tr><td>Name</td><td><strong>{name}</strong></td></tr>
    <tr><td>Email</td><td>{email}</td></tr>
    <tr><td>Signed up</td><td>{signed_up}</td></tr>
  </table>
  <p><a href="{admin_url}">Review in Admin Panel</a></p>
  <p style="color: #999; font-size: 0.8rem;">Log in to approve or reject this request.</p>
</body>
</html>"#,
            name = name,
            email = event.email,
            signed_up = signed_up,
            admin_url = admin_url,
        )
    }
}

#[async_trait]
impl NotificationSink for SmtpNotifier {
    async fn notify_pending_signup(&self, event: &PendingSignup) -> Result<(), AppError> {
        let subject = format!("New member sign-up: {}", event.who());
        let plain_body = format!(
            "{} ({}) signed up and is awaiting approval.\nReview at {}/members/admin",
            event.who(),
            event.email,
            self.public_base_url
        );
        let html_body = self.html_body(event);

        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::EmailError(e.to_string()),
            )?)
            .to(self.admin_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::EmailError(e.to_string()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        // Blocking SMTP transport, kept off the async runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(
                    to = %self.admin_email,
                    user_id = %event.user_id,
                    "Pending sign-up notification sent"
                );
                Ok(())
            }
            Err(e) => Err(AppError::EmailError(e.to_string())),
        }
    }
}

/// Sink that only logs, for local runs without SMTP credentials.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify_pending_signup(&self, event: &PendingSignup) -> Result<(), AppError> {
        tracing::info!(
            user_id = %event.user_id,
            email = %event.email,
            "New pending sign-up (notifications disabled)"
        );
        Ok(())
    }
}

/// Emit the event without tying the caller to its outcome.
pub fn spawn_notify(sink: Arc<dyn NotificationSink>, event: PendingSignup) {
    tokio::spawn(async move {
        if let Err(e) = sink.notify_pending_signup(&event).await {
            tracing::warn!(
                user_id = %event.user_id,
                error = %e,
                "Failed to notify admin of pending sign-up"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn who_falls_back_to_email() {
        let mut event = PendingSignup {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            display_name: Some("Alice Example".into()),
            created_at: Utc::now(),
        };
        assert_eq!(event.who(), "Alice Example");

        event.display_name = None;
        assert_eq!(event.who(), "alice@example.com");
    }
}
