//! Outbound email
//!
//! Sends contact-form notifications to the site owner and confirmations to
//! the submitter. Delivery is best effort: the contact submission is
//! already stored before any mail is attempted, and send failures are
//! logged rather than surfaced to the visitor.

use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::{MailConfig, SiteConfig};
use crate::models::ContactSubmission;

/// SMTP mailer built from static configuration.
pub struct Mailer {
    mail: MailConfig,
    site: SiteConfig,
}

impl Mailer {
    pub fn new(mail: MailConfig, site: SiteConfig) -> Self {
        Self { mail, site }
    }

    pub fn is_enabled(&self) -> bool {
        self.mail.enabled && !self.mail.smtp_host.is_empty()
    }

    /// Notify the site owner about a new contact submission.
    ///
    /// Returns `Ok(false)` when mail is disabled or no recipient is
    /// configured, `Ok(true)` after a successful send.
    pub async fn send_contact_notification(&self, submission: &ContactSubmission) -> Result<bool> {
        if !self.is_enabled() || self.site.admin_email.is_empty() {
            return Ok(false);
        }

        let subject = format!("[{}] New contact from {}", self.site.name, submission.name);
        let body = format!(
            "New contact form submission\n\n\
             Name: {}\n\
             Email: {}\n\
             Phone: {}\n\
             Submitted: {}\n\n\
             Message:\n{}\n",
            submission.name,
            submission.email,
            submission.phone.as_deref().unwrap_or("-"),
            submission.submitted_at.format("%Y-%m-%d %H:%M UTC"),
            submission.message,
        );

        self.send(&self.site.admin_email, &subject, &body).await?;
        Ok(true)
    }

    /// Send the submitter a receipt confirmation.
    pub async fn send_contact_confirmation(&self, submission: &ContactSubmission) -> Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }

        let subject = format!("[{}] We received your message", self.site.name);
        let body = format!(
            "Hello {},\n\n\
             Thank you for contacting {}. We received your message and will\n\
             get back to you as soon as possible.\n\n\
             Your message:\n{}\n\n\
             {} team\n",
            submission.name, self.site.name, submission.message, self.site.name,
        );

        self.send(&submission.email, &subject, &body).await?;
        Ok(true)
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let from = format!("{} <{}>", self.site.name, self.mail.from);
        let email = Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let creds = Credentials::new(
            self.mail.smtp_username.clone(),
            self.mail.smtp_password.clone(),
        );
        let transport: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.mail.smtp_host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                .credentials(creds)
                .port(self.mail.smtp_port)
                .build();

        transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        info!(to = %to, subject = %subject, "sent email");
        Ok(())
    }
}

/// Fire both contact emails without letting failures propagate.
pub async fn notify_contact_best_effort(mailer: &Mailer, submission: &ContactSubmission) {
    if let Err(e) = mailer.send_contact_notification(submission).await {
        warn!(error = %e, "contact notification email failed");
    }
    if let Err(e) = mailer.send_contact_confirmation(submission).await {
        warn!(error = %e, "contact confirmation email failed");
    }
}
