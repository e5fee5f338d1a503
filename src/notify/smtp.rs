//! SMTP delivery over STARTTLS.
use super::{Digest, MailTransport};
use crate::config::MailSettings;
use anyhow::{Context, Result};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

pub struct SmtpMailer {
    settings: MailSettings,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(settings: MailSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    fn message(&self, digest: &Digest) -> Result<Message> {
        let from: Mailbox = self
            .settings
            .sender
            .parse()
            .with_context(|| format!("parse sender address {:?}", self.settings.sender))?;
        let mut builder = Message::builder().from(from).subject(digest.subject.clone());
        for recipient in &self.settings.recipients {
            let to: Mailbox = recipient
                .parse()
                .with_context(|| format!("parse recipient address {recipient:?}"))?;
            builder = builder.to(to);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                digest.text.clone(),
                digest.html.clone(),
            ))
            .context("build digest message")
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, digest: &Digest) -> Result<()> {
        let message = self.message(digest)?;
        let mailer = SmtpTransport::starttls_relay(&self.settings.server)
            .with_context(|| format!("configure SMTP relay {}", self.settings.server))?
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.username.clone(),
                self.settings.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();
        mailer.send(&message).context("send digest over SMTP")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(recipients: &[&str]) -> MailSettings {
        MailSettings {
            server: "smtp.example.org".to_string(),
            port: 587,
            username: "robot@example.org".to_string(),
            password: "secret".to_string(),
            sender: "robot@example.org".to_string(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn digest() -> Digest {
        Digest {
            subject: "Notificación Rama Judicial (1 cambio)".to_string(),
            html: "<p>hola</p>".to_string(),
            text: "hola".to_string(),
        }
    }

    #[test]
    fn builds_message_for_every_recipient() {
        let mailer = SmtpMailer::new(
            settings(&["a@example.org", "b@example.org"]),
            Duration::from_secs(5),
        );
        let message = mailer.message(&digest()).expect("message");
        let raw = String::from_utf8(message.formatted()).expect("utf8 message");
        assert!(raw.contains("a@example.org"));
        assert!(raw.contains("b@example.org"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn rejects_invalid_recipient() {
        let mailer = SmtpMailer::new(settings(&["not an address"]), Duration::from_secs(5));
        assert!(mailer.message(&digest()).is_err());
    }
}
