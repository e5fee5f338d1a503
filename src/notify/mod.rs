//! Change notification.
//!
//! One digest per run; the transport is behind a trait so runs can be tested
//! and dry-run without a mail server.
pub mod digest;
mod smtp;

use crate::model::ChangeEvent;
use anyhow::Result;

pub use digest::{format_digest, Digest};
pub use smtp::SmtpMailer;

/// Delivers a rendered digest.
pub trait MailTransport {
    fn send(&self, digest: &Digest) -> Result<()>;
}

/// Formats and sends the run digest.
pub struct Notifier<'a> {
    transport: &'a dyn MailTransport,
    spreadsheet_id: Option<String>,
}

impl<'a> Notifier<'a> {
    pub fn new(transport: &'a dyn MailTransport, spreadsheet_id: Option<String>) -> Self {
        Self {
            transport,
            spreadsheet_id,
        }
    }

    pub fn render(&self, events: &[ChangeEvent]) -> Digest {
        format_digest(events, self.spreadsheet_id.as_deref())
    }

    /// Send one digest covering every event.
    pub fn notify(&self, events: &[ChangeEvent]) -> Result<()> {
        let digest = self.render(events);
        self.transport.send(&digest)?;
        tracing::info!(events = events.len(), subject = %digest.subject, "digest sent");
        Ok(())
    }
}
