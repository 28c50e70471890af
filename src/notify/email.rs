use std::path::PathBuf;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

use super::{chime, Notifier};
use crate::config::{ConfigChime, ConfigSmtp};

/// Sends the captured images as one email with an attachment per file, then
/// plays the chime.
pub struct EmailNotifier {
    smtp: ConfigSmtp,
    chime: ConfigChime,
}

impl EmailNotifier {
    pub fn new(smtp: ConfigSmtp, chime: ConfigChime) -> EmailNotifier {
        EmailNotifier { smtp, chime }
    }

    async fn build_message(&self, frames: &[PathBuf]) -> Result<Message, NotifyError> {
        let sender: Mailbox = self.smtp.sender.parse().map_err(NotifyError::Address)?;
        let recipient: Mailbox = self.smtp.recipient.parse().map_err(NotifyError::Address)?;
        let content_type =
            ContentType::parse("application/octet-stream").map_err(NotifyError::ContentType)?;

        let mut body = MultiPart::mixed().build();
        for path in frames {
            let contents = tokio::fs::read(path)
                .await
                .map_err(|e| NotifyError::Attachment(path.display().to_string(), e))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "frame.jpg".to_string());
            body = body.singlepart(Attachment::new(filename).body(contents, content_type.clone()));
        }

        Message::builder()
            .from(sender)
            .to(recipient)
            .subject(format!(
                "Doorbell Alert: {} Images Captured",
                frames.len()
            ))
            .multipart(body)
            .map_err(NotifyError::Message)
    }

    async fn send(&self, frames: &[PathBuf]) -> Result<(), NotifyError> {
        let message = self.build_message(frames).await?;
        // The SMTP connection lives for exactly one delivery.
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp.server)
            .map_err(NotifyError::Smtp)?
            .port(self.smtp.port)
            .credentials(Credentials::new(
                self.smtp.username.clone(),
                self.smtp.password.clone(),
            ))
            .build();
        mailer.send(message).await.map_err(NotifyError::Smtp)?;
        Ok(())
    }
}

impl Notifier for EmailNotifier {
    async fn deliver(&self, frames: &[PathBuf]) {
        match self.send(frames).await {
            Ok(()) => {
                info!("Email sent to {}", self.smtp.recipient);
                if let Err(e) = chime::play(&self.chime.player, &self.chime.file).await {
                    // The notification already went out; a silent chime is
                    // only worth a warning.
                    warn!("Doorbell chime failed: {}", e);
                }
            }
            Err(e) => error!("Error sending email: {}", e),
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum NotifyError {
        Address(error: lettre::address::AddressError) {
            display("Sender or recipient address invalid: {}", error)
            source(error)
        }
        ContentType(error: lettre::message::header::ContentTypeErr) {
            display("Attachment content type invalid: {}", error)
        }
        Attachment(path: String, error: std::io::Error) {
            display("Unable to read attachment {}: {}", path, error)
            source(error)
        }
        Message(error: lettre::error::Error) {
            display("Unable to assemble email: {}", error)
            source(error)
        }
        Smtp(error: lettre::transport::smtp::Error) {
            display("SMTP delivery failed: {}", error)
            source(error)
        }
    }
}
