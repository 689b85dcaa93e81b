//! Single-book delivery.
//!
//! The [`Mailer`] turns one book file into one message and hands it to a
//! [`MailTransport`]. It does not retry; that is the caller's job.

use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::Message;
use thiserror::Error;

use super::validator::{validate_book, ValidationError};
use crate::domain::{book_title, file_name_of, Credentials, ProviderProfile, BOOK_MIME_TYPE};
use crate::providers::email::{MailTransport, TransportError};

/// Errors that can occur while delivering one book.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The file is not a sendable book.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The message could not be built (bad address, unreadable file).
    #[error("failed to build message: {0}")]
    Message(String),

    /// The SMTP session failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DeliveryError {
    /// Whether another attempt could succeed.
    ///
    /// Only transport failures are worth retrying; a file or address that is
    /// wrong now will still be wrong in thirty seconds.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Transport(_))
    }
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Details of a delivered book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Subject the message was sent with.
    pub subject: String,
    /// SHA-256 of the attached file.
    pub sha256: String,
}

/// Builds the message carrying one book.
///
/// The subject is the file name without its extension, which Kindle
/// personal documents use as the title. The single attachment keeps the
/// original file name.
pub fn build_book_message(
    sender: &str,
    recipient: &str,
    file_name: &str,
    contents: Vec<u8>,
) -> Result<Message> {
    let from: Mailbox = sender
        .parse()
        .map_err(|e| DeliveryError::Message(format!("invalid sender address {sender}: {e}")))?;
    let to: Mailbox = recipient.parse().map_err(|e| {
        DeliveryError::Message(format!("invalid recipient address {recipient}: {e}"))
    })?;
    let content_type = ContentType::parse(BOOK_MIME_TYPE)
        .map_err(|e| DeliveryError::Message(format!("invalid content type: {e}")))?;

    let attachment = Attachment::new(file_name.to_string()).body(contents, content_type);

    Message::builder()
        .from(from)
        .to(to)
        .subject(book_title(file_name))
        .date_now()
        .message_id(None)
        .multipart(MultiPart::mixed().singlepart(attachment))
        .map_err(|e| DeliveryError::Message(e.to_string()))
}

/// Sends book files through a [`MailTransport`].
#[derive(Debug, Clone)]
pub struct Mailer<T> {
    transport: T,
}

impl<T: MailTransport> Mailer<T> {
    /// Creates a mailer over `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validates, packages and transmits the book at `path`.
    pub async fn try_send(
        &self,
        path: &Path,
        profile: &ProviderProfile,
        credentials: &Credentials,
        recipient: &str,
    ) -> Result<Delivered> {
        let validated = validate_book(path)?;

        let file_name = file_name_of(path)
            .ok_or_else(|| DeliveryError::Message(format!("no file name: {}", path.display())))?;
        let subject = book_title(file_name).to_string();
        tracing::debug!(file = file_name, subject = %subject, "Building message");

        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| DeliveryError::Message(format!("failed to read {}: {e}", path.display())))?;
        let message = build_book_message(credentials.username(), recipient, file_name, contents)?;

        self.transport.send(profile, credentials, message).await?;

        tracing::info!(
            file = %path.display(),
            recipient,
            provider = %profile.provider,
            "Sent"
        );
        Ok(Delivered {
            subject,
            sha256: validated.sha256,
        })
    }

    /// Sends one book and reports only whether it went out.
    ///
    /// Failures are logged, never returned.
    pub async fn send(
        &self,
        path: &Path,
        profile: &ProviderProfile,
        username: &str,
        password: &str,
        recipient: &str,
    ) -> bool {
        let credentials = Credentials::new(username, password);
        match self.try_send(path, profile, &credentials, recipient).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    file = %path.display(),
                    provider = %profile.provider,
                    error = %e,
                    "Failed to send"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Provider;
    use crate::providers::email::MockMailTransport;
    use std::fs;
    use tempfile::TempDir;

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn message_has_subject_and_single_attachment() {
        let message = build_book_message(
            "me@gmail.com",
            "reader@kindle.com",
            "Dune.epub",
            b"PK\x03\x04".to_vec(),
        )
        .unwrap();
        let text = formatted(&message);

        assert!(text.contains("Subject: Dune\r\n"));
        assert!(text.contains("From: me@gmail.com"));
        assert!(text.contains("To: reader@kindle.com"));
        assert!(text.contains("Message-ID: <"));
        assert!(text.contains("Date: "));
        assert!(text.contains("Content-Type: application/epub+zip"));
        assert_eq!(text.matches("Content-Disposition: attachment").count(), 1);
        assert!(text.contains("Dune.epub"));
    }

    #[test]
    fn message_encodes_non_ascii_names() {
        let message = build_book_message(
            "me@qq.com",
            "reader@kindle.com",
            "三体.epub",
            b"PK".to_vec(),
        )
        .unwrap();
        let text = formatted(&message);

        assert!(text.is_ascii());
        assert!(!text.contains("Subject: 三体"));
    }

    #[test]
    fn message_rejects_bad_recipient() {
        let result = build_book_message("me@gmail.com", "not an address", "a.epub", vec![]);
        assert!(matches!(result, Err(DeliveryError::Message(_))));
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        let transport = DeliveryError::Transport(TransportError::Connection("reset".into()));
        let message = DeliveryError::Message("bad".into());
        let validation = DeliveryError::Validation(ValidationError::BadSignature("x".into()));

        assert!(transport.is_retryable());
        assert!(!message.is_retryable());
        assert!(!validation.is_retryable());
    }

    #[tokio::test]
    async fn try_send_transmits_valid_book() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dune.epub");
        fs::write(&path, b"PK\x03\x04book").unwrap();

        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|profile, creds, _| {
                profile.provider == Provider::Gmail && creds.password() == "abcdefghijklmnop"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mailer = Mailer::new(transport);
        let credentials = Credentials::new("me@gmail.com", "abcd efgh ijkl mnop");
        let delivered = mailer
            .try_send(
                &path,
                &Provider::Gmail.profile(),
                &credentials,
                "reader@kindle.com",
            )
            .await
            .unwrap();

        assert_eq!(delivered.subject, "Dune");
        assert_eq!(delivered.sha256.len(), 64);
    }

    #[tokio::test]
    async fn try_send_rejects_invalid_book_without_transport() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.epub");
        fs::write(&path, b"not a zip").unwrap();

        let mut transport = MockMailTransport::new();
        transport.expect_send().never();

        let mailer = Mailer::new(transport);
        let credentials = Credentials::new("me@gmail.com", "pw");
        let result = mailer
            .try_send(&path, &Provider::Gmail.profile(), &credentials, "reader@kindle.com")
            .await;

        assert!(matches!(result, Err(DeliveryError::Validation(_))));
    }

    #[tokio::test]
    async fn send_reports_transport_failure_as_false() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.epub");
        fs::write(&path, b"PK").unwrap();

        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _, _| Err(TransportError::Connection("reset".into())));

        let mailer = Mailer::new(transport);
        let sent = mailer
            .send(
                &path,
                &Provider::Qq.profile(),
                "42@qq.com",
                "code",
                "reader@kindle.com",
            )
            .await;

        assert!(!sent);
    }
}
