//! Mail transport trait definition.
//!
//! This module defines the [`MailTransport`] trait which abstracts over the
//! SMTP session used to reach a provider. The delivery services only talk to
//! this trait, so they can be exercised without a network.

use async_trait::async_trait;
use lettre::Message;

use crate::domain::{Credentials, ProviderProfile};

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while talking to an SMTP server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server could not be reached or the connection dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other protocol or server error.
    #[error("provider error: {0}")]
    Provider(String),
}

impl TransportError {
    /// Returns true for rejected credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, TransportError::Authentication(_))
    }

    /// Returns true for failures to reach the server.
    pub fn is_connection(&self) -> bool {
        matches!(self, TransportError::Connection(_))
    }
}

/// An authenticated SMTP session factory.
///
/// Each call opens its own session, authenticates, performs its work and
/// closes the session again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Connects and authenticates without sending anything.
    async fn check_session(
        &self,
        profile: &ProviderProfile,
        credentials: &Credentials,
    ) -> Result<()>;

    /// Connects, authenticates and transmits `message`.
    async fn send(
        &self,
        profile: &ProviderProfile,
        credentials: &Credentials,
        message: Message,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(TransportError::Authentication("535".into()).is_authentication());
        assert!(!TransportError::Authentication("535".into()).is_connection());
        assert!(TransportError::Connection("refused".into()).is_connection());
        assert!(!TransportError::Provider("552".into()).is_connection());
    }

    #[test]
    fn error_display() {
        let err = TransportError::Connection("timed out".into());
        assert_eq!(err.to_string(), "connection error: timed out");
    }
}
