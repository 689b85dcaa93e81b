//! SMTP transport implementation.
//!
//! Uses `lettre` for the protocol. Gmail is reached over STARTTLS on port
//! 587, QQ Mail over implicit TLS on port 465; the choice comes from the
//! [`ProviderProfile`] and is never re-derived here.

use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailTransport, Result, TransportError};
use crate::domain::{Credentials, ProviderProfile, SecurityMode};

/// Reply codes meaning the server refused the login.
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// [`MailTransport`] backed by a real SMTP connection.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    timeout: Duration,
}

impl SmtpTransport {
    /// Network timeout applied to every session.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a transport with the default timeout.
    pub fn new() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Creates a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn mailer(
        &self,
        profile: &ProviderProfile,
        credentials: &Credentials,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let smtp_credentials = SmtpCredentials::new(
            credentials.username().to_string(),
            credentials.password().to_string(),
        );

        let builder = match profile.security {
            SecurityMode::ImplicitTls => AsyncSmtpTransport::<Tokio1Executor>::relay(profile.host),
            SecurityMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(profile.host)
            }
        }
        .map_err(|e| TransportError::Connection(format!("SMTP relay error: {}", e)))?;

        Ok(builder
            .credentials(smtp_credentials)
            .port(profile.port)
            .timeout(Some(self.timeout))
            .build())
    }
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn check_session(
        &self,
        profile: &ProviderProfile,
        credentials: &Credentials,
    ) -> Result<()> {
        let mailer = self.mailer(profile, credentials)?;

        match mailer.test_connection().await {
            Ok(true) => {
                tracing::debug!(host = profile.host, port = profile.port, "SMTP session check passed");
                Ok(())
            }
            Ok(false) => Err(TransportError::Connection(format!(
                "{}:{} did not answer after login",
                profile.host, profile.port
            ))),
            Err(e) => Err(classify(e)),
        }
    }

    async fn send(
        &self,
        profile: &ProviderProfile,
        credentials: &Credentials,
        message: Message,
    ) -> Result<()> {
        let mailer = self.mailer(profile, credentials)?;

        let response = mailer.send(message).await.map_err(classify)?;

        tracing::info!(
            host = profile.host,
            code = %response.code(),
            "Message accepted by SMTP server"
        );
        Ok(())
    }
}

/// Maps a `lettre` error onto the failure classes the services care about.
fn classify(err: SmtpError) -> TransportError {
    let detail = err.to_string();

    if let Some(code) = err.status() {
        if AUTH_FAILURE_CODES.contains(&code.to_string().as_str()) {
            return TransportError::Authentication(detail);
        }
    }

    if err.is_response() || err.is_client() {
        TransportError::Provider(detail)
    } else {
        TransportError::Connection(detail)
    }
}
