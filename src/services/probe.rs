//! SMTP connectivity probe.
//!
//! Before a batch starts the provider is checked once: connect, log in and
//! hang up. Rejected credentials end the probe immediately; anything else is
//! retried according to the probe's [`RetryPolicy`].

use std::fmt;

use tokio_util::sync::CancellationToken;

use super::retry::RetryPolicy;
use crate::domain::{Credentials, Provider, ProviderProfile};
use crate::providers::email::{MailTransport, TransportError};

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Connected and authenticated.
    Reachable,
    /// The server refused the credentials. Never retried.
    AuthenticationFailed {
        /// Provider that was probed.
        provider: Provider,
        /// Server detail.
        detail: String,
    },
    /// The server could not be reached after every attempt.
    ConnectionFailed {
        /// Profile that was probed.
        profile: ProviderProfile,
        /// Attempts made.
        attempts: u32,
        /// Detail of the last failure.
        detail: String,
    },
    /// Some other failure persisted after every attempt.
    Failed {
        /// Attempts made.
        attempts: u32,
        /// Detail of the last failure.
        detail: String,
    },
}

impl ProbeOutcome {
    /// True if the session could be established.
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }

    /// What the user should check, worded for the failure class.
    pub fn guidance(&self) -> Option<String> {
        match self {
            ProbeOutcome::Reachable => None,
            ProbeOutcome::AuthenticationFailed {
                provider: Provider::Gmail,
                ..
            } => Some(
                "Gmail rejected the login. Make sure that:\n\
                 1. 2-Step Verification is enabled on the Google account.\n\
                 2. You are using an App Password, not the account password.\n\
                 3. The App Password is the 16 characters without spaces.\n\
                 Generate one under Google Account > Security > 2-Step Verification > App passwords."
                    .to_string(),
            ),
            ProbeOutcome::AuthenticationFailed {
                provider: Provider::Qq,
                ..
            } => Some(
                "QQ Mail rejected the login. Make sure that:\n\
                 1. You are using an authorization code, not the account password.\n\
                 2. The code was copied without spaces.\n\
                 Enable POP3/SMTP and generate a code under Settings > Account in QQ Mail."
                    .to_string(),
            ),
            ProbeOutcome::ConnectionFailed { profile, .. } => Some(format!(
                "Could not connect to the {} SMTP server at {}:{}. Check that:\n\
                 1. The network connection works.\n\
                 2. No firewall or VPN blocks port {}.\n\
                 3. DNS resolves {}.",
                profile.provider, profile.host, profile.port, profile.port, profile.host
            )),
            ProbeOutcome::Failed { .. } => Some(
                "The SMTP check failed. Check the network, the username and the \
                 password or authorization code."
                    .to_string(),
            ),
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Reachable => write!(f, "reachable"),
            ProbeOutcome::AuthenticationFailed { provider, detail } => {
                write!(f, "{provider} authentication failed: {detail}")
            }
            ProbeOutcome::ConnectionFailed {
                profile,
                attempts,
                detail,
            } => write!(
                f,
                "cannot connect to {}:{} after {attempts} attempt(s): {detail}",
                profile.host, profile.port
            ),
            ProbeOutcome::Failed { attempts, detail } => {
                write!(f, "SMTP check failed after {attempts} attempt(s): {detail}")
            }
        }
    }
}

/// Opens and closes one authenticated session, retrying per `policy`.
pub async fn probe<T>(
    transport: &T,
    profile: &ProviderProfile,
    credentials: &Credentials,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> ProbeOutcome
where
    T: MailTransport + ?Sized,
{
    let mut last_error = None;
    let mut attempts = 0;

    for attempt in policy.attempts() {
        attempts = attempt;
        match transport.check_session(profile, credentials).await {
            Ok(()) => {
                tracing::info!(provider = %profile.provider, attempt, "SMTP connection test successful");
                return ProbeOutcome::Reachable;
            }
            Err(TransportError::Authentication(detail)) => {
                tracing::error!(provider = %profile.provider, error = %detail, "SMTP authentication failed");
                return ProbeOutcome::AuthenticationFailed {
                    provider: profile.provider,
                    detail,
                };
            }
            Err(e) => {
                tracing::error!(
                    provider = %profile.provider,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "SMTP connection test failed"
                );
                last_error = Some(e);
            }
        }

        if policy.is_last(attempt) || !policy.pause(cancel).await {
            break;
        }
    }

    match last_error {
        Some(TransportError::Connection(detail)) => ProbeOutcome::ConnectionFailed {
            profile: *profile,
            attempts,
            detail,
        },
        Some(e) => ProbeOutcome::Failed {
            attempts,
            detail: e.to_string(),
        },
        None => ProbeOutcome::Failed {
            attempts,
            detail: "cancelled".to_string(),
        },
    }
}
