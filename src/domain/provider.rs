//! Mail provider domain types.
//!
//! Each supported provider maps to a fixed [`ProviderProfile`] carrying its
//! SMTP endpoint, transport security mode and batch policy. Profiles are not
//! user-editable; they are selected once from the [`Provider`] and passed
//! through to every component that needs them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported outgoing mail providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    /// Google Mail, authenticated with an app password.
    #[default]
    Gmail,
    /// QQ Mail, authenticated with an authorization code.
    #[serde(rename = "QQ")]
    Qq,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Provider; 2] = [Provider::Gmail, Provider::Qq];

    /// Returns the fixed connection profile for this provider.
    pub fn profile(self) -> ProviderProfile {
        match self {
            Provider::Gmail => ProviderProfile {
                provider: self,
                host: "smtp.gmail.com",
                port: 587,
                security: SecurityMode::StartTls,
                ceiling: BatchCeiling::Hard(300),
            },
            Provider::Qq => ProviderProfile {
                provider: self,
                host: "smtp.qq.com",
                port: 465,
                security: SecurityMode::ImplicitTls,
                ceiling: BatchCeiling::Soft(10),
            },
        }
    }

    /// Name used in the configuration document.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gmail => "Gmail",
            Provider::Qq => "QQ",
        }
    }

    /// Infers the provider from a mailbox address domain.
    ///
    /// Returns `None` for addresses of any other domain.
    pub fn infer_from_address(address: &str) -> Option<Provider> {
        let address = address.trim().to_ascii_lowercase();
        if address.ends_with("@gmail.com") {
            Some(Provider::Gmail)
        } else if address.ends_with("@qq.com") {
            Some(Provider::Qq)
        } else {
            None
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mail provider: {0} (expected Gmail or QQ)")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gmail" => Ok(Provider::Gmail),
            "qq" => Ok(Provider::Qq),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// Plain connection upgraded with STARTTLS.
    StartTls,
    /// TLS from the first byte (SMTPS).
    ImplicitTls,
}

/// Maximum number of files accepted in one batch, and what happens above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchCeiling {
    /// Batches above the limit are rejected outright.
    Hard(usize),
    /// Batches above the limit are cut down to the first `n` files.
    Soft(usize),
}

impl BatchCeiling {
    /// The numeric limit regardless of policy.
    pub fn limit(self) -> usize {
        match self {
            BatchCeiling::Hard(n) | BatchCeiling::Soft(n) => n,
        }
    }

    /// Applies the policy to a batch of `count` files.
    pub fn apply(self, count: usize) -> CeilingDecision {
        match self {
            _ if count <= self.limit() => CeilingDecision::Accept,
            BatchCeiling::Hard(limit) => CeilingDecision::Reject { limit },
            BatchCeiling::Soft(limit) => CeilingDecision::Truncate { limit },
        }
    }
}

/// Result of applying a [`BatchCeiling`] to a batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeilingDecision {
    /// The batch fits.
    Accept,
    /// The whole batch must be refused.
    Reject {
        /// The ceiling that was exceeded.
        limit: usize,
    },
    /// Only the first `limit` files may be processed.
    Truncate {
        /// Number of files to keep.
        limit: usize,
    },
}

/// Fixed SMTP connection parameters and batch policy for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Provider this profile belongs to.
    pub provider: Provider,
    /// SMTP server hostname.
    pub host: &'static str,
    /// SMTP server port.
    pub port: u16,
    /// Transport security mode.
    pub security: SecurityMode,
    /// Files-per-batch ceiling.
    pub ceiling: BatchCeiling,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gmail_profile() {
        let profile = Provider::Gmail.profile();
        assert_eq!(profile.host, "smtp.gmail.com");
        assert_eq!(profile.port, 587);
        assert_eq!(profile.security, SecurityMode::StartTls);
        assert_eq!(profile.ceiling, BatchCeiling::Hard(300));
    }

    #[test]
    fn qq_profile() {
        let profile = Provider::Qq.profile();
        assert_eq!(profile.host, "smtp.qq.com");
        assert_eq!(profile.port, 465);
        assert_eq!(profile.security, SecurityMode::ImplicitTls);
        assert_eq!(profile.ceiling, BatchCeiling::Soft(10));
    }

    #[test]
    fn provider_serialization() {
        assert_eq!(serde_json::to_string(&Provider::Gmail).unwrap(), "\"Gmail\"");
        assert_eq!(serde_json::to_string(&Provider::Qq).unwrap(), "\"QQ\"");

        let qq: Provider = serde_json::from_str("\"QQ\"").unwrap();
        assert_eq!(qq, Provider::Qq);
    }

    #[test]
    fn provider_from_str_is_case_insensitive() {
        assert_eq!("gmail".parse::<Provider>().unwrap(), Provider::Gmail);
        assert_eq!("QQ".parse::<Provider>().unwrap(), Provider::Qq);
        assert!("outlook".parse::<Provider>().is_err());
    }

    #[test]
    fn infer_provider_from_address() {
        assert_eq!(
            Provider::infer_from_address("Reader@Gmail.com"),
            Some(Provider::Gmail)
        );
        assert_eq!(
            Provider::infer_from_address("12345@qq.com "),
            Some(Provider::Qq)
        );
        assert_eq!(Provider::infer_from_address("me@example.com"), None);
    }

    #[test]
    fn hard_ceiling_rejects_over_limit() {
        let ceiling = BatchCeiling::Hard(300);
        assert_eq!(ceiling.apply(300), CeilingDecision::Accept);
        assert_eq!(ceiling.apply(301), CeilingDecision::Reject { limit: 300 });
    }

    #[test]
    fn soft_ceiling_truncates_over_limit() {
        let ceiling = BatchCeiling::Soft(10);
        assert_eq!(ceiling.apply(0), CeilingDecision::Accept);
        assert_eq!(ceiling.apply(10), CeilingDecision::Accept);
        assert_eq!(ceiling.apply(15), CeilingDecision::Truncate { limit: 10 });
    }
}
