//! Mail transport implementations.
//!
//! This module contains the [`MailTransport`] trait and the SMTP
//! implementation used in production:
//!
//! - [`SmtpTransport`] - `lettre` over STARTTLS or implicit TLS
//!
//! # Example
//!
//! ```ignore
//! use kindle_courier::domain::{Credentials, Provider};
//! use kindle_courier::providers::email::{MailTransport, SmtpTransport};
//!
//! async fn can_log_in(username: &str, password: &str) -> bool {
//!     let transport = SmtpTransport::new();
//!     let credentials = Credentials::new(username, password);
//!     transport
//!         .check_session(&Provider::Gmail.profile(), &credentials)
//!         .await
//!         .is_ok()
//! }
//! ```

mod smtp;
mod traits;

pub use smtp::SmtpTransport;
pub use traits::{MailTransport, Result, TransportError};

#[cfg(test)]
pub use traits::MockMailTransport;
