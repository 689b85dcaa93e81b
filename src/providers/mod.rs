//! External service provider implementations.
//!
//! - [`email`] - SMTP transports used to reach the mail providers

pub mod email;
