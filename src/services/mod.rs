//! Business services layer.
//!
//! This module contains the services that carry books from the source
//! directory to a Kindle address, coordinating between the SMTP provider,
//! the config store and the library on disk.
//!
//! # Architecture
//!
//! Services sit between the application layer and the infrastructure layer:
//!
//! ```text
//! Application Layer (CLI)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Providers, Config, Storage)
//! ```
//!
//! # Services Overview
//!
//! - [`validate_book`]: Checks a file looks like an EPUB archive
//! - [`Mailer`]: Packages and sends a single book
//! - [`probe`]: Tests that the SMTP server accepts a login
//! - [`DeliveryService`]: Runs a whole batch with retries and relocation

mod delivery_service;
mod mailer;
mod probe;
mod retry;
mod validator;

pub use delivery_service::{
    BatchError, BatchReport, BatchRequest, DeliveryEvent, DeliveryService, FileReport,
};
pub use mailer::{build_book_message, Delivered, DeliveryError, Mailer};
pub use probe::{probe, ProbeOutcome};
pub use retry::RetryPolicy;
pub use validator::{has_archive_signature, validate_book, ValidatedBook, ValidationError};
