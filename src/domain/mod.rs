//! Domain layer types for kindle-courier.
//!
//! This module contains the core domain types used throughout the application:
//! mail providers with their fixed connection profiles, login credentials, and
//! the candidate book files picked up from the source directory.

mod book;
mod credentials;
mod provider;

pub use book::{
    book_title, file_name_of, is_book_file_name, CandidateFile, BOOK_EXTENSION, BOOK_MIME_TYPE,
};
pub use credentials::{sanitize_password, Credentials};
pub use provider::{
    BatchCeiling, CeilingDecision, Provider, ProviderProfile, SecurityMode, UnknownProvider,
};
