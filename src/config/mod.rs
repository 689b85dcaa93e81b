//! Configuration and settings management.
//!
//! This module provides the settings document type and its persistence.
//! Settings are stored in the user's config directory as JSON.

pub mod paths;
mod settings;
mod store;

pub use settings::{Settings, SettingsUpdate, StoredCredentials};
pub use store::{ConfigError, ConfigStore};
