//! Persisted user settings.
//!
//! The settings document is a flat JSON object. Besides the active provider
//! and its credentials it caches one credential pair per provider so that
//! switching providers restores what was used last time, and keeps a history
//! of usernames for autocompletion.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths;
use crate::domain::Provider;

/// Mask shown instead of stored passwords.
const PASSWORD_MASK: &str = "********";

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Source directory scanned for books.
    pub ebooks_dir: PathBuf,
    /// Provider used for the last batch.
    pub email_provider: Provider,
    /// Username used for the last batch.
    pub email_username: String,
    /// Password or authorization code used for the last batch, as entered.
    pub email_password: String,
    /// Kindle delivery address.
    pub kindle_email: String,
    /// Previously used usernames, oldest first, without duplicates.
    pub email_history: Vec<String>,
    /// Cached Gmail username.
    pub gmail_username: String,
    /// Cached Gmail app password.
    pub gmail_password: String,
    /// Cached QQ username.
    pub qq_username: String,
    /// Cached QQ authorization code.
    pub qq_password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ebooks_dir: paths::default_ebooks_dir(),
            email_provider: Provider::Gmail,
            email_username: String::new(),
            email_password: String::new(),
            kindle_email: String::new(),
            email_history: Vec::new(),
            gmail_username: String::new(),
            gmail_password: String::new(),
            qq_username: String::new(),
            qq_password: String::new(),
        }
    }
}

/// A username/password pair cached for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    /// Account username.
    pub username: String,
    /// Password as entered (not sanitized).
    pub password: String,
}

/// The values written at the start of every batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsUpdate {
    /// Source directory.
    pub ebooks_dir: PathBuf,
    /// Active provider.
    pub provider: Provider,
    /// Active username.
    pub username: String,
    /// Active password as entered.
    pub password: String,
    /// Kindle delivery address.
    pub kindle_email: String,
}

impl Settings {
    /// Returns the credentials cached for `provider`.
    pub fn credentials_for(&self, provider: Provider) -> StoredCredentials {
        let (username, password) = match provider {
            Provider::Gmail => (&self.gmail_username, &self.gmail_password),
            Provider::Qq => (&self.qq_username, &self.qq_password),
        };
        StoredCredentials {
            username: username.clone(),
            password: password.clone(),
        }
    }

    fn set_credentials_for(&mut self, provider: Provider, username: &str, password: &str) {
        let (u, p) = match provider {
            Provider::Gmail => (&mut self.gmail_username, &mut self.gmail_password),
            Provider::Qq => (&mut self.qq_username, &mut self.qq_password),
        };
        *u = username.to_string();
        *p = password.to_string();
    }

    /// Adds a username to the history unless it is empty or already present.
    pub fn remember_username(&mut self, username: &str) {
        if !username.is_empty() && !self.email_history.iter().any(|u| u == username) {
            self.email_history.push(username.to_string());
        }
    }

    /// Builds the document to persist from the previously saved one and an update.
    ///
    /// Only the active provider's cached credentials are overwritten; the other
    /// provider's pair is carried over from `existing`.
    pub fn merged(existing: Option<Settings>, update: &SettingsUpdate) -> Settings {
        let mut settings = existing.unwrap_or_default();

        settings.ebooks_dir = update.ebooks_dir.clone();
        settings.email_provider = update.provider;
        settings.email_username = update.username.clone();
        settings.email_password = update.password.clone();
        settings.kindle_email = update.kindle_email.clone();

        settings.remember_username(&update.username);
        settings.set_credentials_for(update.provider, &update.username, &update.password);

        settings
    }

    /// Returns a copy with every stored password masked, for display.
    pub fn redacted(&self) -> Settings {
        let mask = |s: &String| {
            if s.is_empty() {
                String::new()
            } else {
                PASSWORD_MASK.to_string()
            }
        };
        Settings {
            email_password: mask(&self.email_password),
            gmail_password: mask(&self.gmail_password),
            qq_password: mask(&self.qq_password),
            ..self.clone()
        }
    }
}
