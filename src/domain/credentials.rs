//! Credential normalization.
//!
//! App passwords and authorization codes are usually copied from a web page,
//! which tends to drag whitespace along. Gmail additionally displays its
//! 16-character app passwords in four space-separated groups.

use std::fmt;

/// Length of a Gmail app password without its display spacing.
const APP_PASSWORD_LEN: usize = 16;

/// Normalizes a pasted password or authorization code.
///
/// Leading and trailing whitespace is removed and internal runs collapse to a
/// single space. If the remaining characters, spaces excluded, number exactly
/// sixteen, the value is taken to be a space-grouped app password and all
/// spaces are dropped. Applying this twice gives the same result as once.
pub fn sanitize_password(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.contains(' ') {
        let compact: String = collapsed.chars().filter(|c| *c != ' ').collect();
        if compact.chars().count() == APP_PASSWORD_LEN {
            tracing::info!("Detected space-grouped app password, removed spaces");
            return compact;
        }
    }

    collapsed
}

/// SMTP login credentials with a sanitized password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials, trimming the username and sanitizing the password.
    pub fn new(username: impl AsRef<str>, raw_password: impl AsRef<str>) -> Self {
        Self {
            username: username.as_ref().trim().to_string(),
            password: sanitize_password(raw_password.as_ref()),
        }
    }

    /// Login name, also used as the sender address.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Sanitized password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
