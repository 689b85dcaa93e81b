//! Command line definition and request resolution.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Settings;
use crate::domain::Provider;
use crate::services::BatchRequest;

/// Deliver EPUB books to a Kindle address over Gmail or QQ SMTP.
#[derive(Debug, Parser)]
#[command(name = "kindle-courier", version, about)]
pub struct Cli {
    /// Settings document to read and update
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append-only event log
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send every book in the source directory
    Send(TargetArgs),
    /// Test the SMTP login without sending anything
    Check(TargetArgs),
    /// Show the saved settings with passwords masked
    Config,
}

/// Values overriding the saved settings for one run.
#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// Directory holding the books to send
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Mail provider (gmail or qq); inferred from the username if omitted
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Sender address used to log in
    #[arg(long)]
    pub username: Option<String>,

    /// App password or authorization code
    #[arg(long)]
    pub password: Option<String>,

    /// Kindle delivery address
    #[arg(long, value_name = "ADDRESS")]
    pub kindle: Option<String>,
}

impl TargetArgs {
    /// Fills the gaps in these arguments from the saved settings.
    ///
    /// The provider comes from `--provider`, else the username's domain, else
    /// the saved provider. Without `--username`, the provider's cached login
    /// is used. Without `--password`, the cached password is used when it
    /// belongs to the same username.
    pub fn resolve(&self, settings: &Settings) -> BatchRequest {
        let provider = self
            .provider
            .or_else(|| self.username.as_deref().and_then(Provider::infer_from_address))
            .unwrap_or(settings.email_provider);

        let cached = settings.credentials_for(provider);
        let (cached_username, cached_password) = if cached.username.is_empty()
            && provider == settings.email_provider
        {
            (
                settings.email_username.clone(),
                settings.email_password.clone(),
            )
        } else {
            (cached.username, cached.password)
        };

        let username = self.username.clone().unwrap_or(cached_username.clone());
        let password = self.password.clone().unwrap_or_else(|| {
            if username.trim() == cached_username.trim() {
                cached_password
            } else {
                String::new()
            }
        });

        BatchRequest {
            ebooks_dir: self.dir.clone().unwrap_or_else(|| settings.ebooks_dir.clone()),
            provider,
            username,
            password,
            kindle_email: self
                .kindle
                .clone()
                .unwrap_or_else(|| settings.kindle_email.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn saved() -> Settings {
        Settings {
            ebooks_dir: PathBuf::from("/books"),
            email_provider: Provider::Gmail,
            email_username: "me@gmail.com".to_string(),
            email_password: "gmailpass".to_string(),
            kindle_email: "reader@kindle.com".to_string(),
            email_history: vec!["me@gmail.com".to_string(), "42@qq.com".to_string()],
            gmail_username: "me@gmail.com".to_string(),
            gmail_password: "gmailpass".to_string(),
            qq_username: "42@qq.com".to_string(),
            qq_password: "qqcode".to_string(),
        }
    }

    #[test]
    fn parses_send_with_overrides() {
        let cli = Cli::try_parse_from([
            "kindle-courier",
            "--config",
            "/tmp/c.json",
            "send",
            "--provider",
            "qq",
            "--kindle",
            "other@kindle.com",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.provider, Some(Provider::Qq));
        assert_eq!(args.kindle.as_deref(), Some("other@kindle.com"));
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = Cli::try_parse_from(["kindle-courier", "check", "--provider", "yahoo"]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_args_use_saved_settings() {
        let request = TargetArgs::default().resolve(&saved());

        assert_eq!(
            request,
            BatchRequest {
                ebooks_dir: PathBuf::from("/books"),
                provider: Provider::Gmail,
                username: "me@gmail.com".to_string(),
                password: "gmailpass".to_string(),
                kindle_email: "reader@kindle.com".to_string(),
            }
        );
    }

    #[test]
    fn provider_switch_uses_cached_login() {
        let args = TargetArgs {
            provider: Some(Provider::Qq),
            ..TargetArgs::default()
        };
        let request = args.resolve(&saved());

        assert_eq!(request.provider, Provider::Qq);
        assert_eq!(request.username, "42@qq.com");
        assert_eq!(request.password, "qqcode");
    }

    #[test]
    fn provider_inferred_from_username() {
        let args = TargetArgs {
            username: Some("42@qq.com".to_string()),
            ..TargetArgs::default()
        };
        let request = args.resolve(&saved());

        assert_eq!(request.provider, Provider::Qq);
        assert_eq!(request.password, "qqcode");
    }

    #[test]
    fn new_username_does_not_reuse_cached_password() {
        let args = TargetArgs {
            username: Some("someone.else@gmail.com".to_string()),
            ..TargetArgs::default()
        };
        let request = args.resolve(&saved());

        assert_eq!(request.provider, Provider::Gmail);
        assert_eq!(request.password, "");
        assert_eq!(request.missing_field(), Some("email_password"));
    }
}
