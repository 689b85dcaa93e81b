//! Application entry points for the command line.
//!
//! [`App`] turns a parsed [`Command`] into calls on the services layer and
//! prints progress for the user. All delivery logic lives in
//! [`DeliveryService`]; this layer only resolves inputs and renders events.

mod cli;
pub mod logging;

pub use cli::{Cli, Command, TargetArgs};

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::ConfigStore;
use crate::providers::email::SmtpTransport;
use crate::services::{BatchError, DeliveryEvent, DeliveryService};

/// Command line application.
pub struct App {
    service: DeliveryService<SmtpTransport>,
}

impl App {
    /// Creates an application over the settings document in `store`.
    pub fn new(store: ConfigStore) -> Self {
        Self {
            service: DeliveryService::new(SmtpTransport::new(), store),
        }
    }

    /// Runs one command to completion or cancellation.
    pub async fn run(&self, command: Command, cancel: CancellationToken) -> Result<()> {
        match command {
            Command::Send(args) => self.send(&args, &cancel).await,
            Command::Check(args) => self.check(&args, &cancel).await,
            Command::Config => self.show_config(),
        }
    }

    async fn send(&self, args: &TargetArgs, cancel: &CancellationToken) -> Result<()> {
        let settings = self.service.config().load_or_default();
        let request = args.resolve(&settings);

        let result = self
            .service
            .run_batch(
                &request,
                |event| {
                    if let Some(line) = render_event(&event) {
                        println!("{line}");
                    }
                },
                cancel,
            )
            .await;

        let report = match result {
            Ok(report) => report,
            Err(BatchError::Unreachable(outcome)) => {
                if let Some(guidance) = outcome.guidance() {
                    eprintln!("{guidance}");
                }
                bail!("SMTP check failed: {outcome}");
            }
            Err(e) => return Err(e.into()),
        };

        if report.is_empty() {
            println!("No EPUB files found in {}", request.ebooks_dir.display());
            return Ok(());
        }

        for file in report.unmoved() {
            eprintln!(
                "Could not move {}; it is still in the source directory",
                file.source.display()
            );
        }
        if report.failed() > 0 {
            bail!(
                "{} of {} book(s) could not be delivered",
                report.failed(),
                report.processed()
            );
        }
        Ok(())
    }

    async fn check(&self, args: &TargetArgs, cancel: &CancellationToken) -> Result<()> {
        let settings = self.service.config().load_or_default();
        let request = args.resolve(&settings);
        if request.username.trim().is_empty() {
            bail!("missing required setting: email_username");
        }
        if request.password.trim().is_empty() {
            bail!("missing required setting: email_password");
        }

        println!("Testing {} SMTP login...", request.provider);
        let outcome = self
            .service
            .check_connection(request.provider, &request.credentials(), cancel)
            .await;

        if outcome.is_reachable() {
            println!("SMTP connection test successful");
            return Ok(());
        }
        if let Some(guidance) = outcome.guidance() {
            eprintln!("{guidance}");
        }
        bail!("SMTP check failed: {outcome}")
    }

    fn show_config(&self) -> Result<()> {
        let store = self.service.config();
        println!("Config file: {}", store.path().display());
        match store.load() {
            Some(settings) => {
                let text = serde_json::to_string_pretty(&settings.redacted())
                    .context("failed to encode settings")?;
                println!("{text}");
            }
            None => println!("No saved settings"),
        }
        Ok(())
    }
}

/// Formats a delivery event for the terminal.
pub fn render_event(event: &DeliveryEvent) -> Option<String> {
    let line = match event {
        DeliveryEvent::Scanned { found } => format!("Found {found} EPUB file(s)"),
        DeliveryEvent::Truncated { limit, skipped } => format!(
            "Sending the first {limit} file(s) only; {skipped} left for the next run"
        ),
        DeliveryEvent::ConfigSaved => return None,
        DeliveryEvent::ProbeStarted => "Testing SMTP connection...".to_string(),
        DeliveryEvent::ProbeSucceeded => "SMTP connection test successful".to_string(),
        DeliveryEvent::FileStarted {
            index,
            total,
            file_name,
        } => format!("[{}/{total}] Sending {file_name}", index + 1),
        DeliveryEvent::AttemptFailed {
            file_name,
            attempt,
            max_attempts,
            error,
        } => format!("  attempt {attempt}/{max_attempts} for {file_name} failed: {error}"),
        DeliveryEvent::FileFinished {
            file_name,
            delivered,
            progress,
            ..
        } => {
            let status = if *delivered { "delivered" } else { "failed" };
            format!("  {file_name}: {status} ({:.0}%)", progress * 100.0)
        }
        DeliveryEvent::Cancelled { remaining } => {
            format!("Cancelled; {remaining} file(s) left in the source directory")
        }
        DeliveryEvent::Completed { delivered, failed } => {
            format!("Done: {delivered} delivered, {failed} failed")
        }
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_progress_as_percentage() {
        let line = render_event(&DeliveryEvent::FileFinished {
            index: 0,
            total: 4,
            file_name: "Dune.epub".to_string(),
            delivered: true,
            destination: None,
            progress: 0.25,
        });
        assert_eq!(line.as_deref(), Some("  Dune.epub: delivered (25%)"));
    }

    #[test]
    fn config_saved_is_silent() {
        assert!(render_event(&DeliveryEvent::ConfigSaved).is_none());
    }

    #[test]
    fn file_started_is_one_based() {
        let line = render_event(&DeliveryEvent::FileStarted {
            index: 2,
            total: 3,
            file_name: "a.epub".to_string(),
        })
        .unwrap();
        assert_eq!(line, "[3/3] Sending a.epub");
    }
}
