//! Batch delivery orchestration.
//!
//! The [`DeliveryService`] drives one batch end to end: it checks the
//! request, scans the source directory, applies the provider's batch ceiling,
//! saves the settings, probes the SMTP server, then sends each book with
//! bounded retries and files it under the delivered or failed directory.
//!
//! Progress is reported through an observer callback; the service never
//! talks to a user interface directly.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::mailer::Mailer;
use super::probe::{probe, ProbeOutcome};
use super::retry::RetryPolicy;
use crate::config::{paths, ConfigError, ConfigStore, SettingsUpdate};
use crate::domain::{CandidateFile, CeilingDecision, Credentials, Provider, ProviderProfile};
use crate::providers::email::MailTransport;
use crate::storage::{Library, LibraryError};

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A required setting is empty.
    #[error("missing required setting: {0}")]
    MissingField(&'static str),

    /// The source directory could not be scanned or prepared.
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// The batch exceeds a hard ceiling.
    #[error("too many files: {provider} accepts at most {limit} per batch, found {found}")]
    TooManyFiles {
        /// Active provider.
        provider: Provider,
        /// The provider's ceiling.
        limit: usize,
        /// Files found.
        found: usize,
    },

    /// Settings could not be saved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The SMTP server could not be reached or refused the login.
    #[error("SMTP check failed: {0}")]
    Unreachable(ProbeOutcome),
}

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Everything needed to run one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Source directory.
    pub ebooks_dir: PathBuf,
    /// Provider to send through.
    pub provider: Provider,
    /// Login name, also the sender address.
    pub username: String,
    /// Password or authorization code as entered.
    pub password: String,
    /// Kindle delivery address.
    pub kindle_email: String,
}

impl BatchRequest {
    /// Name of the first empty required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.ebooks_dir.as_os_str().is_empty() {
            Some("ebooks_dir")
        } else if self.username.trim().is_empty() {
            Some("email_username")
        } else if self.password.trim().is_empty() {
            Some("email_password")
        } else if self.kindle_email.trim().is_empty() {
            Some("kindle_email")
        } else {
            None
        }
    }

    /// Credentials with the password sanitized.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    fn settings_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            ebooks_dir: self.ebooks_dir.clone(),
            provider: self.provider,
            username: self.username.clone(),
            password: self.password.clone(),
            kindle_email: self.kindle_email.clone(),
        }
    }
}

/// Progress notifications emitted during a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryEvent {
    /// The source directory was scanned.
    Scanned {
        /// Candidate books found.
        found: usize,
    },
    /// The batch was cut down to the provider's soft ceiling.
    Truncated {
        /// Files kept.
        limit: usize,
        /// Files left in the source directory.
        skipped: usize,
    },
    /// Settings were persisted.
    ConfigSaved,
    /// The SMTP probe started.
    ProbeStarted,
    /// The SMTP probe succeeded.
    ProbeSucceeded,
    /// A book is about to be sent.
    FileStarted {
        /// Zero-based position in the batch.
        index: usize,
        /// Books in the batch.
        total: usize,
        /// Book file name.
        file_name: String,
    },
    /// One send attempt failed.
    AttemptFailed {
        /// Book file name.
        file_name: String,
        /// One-based attempt number.
        attempt: u32,
        /// Attempts allowed.
        max_attempts: u32,
        /// Failure detail.
        error: String,
    },
    /// A book reached its terminal state.
    FileFinished {
        /// Zero-based position in the batch.
        index: usize,
        /// Books in the batch.
        total: usize,
        /// Book file name.
        file_name: String,
        /// Whether it was delivered.
        delivered: bool,
        /// New location, if the move succeeded.
        destination: Option<PathBuf>,
        /// Fraction of the batch processed, in `0.0..=1.0`.
        progress: f64,
    },
    /// The batch was cancelled before every book was attempted.
    Cancelled {
        /// Books left untouched.
        remaining: usize,
    },
    /// The batch finished.
    Completed {
        /// Books delivered.
        delivered: usize,
        /// Books failed.
        failed: usize,
    },
}

/// Terminal state of one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Where the book was picked up.
    pub source: PathBuf,
    /// Whether it was delivered.
    pub delivered: bool,
    /// Send attempts made.
    pub attempts: u32,
    /// Where the book ended up; `None` if the move failed and it stayed put.
    pub destination: Option<PathBuf>,
}

/// Summary of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Candidate books found by the scan.
    pub found: usize,
    /// Books left in place because of a soft ceiling.
    pub skipped: usize,
    /// Per-book results, in processing order.
    pub files: Vec<FileReport>,
    /// Whether the batch stopped early.
    pub cancelled: bool,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// When the batch ended.
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            found: 0,
            skipped: 0,
            files: Vec::new(),
            cancelled: false,
            started_at,
            finished_at: started_at,
        }
    }

    /// Books that reached a terminal state.
    pub fn processed(&self) -> usize {
        self.files.len()
    }

    /// Books delivered.
    pub fn delivered(&self) -> usize {
        self.files.iter().filter(|f| f.delivered).count()
    }

    /// Books that could not be delivered.
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| !f.delivered).count()
    }

    /// Books whose move failed and which are still in the source directory.
    pub fn unmoved(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.destination.is_none())
    }

    /// True if the scan found nothing to send.
    pub fn is_empty(&self) -> bool {
        self.found == 0
    }
}

/// Result of attempting one book.
struct Attempted {
    delivered: bool,
    attempts: u32,
    cancelled: bool,
}

/// Orchestrates batch delivery over a [`MailTransport`].
pub struct DeliveryService<T> {
    mailer: Mailer<T>,
    config: ConfigStore,
    send_policy: RetryPolicy,
    probe_policy: RetryPolicy,
    excluded_file: Option<String>,
}

impl<T: MailTransport> DeliveryService<T> {
    /// Creates a service with the default retry policies.
    ///
    /// The event log file name is excluded from scans.
    pub fn new(transport: T, config: ConfigStore) -> Self {
        Self {
            mailer: Mailer::new(transport),
            config,
            send_policy: RetryPolicy::SEND,
            probe_policy: RetryPolicy::PROBE,
            excluded_file: Some(paths::LOG_FILE_NAME.to_string()),
        }
    }

    /// Overrides the per-book retry policy.
    pub fn with_send_policy(mut self, policy: RetryPolicy) -> Self {
        self.send_policy = policy;
        self
    }

    /// Overrides the probe retry policy.
    pub fn with_probe_policy(mut self, policy: RetryPolicy) -> Self {
        self.probe_policy = policy;
        self
    }

    /// Sets the file name skipped during scans.
    pub fn with_excluded_file(mut self, name: Option<String>) -> Self {
        self.excluded_file = name;
        self
    }

    /// Returns the config store.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Returns the mailer.
    pub fn mailer(&self) -> &Mailer<T> {
        &self.mailer
    }

    /// Probes the provider without sending anything.
    pub async fn check_connection(
        &self,
        provider: Provider,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> ProbeOutcome {
        probe(
            self.mailer.transport(),
            &provider.profile(),
            credentials,
            &self.probe_policy,
            cancel,
        )
        .await
    }

    /// Runs one batch.
    ///
    /// Errors abort the batch before any book is sent. Once sending starts,
    /// per-book failures are recorded in the report instead.
    pub async fn run_batch<F>(
        &self,
        request: &BatchRequest,
        mut observer: F,
        cancel: &CancellationToken,
    ) -> Result<BatchReport>
    where
        F: FnMut(DeliveryEvent),
    {
        let mut report = BatchReport::new(Utc::now());

        if let Some(field) = request.missing_field() {
            tracing::error!(field, "Missing required setting");
            return Err(BatchError::MissingField(field));
        }

        let profile = request.provider.profile();
        let library = Library::new(&request.ebooks_dir);

        let mut candidates = library.scan(self.excluded_file.as_deref())?;
        report.found = candidates.len();
        observer(DeliveryEvent::Scanned {
            found: candidates.len(),
        });

        if candidates.is_empty() {
            tracing::info!(dir = %request.ebooks_dir.display(), "No EPUB files found in the directory");
            report.finished_at = Utc::now();
            return Ok(report);
        }

        match profile.ceiling.apply(candidates.len()) {
            CeilingDecision::Accept => {}
            CeilingDecision::Reject { limit } => {
                tracing::error!(provider = %profile.provider, limit, found = candidates.len(), "Batch exceeds ceiling");
                return Err(BatchError::TooManyFiles {
                    provider: profile.provider,
                    limit,
                    found: candidates.len(),
                });
            }
            CeilingDecision::Truncate { limit } => {
                let skipped = candidates.len() - limit;
                candidates.truncate(limit);
                report.skipped = skipped;
                tracing::warn!(provider = %profile.provider, limit, skipped, "Batch truncated to ceiling");
                observer(DeliveryEvent::Truncated { limit, skipped });
            }
        }

        self.config.save(&request.settings_update())?;
        observer(DeliveryEvent::ConfigSaved);

        let credentials = request.credentials();
        observer(DeliveryEvent::ProbeStarted);
        let outcome = probe(
            self.mailer.transport(),
            &profile,
            &credentials,
            &self.probe_policy,
            cancel,
        )
        .await;
        if !outcome.is_reachable() {
            return Err(BatchError::Unreachable(outcome));
        }
        observer(DeliveryEvent::ProbeSucceeded);

        library.prepare()?;

        let total = candidates.len();
        for (index, candidate) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            observer(DeliveryEvent::FileStarted {
                index,
                total,
                file_name: candidate.file_name.clone(),
            });
            tracing::info!(
                file = %candidate.file_name,
                title = candidate.title(),
                size_mib = candidate.size_mib(),
                "Sending"
            );

            let attempted = self
                .deliver(candidate, &profile, &credentials, request, cancel, &mut observer)
                .await;

            let destination = match library.relocate(&candidate.path, attempted.delivered) {
                Ok(dest) => Some(dest),
                Err(e) => {
                    tracing::error!(file = %candidate.path.display(), error = %e, "Failed to move file");
                    None
                }
            };

            report.files.push(FileReport {
                source: candidate.path.clone(),
                delivered: attempted.delivered,
                attempts: attempted.attempts,
                destination: destination.clone(),
            });
            observer(DeliveryEvent::FileFinished {
                index,
                total,
                file_name: candidate.file_name.clone(),
                delivered: attempted.delivered,
                destination,
                progress: (index + 1) as f64 / total as f64,
            });

            if attempted.cancelled {
                report.cancelled = true;
                break;
            }
        }

        report.finished_at = Utc::now();
        if report.cancelled {
            let remaining = total - report.processed();
            tracing::warn!(remaining, "Batch cancelled");
            observer(DeliveryEvent::Cancelled { remaining });
        }

        tracing::info!(
            delivered = report.delivered(),
            failed = report.failed(),
            "Batch complete"
        );
        observer(DeliveryEvent::Completed {
            delivered: report.delivered(),
            failed: report.failed(),
        });
        Ok(report)
    }

    /// Sends one book with retries.
    async fn deliver<F>(
        &self,
        candidate: &CandidateFile,
        profile: &ProviderProfile,
        credentials: &Credentials,
        request: &BatchRequest,
        cancel: &CancellationToken,
        observer: &mut F,
    ) -> Attempted
    where
        F: FnMut(DeliveryEvent),
    {
        let policy = &self.send_policy;
        let mut attempts = 0;

        for attempt in policy.attempts() {
            attempts = attempt;
            let result = self
                .mailer
                .try_send(&candidate.path, profile, credentials, &request.kindle_email)
                .await;

            let error = match result {
                Ok(_) => {
                    return Attempted {
                        delivered: true,
                        attempts,
                        cancelled: false,
                    }
                }
                Err(e) => e,
            };

            tracing::warn!(
                file = %candidate.file_name,
                provider = %profile.provider,
                attempt,
                max_attempts = policy.max_attempts,
                error = %error,
                "Failed to send"
            );
            observer(DeliveryEvent::AttemptFailed {
                file_name: candidate.file_name.clone(),
                attempt,
                max_attempts: policy.max_attempts,
                error: error.to_string(),
            });

            if !error.is_retryable() || policy.is_last(attempt) {
                break;
            }
            if !policy.pause(cancel).await {
                return Attempted {
                    delivered: false,
                    attempts,
                    cancelled: true,
                };
            }
        }

        Attempted {
            delivered: false,
            attempts,
            cancelled: false,
        }
    }
}
