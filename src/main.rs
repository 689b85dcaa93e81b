//! kindle-courier - Entry point for the command line sender

use clap::Parser;
use tokio_util::sync::CancellationToken;

use kindle_courier::app::{logging, Cli};
use kindle_courier::config::{paths, ConfigStore};
use kindle_courier::App;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_file = cli.log_file.clone().unwrap_or_else(paths::default_log_path);
    logging::init(&log_file);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting kindle-courier");

    let store = cli
        .config
        .clone()
        .map(ConfigStore::new)
        .unwrap_or_else(ConfigStore::at_default_location);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            on_interrupt.cancel();
        }
    });

    if let Err(e) = App::new(store).run(cli.command, cancel).await {
        tracing::error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
