//! Repository event notifier entry point.
//!
//! `serve` runs the HTTP receiver until SIGINT/SIGTERM. `invoke` handles a
//! single event envelope from a file or stdin and prints the invocation
//! result as JSON on stdout; logs go to stderr.

mod signals;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use repo_event_notifier_core::config::AppConfig;
use repo_event_notifier_core::errors::{ConfigError, RelayError};
use repo_event_notifier_core::lookup::CodeCommitLookup;
use repo_event_notifier_core::{EventNotifier, InvocationResult};
use repo_event_notifier_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Relay CodeCommit repository change events to Slack.
#[derive(Parser, Debug)]
#[command(
    name = "repo-event-notifier",
    version,
    about = "Relay CodeCommit repository change events to Slack"
)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP receiver.
    Serve {
        /// Override the listen address from the config file.
        #[arg(long)]
        listen: Option<String>,
    },
    /// Handle one event envelope and print the result.
    Invoke {
        /// Path to the event JSON; `-` or omitted reads stdin.
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref());

    let log_level = args
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.relay.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_level);

    match args.command {
        Command::Serve { listen } => {
            let config = config.context("failed to load configuration")?;
            serve(config, listen).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Invoke { event } => {
            let result = run_invoke(config, event.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.status {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_and_resolve(path),
        None => AppConfig::from_env(),
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .init();
}

async fn build_notifier(config: &AppConfig) -> EventNotifier {
    let lookup = CodeCommitLookup::from_env(config.relay.region.as_deref()).await;
    EventNotifier::from_config(config, Arc::new(lookup))
}

async fn serve(config: AppConfig, listen: Option<String>) -> Result<()> {
    let listen = listen.unwrap_or_else(|| config.web.listen.clone());

    info!("========================================");
    info!("  repo-event-notifier v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Listen        : {}", listen);
    info!(
        "Region        : {}",
        config.relay.region.as_deref().unwrap_or("(provider chain)")
    );
    info!(
        "Slack         : {}",
        if config.slack.webhook_url.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );
    info!("========================================");

    let notifier = Arc::new(build_notifier(&config).await);
    WebServer::new(notifier)
        .start(&listen, signals::wait_for_shutdown())
        .await
        .context("web server failed")?;

    info!("repo-event-notifier stopped.");
    Ok(())
}

/// Handle one event, reporting a configuration error as a failed result
/// without contacting any collaborator.
async fn run_invoke(
    config: Result<AppConfig, ConfigError>,
    event: Option<&Path>,
) -> InvocationResult {
    match config {
        Ok(config) => invoke(&config, event).await,
        Err(e) => {
            error!(error = %e, "configuration error");
            InvocationResult::failure(RelayError::from(e))
        }
    }
}

async fn invoke(config: &AppConfig, event: Option<&Path>) -> InvocationResult {
    let raw = match read_event(event) {
        Ok(raw) => raw,
        Err(e) => {
            error!(error = %e, "cannot read event");
            return InvocationResult::failure(format!("{:#}", e));
        }
    };

    let notifier = build_notifier(config).await;
    notifier.handle_payload(&raw).await
}

fn read_event(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read(path)
            .with_context(|| format!("failed to read event file {}", path.display())),
        _ => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("failed to read event from stdin")?;
            Ok(raw)
        }
    }
}
