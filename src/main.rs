use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deskbridge::config;
use deskbridge::credentials::CredentialStore;
use deskbridge::executor::ActionExecutor;
use deskbridge::llm::ProviderRouter;
use deskbridge::messaging::MessageDispatcher;
use deskbridge::platform::Desktop;

/// Native messaging host bridging a browser extension to desktop automation.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level for stderr output (stdout carries the wire protocol)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Desktop backend to drive
    #[arg(long, value_enum, default_value_t = Backend::Native)]
    backend: Backend,
}

#[derive(Clone, Debug, ValueEnum)]
enum Backend {
    /// Platform screen capture, UI automation, and input injection
    Native,
    /// In-process fake desktop for development and tests
    Simulated,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli.log_level) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    info!("deskbridge v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => {
            info!("deskbridge shutting down");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;

    let desktop = match cli.backend {
        Backend::Simulated => Desktop::simulated(),
        Backend::Native => Desktop::native()
            .context("failed to initialize desktop subsystems")?,
    };

    let credentials = CredentialStore::new(desktop.vault.clone());
    let planner = ProviderRouter::new(credentials, config.providers.clone())
        .map_err(|err| anyhow::anyhow!("failed to initialize provider router: {err}"))?;
    let executor = ActionExecutor::new(desktop, Arc::new(planner));
    let dispatcher = MessageDispatcher::new(executor);

    info!("handlers registered, entering message loop");

    // Frames flow over raw locked stdio; writes are flushed per frame.
    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = dispatcher.run(&mut stdin.lock(), &mut stdout.lock());
    dispatcher.shutdown();

    result.context("fatal protocol error")
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}
