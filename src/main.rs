//! awaitdb: start a database service and block until it is ready.
//!
//! This is the application entry point. It parses arguments, loads
//! configuration (built-in defaults when no file is given), initializes
//! tracing, then runs the start → wait → report → hold sequence.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use awaitdb::config::{AppConfig, ConfigError, DEFAULT_LOG_FILTER};

/// Start a local database service and wait until its HTTP endpoint is ready
#[derive(Parser, Debug)]
#[command(name = "awaitdb", version, about)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level filter (e.g., "awaitdb=debug")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Readiness URL, overrides readiness.url
    #[arg(long)]
    url: Option<String>,

    /// Give up after this many seconds, overrides readiness.timeout_seconds
    #[arg(long)]
    timeout: Option<u64>,
}

/// Load the config file (or defaults), apply CLI overrides, then validate the result.
fn resolve_config(args: &Args) -> Result<AppConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(url) = &args.url {
        config.readiness.url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.readiness.timeout_seconds = Some(timeout);
    }
    config.validate()?;
    Ok(config)
}

/// Log filter with priority: CLI > env > default
fn log_filter(cli: Option<String>, env: Option<String>) -> String {
    cli.or(env).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let filter = log_filter(args.log_level.clone(), std::env::var("RUST_LOG").ok());

    // Logs go to stderr; stdout carries only the ready line
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&filter));
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!(config = ?args.config, "Loaded configuration");

    awaitdb::run(&config).await?;

    Ok(())
}
