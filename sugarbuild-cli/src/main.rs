//! Sugarbuild CLI
//!
//! Builds, installs and keeps a SugarCRM checkout in sync, or runs as a
//! scheduled build service. Any configuration key can be overridden with
//! `--<key>=<value>`.

mod commands;
mod summary;
mod version;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, Mode, handle_command};
use std::path::PathBuf;
use sugarbuild_core::domain::config::split_overrides;
use sugarbuild_runner::config::load_config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sugarbuild")]
#[command(version)]
#[command(about = "SugarCRM build, install and sync tool", long_about = None)]
#[command(after_help = "Any configuration key can be overridden with --<key>=<value>, e.g. --flavor=pro --buildSugar=false")]
struct Cli {
    /// Configuration file
    #[arg(long, env = "SUGARBUILD_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Mode to run; chosen from the configuration when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let (overrides, args) = split_overrides(std::env::args());
    let cli = Cli::parse_from(args);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sugarbuild=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli.config, &overrides)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let mode = Mode::resolve(cli.command, &config);
    handle_command(mode, config).await
}
