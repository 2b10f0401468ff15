//! Dashboard command handlers

use anyhow::{Context, Result};
use colored::*;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_dashboard::DashboardState;
use tokio::task::JoinHandle;

fn state(config: &BuildConfig) -> DashboardState {
    DashboardState {
        dump_dir: config.sql_dump_dir.clone(),
        static_dir: config.static_dir.clone(),
    }
}

fn print_address(config: &BuildConfig) {
    println!(
        "{} {}",
        "Web Server Listening on:".dimmed(),
        format!("http://localhost:{}", config.web_server_port).magenta()
    );
}

/// Serves the dashboard in the foreground
pub async fn run_dashboard(config: &BuildConfig) -> Result<()> {
    print_address(config);
    sugarbuild_dashboard::serve(config.web_server_port, state(config))
        .await
        .with_context(|| format!("Failed to serve on port {}", config.web_server_port))
}

/// Serves the dashboard alongside another mode when `enableWebServer` is set
pub fn spawn_dashboard(config: &BuildConfig) -> Option<JoinHandle<()>> {
    if !config.enable_web_server {
        return None;
    }

    print_address(config);
    let port = config.web_server_port;
    let state = state(config);
    Some(tokio::spawn(async move {
        if let Err(e) = sugarbuild_dashboard::serve(port, state).await {
            tracing::error!("Dashboard stopped: {}", e);
        }
    }))
}
