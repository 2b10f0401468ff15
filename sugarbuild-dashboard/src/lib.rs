//! Sugarbuild Dashboard
//!
//! A small web server listing the database dumps in the dump directory
//! and serving them to other hosts, which import them by branch.

pub mod api;
pub mod service;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Directories the dashboard serves from
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Directory holding `<branch>_<flavor>.sql` dumps
    pub dump_dir: PathBuf,
    /// Directory of stylesheets served under `/build/css`
    pub static_dir: PathBuf,
}

/// Serves the dashboard on all interfaces until the process exits
pub async fn serve(port: u16, state: DashboardState) -> std::io::Result<()> {
    let app = api::create_router(Arc::new(state));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Dashboard listening on http://localhost:{}", port);

    axum::serve(listener, app).await
}
