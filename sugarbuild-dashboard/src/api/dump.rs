//! Dump API Handlers
//!
//! The dump index page, its JSON listing, and raw dump downloads.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
};
use chrono::Utc;
use std::sync::Arc;
use sugarbuild_core::dto::dump::DumpSummary;

use crate::DashboardState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::dump_service;

// =============================================================================
// Listing
// =============================================================================

/// GET /build
/// Render the dump index page
pub async fn index(State(state): State<Arc<DashboardState>>) -> ApiResult<Html<String>> {
    let summaries = summaries(&state).await?;
    Ok(Html(render_index(&summaries)))
}

/// GET /build/dumps
/// List available dumps
pub async fn list_dumps(
    State(state): State<Arc<DashboardState>>,
) -> ApiResult<Json<Vec<DumpSummary>>> {
    tracing::debug!("Listing dumps in {}", state.dump_dir.display());
    Ok(Json(summaries(&state).await?))
}

async fn summaries(state: &DashboardState) -> ApiResult<Vec<DumpSummary>> {
    let now = Utc::now();
    let files = dump_service::list_dumps(&state.dump_dir).await?;
    Ok(files
        .iter()
        .map(|file| DumpSummary::from_file(file, now))
        .collect())
}

// =============================================================================
// Download
// =============================================================================

/// GET /build/data/{branch}
/// Serve a dump by its `<branch>_<flavor>` name
pub async fn get_dump(
    State(state): State<Arc<DashboardState>>,
    Path(branch): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let text = dump_service::read_dump(&state.dump_dir, &branch)
        .await?
        .ok_or_else(|| ApiError::MissingDump(branch.clone()))?;

    tracing::info!("Served export file: {}", branch);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

// =============================================================================
// Page Rendering
// =============================================================================

fn render_index(dumps: &[DumpSummary]) -> String {
    let mut rows = String::new();
    for dump in dumps {
        rows.push_str(&format!(
            "      <tr><td><a href=\"/build/data/{link}\">{name}</a></td><td>{flavor}</td><td>{modified}</td><td>{size}</td></tr>\n",
            link = escape(&dump.filename),
            name = escape(&dump.name),
            flavor = escape(&dump.flavor),
            modified = escape(&dump.modified),
            size = escape(&dump.filesize),
        ));
    }

    let body = if dumps.is_empty() {
        "    <p>No data files available.</p>\n".to_string()
    } else {
        format!(
            "    <table>\n      <tr><th>Branch</th><th>Flavor</th><th>Modified</th><th>Size</th></tr>\n{}    </table>\n",
            rows
        )
    };

    format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <title>Sugarbuild</title>\n    <link rel=\"stylesheet\" href=\"/build/css/index.css\">\n  </head>\n  <body>\n    <h1>Data Files</h1>\n{}  </body>\n</html>\n",
        body
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
