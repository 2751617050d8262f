//! sciagg-web — dashboard for the article store.
//!
//! Provides:
//!   - Overview cards and per-source counts
//!   - Article table with search, filters and save/discard
//!   - Collect, process and rebuild actions with live SSE progress
//!   - Knowledge graph view and JSON API
//!   - Markdown, JSON and CSV export

pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
pub mod templates;

use std::future::Future;

use anyhow::Context;
use tracing::info;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::{AppEvent, AppState};

/// Bind `addr` and serve the dashboard until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding dashboard to {addr}"))?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("dashboard server")?;
    Ok(())
}
