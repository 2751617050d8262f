//! Dashboard handler: landing page and the stats API.

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use sciagg_common::Article;
use sciagg_db::{ArticleFilter, ArticleRepository, DatabaseStats, RunRecord, RunRepository};
use sciagg_kg::{GraphStats, KgService};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::SharedState;
use crate::templates::render;

const RECENT_ARTICLES: usize = 10;
const RECENT_RUNS: usize = 8;

#[derive(Debug, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub name: &'static str,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub database: DatabaseStats,
    pub sources: Vec<SourceCount>,
    pub graph: GraphStats,
    pub last_runs: Vec<RunRecord>,
    pub action_running: bool,
    /// Feed URLs the `rss` source polls.
    pub rss_feeds: Vec<String>,
}

async fn source_counts(state: &SharedState) -> ApiResult<Vec<SourceCount>> {
    let counts = ArticleRepository::new(state.db.clone()).source_counts().await?;
    Ok(counts
        .into_iter()
        .map(|(source, count)| SourceCount {
            source: source.as_str().to_string(),
            name: source.display_name(),
            count,
        })
        .collect())
}

/// GET /
pub async fn dashboard(State(state): State<SharedState>) -> ApiResult<Html<String>> {
    let stats = state.db.stats().await?;
    let sources = source_counts(&state).await?;
    let recent: Vec<Article> = ArticleRepository::new(state.db.clone())
        .list(&ArticleFilter { limit: RECENT_ARTICLES, ..Default::default() })
        .await?;
    let runs = RunRepository::new(state.db.clone()).recent(RECENT_RUNS).await?;

    let html = render(
        "dashboard.html",
        json!({
            "topics": state.config.settings.topics,
            "stats": stats,
            "sources": sources,
            "recent": recent,
            "runs": runs,
            "rss_feeds": state.config.api_keys.rss.feeds,
            "action_running": state.action_running(),
        }),
    )?;
    Ok(Html(html))
}

/// GET /api/stats
pub async fn api_stats(State(state): State<SharedState>) -> ApiResult<Json<StatsResponse>> {
    Ok(Json(StatsResponse {
        database: state.db.stats().await?,
        sources: source_counts(&state).await?,
        graph: KgService::new(state.db.clone()).stats().await?,
        last_runs: RunRepository::new(state.db.clone()).recent(RECENT_RUNS).await?,
        action_running: state.action_running(),
        rss_feeds: state.config.api_keys.rss.feeds.clone(),
    }))
}
