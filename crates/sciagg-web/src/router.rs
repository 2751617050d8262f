//! Axum router: maps URL paths to handlers.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    actions::{collect, process, rebuild},
    articles::{api_article, api_articles, api_related, api_set_status, article_page, articles_page},
    dashboard::{api_stats, dashboard},
    export::export,
    graph::{api_graph, api_graph_stats, graph_page},
};
use crate::sse::sse_handler;
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
///
/// Article ids may contain `/` (DOIs), so routes taking an id capture the
/// rest of the path.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",               get(dashboard))
        .route("/articles",       get(articles_page))
        .route("/articles/{*id}", get(article_page))
        .route("/graph",          get(graph_page))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // API endpoints
        .route("/api/stats",           get(api_stats))
        .route("/api/articles",        get(api_articles))
        .route("/api/articles/{*id}",  get(api_article))
        .route("/api/related/{*id}",   get(api_related))
        .route("/api/status",          post(api_set_status))
        .route("/api/graph",           get(api_graph))
        .route("/api/graph/stats",     get(api_graph_stats))
        .route("/api/export",          get(export))
        .route("/api/actions/collect", post(collect))
        .route("/api/actions/process", post(process))
        .route("/api/actions/rebuild", post(rebuild))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
