//! Knowledge graph page and API.

use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use sciagg_kg::{GraphStats, KgService, KnowledgeGraph};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::SharedState;
use crate::templates::render;

const EDGE_TABLE_ROWS: usize = 30;

/// GET /graph
pub async fn graph_page(State(state): State<SharedState>) -> ApiResult<Html<String>> {
    let graph = KgService::new(state.db.clone()).load().await?;
    let stats = GraphStats::compute(&graph.nodes, &graph.edges);

    let mut edges = graph.edges;
    edges.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| (&a.source, &a.target).cmp(&(&b.source, &b.target))));
    edges.truncate(EDGE_TABLE_ROWS);

    let html = render(
        "graph.html",
        json!({
            "stats": stats,
            "density": format!("{:.3}", stats.density),
            "edges": edges,
        }),
    )?;
    Ok(Html(html))
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphQuery {
    /// Only nodes with at least this frequency (and edges between them).
    pub min_frequency: Option<u32>,
}

/// GET /api/graph
pub async fn api_graph(
    State(state): State<SharedState>,
    Query(query): Query<GraphQuery>,
) -> ApiResult<Json<KnowledgeGraph>> {
    let graph = KgService::new(state.db.clone()).load().await?;
    Ok(Json(match query.min_frequency {
        Some(min) => filter_graph(graph, min),
        None => graph,
    }))
}

/// GET /api/graph/stats
pub async fn api_graph_stats(State(state): State<SharedState>) -> ApiResult<Json<GraphStats>> {
    Ok(Json(KgService::new(state.db.clone()).stats().await?))
}

fn filter_graph(graph: KnowledgeGraph, min_frequency: u32) -> KnowledgeGraph {
    let nodes: Vec<_> = graph.nodes.into_iter().filter(|n| n.frequency >= min_frequency).collect();
    let kept: std::collections::HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let edges = graph
        .edges
        .into_iter()
        .filter(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()))
        .collect();
    KnowledgeGraph { nodes, edges }
}
