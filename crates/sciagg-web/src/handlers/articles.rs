//! Article table, detail page, save/discard and related articles.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::Json;
use sciagg_common::text::truncate_words;
use sciagg_common::{Article, ArticleStatus, Source};
use sciagg_db::{ArticleFilter, ArticleRepository};
use sciagg_kg::{KgService, RelatedArticle};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;
use crate::templates::{query_prefix, render};

pub const PAGE_SIZE: usize = 25;
const MAX_PAGE_SIZE: usize = 500;
const RELATED_MAX: usize = 8;
const SNIPPET_WORDS: usize = 30;

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ArticleQuery {
    pub q: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub page: usize,
    pub limit: Option<usize>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ArticleQuery {
    pub fn to_filter(&self, default_limit: usize) -> ApiResult<ArticleFilter> {
        let source = non_empty(&self.source)
            .map(Source::from_str)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let status = non_empty(&self.status)
            .map(ArticleStatus::from_str)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
        Ok(ArticleFilter {
            source,
            status,
            search: non_empty(&self.q).map(str::to_string),
            processed_only: self.processed,
            offset: self.page * limit,
            limit,
        })
    }
}

// ── Views ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ArticleRow<'a> {
    id: &'a str,
    title: &'a str,
    source: &'static str,
    publication_date: Option<String>,
    snippet: String,
    status: &'static str,
}

impl<'a> From<&'a Article> for ArticleRow<'a> {
    fn from(a: &'a Article) -> Self {
        Self {
            id: &a.id,
            title: &a.title,
            source: a.source.display_name(),
            publication_date: a.publication_date.map(|d| d.to_string()),
            snippet: a.summary.as_deref().map(|s| truncate_words(s, SNIPPET_WORDS)).unwrap_or_default(),
            status: a.status.as_str(),
        }
    }
}

// ── Pages ─────────────────────────────────────────────────────────────────────

/// GET /articles
pub async fn articles_page(
    State(state): State<SharedState>,
    Query(query): Query<ArticleQuery>,
) -> ApiResult<Html<String>> {
    let mut filter = query.to_filter(PAGE_SIZE)?;
    // One extra row tells whether there is a next page.
    filter.limit += 1;
    let mut articles = ArticleRepository::new(state.db.clone()).list(&filter).await?;
    let has_more = articles.len() >= filter.limit;
    articles.truncate(filter.limit - 1);

    let rows: Vec<ArticleRow> = articles.iter().map(ArticleRow::from).collect();
    let sources: Vec<_> = Source::ALL
        .iter()
        .map(|s| json!({ "id": s.as_str(), "name": s.display_name() }))
        .collect();
    let filter_qs = query_prefix(&[
        ("q", non_empty(&query.q)),
        ("source", non_empty(&query.source)),
        ("status", non_empty(&query.status)),
    ]);

    let html = render(
        "articles.html",
        json!({
            "articles": rows,
            "sources": sources,
            "query": query,
            "page": query.page,
            "has_more": has_more,
            "filter_qs": filter_qs,
        }),
    )?;
    Ok(Html(html))
}

/// GET /articles/{*id}
pub async fn article_page(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let article = find(&state, &id).await?;
    let related = KgService::new(state.db.clone()).related(&id, RELATED_MAX).await?;
    let html = render("article.html", json!({ "article": article, "related": related }))?;
    Ok(Html(html))
}

// ── API ───────────────────────────────────────────────────────────────────────

/// GET /api/articles
pub async fn api_articles(
    State(state): State<SharedState>,
    Query(query): Query<ArticleQuery>,
) -> ApiResult<Json<Vec<Article>>> {
    let filter = query.to_filter(PAGE_SIZE)?;
    Ok(Json(ArticleRepository::new(state.db.clone()).list(&filter).await?))
}

/// GET /api/articles/{*id}
pub async fn api_article(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Article>> {
    Ok(Json(find(&state, &id).await?))
}

/// GET /api/related/{*id}
pub async fn api_related(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<RelatedArticle>>> {
    find(&state, &id).await?;
    Ok(Json(KgService::new(state.db.clone()).related(&id, RELATED_MAX).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub status: String,
}

/// POST /api/status. The only user edit: save, discard or reset an article.
pub async fn api_set_status(
    State(state): State<SharedState>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<serde_json::Value>> {
    let status = ArticleStatus::from_str(update.status.trim())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let found = ArticleRepository::new(state.db.clone()).set_status(&update.id, status).await?;
    if !found {
        return Err(ApiError::NotFound(update.id));
    }
    Ok(Json(json!({ "id": update.id, "status": status.as_str() })))
}

async fn find(state: &SharedState, id: &str) -> ApiResult<Article> {
    ArticleRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}
