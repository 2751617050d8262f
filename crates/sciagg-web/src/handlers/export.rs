//! Article export download.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use sciagg_db::ArticleRepository;
use sciagg_processor::{export_articles, ExportFormat};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::handlers::articles::ArticleQuery;
use crate::state::SharedState;

const EXPORT_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_format")]
    pub format: String,
    pub q: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub processed: bool,
}

impl ExportQuery {
    fn filter(&self) -> ArticleQuery {
        ArticleQuery {
            q: self.q.clone(),
            source: self.source.clone(),
            status: self.status.clone(),
            processed: self.processed,
            ..Default::default()
        }
    }
}

fn default_format() -> String {
    "json".into()
}

/// GET /api/export?format=markdown|json|csv plus the article filters.
pub async fn export(
    State(state): State<SharedState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format = ExportFormat::from_str(&query.format).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let filter = query.filter().to_filter(EXPORT_LIMIT)?;
    let articles = ArticleRepository::new(state.db.clone()).list(&filter).await?;
    let body = export_articles(&articles, format).map_err(|e| ApiError::Internal(e.into()))?;

    let disposition = format!("attachment; filename=\"articles.{}\"", format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
