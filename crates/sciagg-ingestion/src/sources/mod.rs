//! Literature source clients.

pub mod arxiv;
pub mod biorxiv;
pub mod crossref;
pub mod europepmc;
pub mod rss;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use sciagg_common::{ApiKeys, Article, Source};

use crate::error::{HarvestError, Result};

pub use arxiv::ArxivClient;
pub use biorxiv::PreprintClient;
pub use crossref::CrossrefClient;
pub use europepmc::EuropePmcClient;
pub use rss::RssClient;

/// What a single harvest asks every source for.
#[derive(Debug, Clone)]
pub struct HarvestQuery {
    pub topics: Vec<String>,
    pub days_back: u32,
    pub max_results: usize,
}

impl HarvestQuery {
    pub fn new(topics: Vec<String>, days_back: u32, max_results: usize) -> Self {
        Self { topics, days_back, max_results }
    }

    /// Inclusive `(from, to)` publication window ending today (UTC).
    pub fn date_window(&self) -> (NaiveDate, NaiveDate) {
        let today = Utc::now().date_naive();
        (today - Duration::days(i64::from(self.days_back)), today)
    }

    /// Whether `date` falls inside the window. Undated records are kept.
    pub fn accepts_date(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(d) => d >= self.date_window().0,
            None => true,
        }
    }
}

/// Common interface for all literature source clients.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    fn source(&self) -> Source;

    /// Search for articles matching the query.
    ///
    /// Records that fail to parse are logged and skipped; only request-level
    /// failures surface as errors.
    async fn search(&self, query: &HarvestQuery) -> Result<Vec<Article>>;
}

/// Whether a harvester exists for `source`.
pub fn is_supported(source: Source) -> bool {
    matches!(
        source,
        Source::Arxiv
            | Source::EuropePmc
            | Source::Crossref
            | Source::Biorxiv
            | Source::Medrxiv
            | Source::Rss
    )
}

/// Build the client for `source` from its API-key block.
pub fn build_source(source: Source, keys: &ApiKeys) -> Result<Arc<dyn ArticleSource>> {
    let block = keys.for_source(source);
    let client: Arc<dyn ArticleSource> = match source {
        Source::Arxiv     => Arc::new(ArxivClient::new(block)?),
        Source::EuropePmc => Arc::new(EuropePmcClient::new(block)?),
        Source::Crossref  => Arc::new(CrossrefClient::new(block)?),
        Source::Biorxiv   => Arc::new(PreprintClient::new(Source::Biorxiv, block)?),
        Source::Medrxiv   => Arc::new(PreprintClient::new(Source::Medrxiv, block)?),
        Source::Rss       => Arc::new(RssClient::new(block)?),
        Source::Lens | Source::Ieee => return Err(HarvestError::Unsupported(source)),
    };
    Ok(client)
}

/// First string in a JSON array field, trimmed.
pub(crate) fn first_str(value: &serde_json::Value) -> Option<String> {
    value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a `YYYY-MM-DD` prefix, tolerating trailing time parts.
pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_source_rejects_unimplemented() {
        let keys = ApiKeys::default();
        assert!(matches!(
            build_source(Source::Lens, &keys),
            Err(HarvestError::Unsupported(Source::Lens))
        ));
        assert_eq!(build_source(Source::Medrxiv, &keys).unwrap().source(), Source::Medrxiv);
        assert_eq!(build_source(Source::Rss, &keys).unwrap().source(), Source::Rss);
        assert!(is_supported(Source::Rss));
    }

    #[test]
    fn test_accepts_date_keeps_undated() {
        let query = HarvestQuery::new(vec![], 7, 10);
        let today = Utc::now().date_naive();
        assert!(query.accepts_date(None));
        assert!(query.accepts_date(Some(today)));
        assert!(!query.accepts_date(Some(today - Duration::days(30))));
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2024-02-29T10:00:00Z"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_iso_date("2024-13-01"), None);
        assert_eq!(parse_iso_date("2024"), None);
    }
}
