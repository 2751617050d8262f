//! Crossref works search client.
//!
//! API: https://api.crossref.org/works
//! Polite pool: pass `mailto` (see Crossref etiquette).

use async_trait::async_trait;
use chrono::NaiveDate;
use sciagg_common::config::SourceKeys;
use sciagg_common::text::strip_markup;
use sciagg_common::{Article, Source};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{first_str, ArticleSource, HarvestQuery};
use crate::error::Result;
use crate::http::HttpClient;

const MAX_ROWS: usize = 100;
const MAX_PAGES: usize = 20;
const FALLBACK_QUERY: &str = "bioinformatics OR \"computational biology\"";

pub struct CrossrefClient {
    http: HttpClient,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefClient {
    pub fn new(keys: &SourceKeys) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(Source::Crossref, keys.rate_limit)?,
            base_url: keys.base_url.trim_end_matches('/').to_string(),
            mailto: keys.mailto.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ArticleSource for CrossrefClient {
    fn source(&self) -> Source {
        Source::Crossref
    }

    #[instrument(skip(self), fields(topics = query.topics.len()))]
    async fn search(&self, query: &HarvestQuery) -> Result<Vec<Article>> {
        let (from, _) = query.date_window();
        let search_query = build_search_query(&query.topics);
        let url = format!("{}/works", self.base_url);
        let mut articles: Vec<Article> = Vec::new();
        let mut offset = 0usize;

        for page in 0..MAX_PAGES {
            if articles.len() >= query.max_results {
                break;
            }
            let rows = (query.max_results - articles.len()).min(MAX_ROWS);
            let mut params = vec![
                ("query", search_query.clone()),
                ("rows", rows.to_string()),
                ("offset", offset.to_string()),
                ("sort", "published".to_string()),
                ("order", "desc".to_string()),
            ];
            if query.days_back > 0 {
                params.push(("filter", format!("from-pub-date:{}", from.format("%Y-%m-%d"))));
            }
            if let Some(mailto) = &self.mailto {
                params.push(("mailto", mailto.clone()));
            }

            let body = self.http.get_json(&url, &params).await?;
            let items = body["message"]["items"].as_array().cloned().unwrap_or_default();
            articles.extend(items.iter().filter_map(work_to_article));
            offset += items.len();
            debug!(page, fetched = items.len(), kept = articles.len(), "Crossref page parsed");
            if items.len() < rows {
                break;
            }
        }

        articles.truncate(query.max_results);
        Ok(articles)
    }
}

pub fn build_search_query(topics: &[String]) -> String {
    let quoted: Vec<String> = topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    if quoted.is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        quoted.join(" OR ")
    }
}

// ── Conversion ───────────────────────────────────────────────────────────────

fn date_parts(value: &Value) -> Option<NaiveDate> {
    let parts = value["date-parts"].as_array()?.first()?.as_array()?;
    let year  = parts.first()?.as_i64()? as i32;
    let month = parts.get(1).and_then(|m| m.as_u64()).unwrap_or(1) as u32;
    let day   = parts.get(2).and_then(|d| d.as_u64()).unwrap_or(1) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Convert one `message.items[]` work. Works without a DOI are skipped.
pub fn work_to_article(work: &Value) -> Option<Article> {
    let doi = work["DOI"].as_str().map(str::trim).filter(|d| !d.is_empty())?;

    let title = first_str(&work["title"]).map(|t| strip_markup(&t)).unwrap_or_default();
    if title.is_empty() {
        warn!(doi, "Skipping Crossref work with empty title");
        return None;
    }

    let mut article = Article::new(Source::Crossref, doi, title);
    article.doi = Some(doi.to_string());
    article.url = work["URL"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| format!("https://doi.org/{doi}"));
    // Abstracts arrive as JATS XML snippets.
    article.abstract_text = work["abstract"].as_str().map(strip_markup).unwrap_or_default();

    for author in work["author"].as_array().into_iter().flatten() {
        let given  = author["given"].as_str().unwrap_or("").trim();
        let family = author["family"].as_str().unwrap_or("").trim();
        let name = format!("{given} {family}").trim().to_string();
        if !name.is_empty() {
            article.authors.push(name);
        }
        for aff in author["affiliation"].as_array().into_iter().flatten() {
            if let Some(inst) = aff["name"].as_str().map(str::trim).filter(|s| !s.is_empty()) {
                if !article.institutions.iter().any(|i| i == inst) {
                    article.institutions.push(inst.to_string());
                }
            }
        }
    }

    article.publication_date = date_parts(&work["published-print"])
        .or_else(|| date_parts(&work["published-online"]))
        .or_else(|| date_parts(&work["issued"]));

    article.topics = work["subject"]
        .as_array()
        .map(|subjects| {
            subjects
                .iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    if article.topics.is_empty() {
        article.topics.push(work["type"].as_str().unwrap_or("article").to_string());
    }

    Some(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_work_to_article() {
        let work = json!({
            "DOI": "10.1101/2024.01.01.123456",
            "title": ["Single-cell atlas of the root"],
            "abstract": "<jats:p>We profile <jats:italic>Arabidopsis</jats:italic> roots.</jats:p>",
            "author": [
                {"given": "Barbara", "family": "McClintock",
                 "affiliation": [{"name": "Cold Spring Harbor Laboratory"}]},
                {"family": "Mendel"}
            ],
            "published-online": {"date-parts": [[2024, 1, 4]]},
            "issued": {"date-parts": [[2024]]},
            "type": "journal-article"
        });

        let a = work_to_article(&work).unwrap();
        assert_eq!(a.id, "crossref:10.1101/2024.01.01.123456");
        assert_eq!(a.url, "https://doi.org/10.1101/2024.01.01.123456");
        assert_eq!(a.abstract_text, "We profile Arabidopsis roots.");
        assert_eq!(a.authors, vec!["Barbara McClintock", "Mendel"]);
        assert_eq!(a.institutions, vec!["Cold Spring Harbor Laboratory"]);
        assert_eq!(a.publication_date, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(a.topics, vec!["journal-article"]);
    }

    #[test]
    fn test_work_without_doi_is_skipped() {
        assert!(work_to_article(&json!({"title": ["x"]})).is_none());
    }

    #[test]
    fn test_issued_year_only() {
        let work = json!({"DOI": "10.1/x", "title": ["T"], "issued": {"date-parts": [[2023]]},
                          "subject": ["Genetics"]});
        let a = work_to_article(&work).unwrap();
        assert_eq!(a.publication_date, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(a.topics, vec!["Genetics"]);
    }

    #[test]
    fn test_query_quotes_topics() {
        let q = build_search_query(&["genomics".into(), "machine learning".into()]);
        assert_eq!(q, "\"genomics\" OR \"machine learning\"");
    }
}
