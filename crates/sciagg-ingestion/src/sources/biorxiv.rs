//! bioRxiv / medRxiv preprint client.
//!
//! The `details` endpoint lists every preprint posted in a date interval, 100
//! per page, with no server-side search. Topics are matched client side.

use std::collections::HashMap;

use async_trait::async_trait;
use sciagg_common::config::SourceKeys;
use sciagg_common::text::collapse_whitespace;
use sciagg_common::{Article, Source};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{parse_iso_date, ArticleSource, HarvestQuery};
use crate::error::Result;
use crate::http::HttpClient;

/// Upper bound on pages walked per search.
const MAX_PAGES: usize = 20;

/// Topic (lowercase) → server categories it should match.
const CATEGORY_MAP: &[(&str, &[&str])] = &[
    ("bioinformatics",             &["bioinformatics", "computational biology", "systems biology"]),
    ("computational biology",      &["bioinformatics", "computational biology", "systems biology"]),
    ("programming biology",        &["bioinformatics", "computational biology"]),
    ("biological data analysis",   &["bioinformatics", "systems biology"]),
    ("plant-microbe interactions", &["plant biology", "microbiology", "ecology"]),
    ("plant microorganism",        &["plant biology", "microbiology", "ecology"]),
    ("scientific education",       &["scientific communication and education"]),
    ("science education",          &["scientific communication and education"]),
    ("science communication",      &["scientific communication and education"]),
];

pub struct PreprintClient {
    http: HttpClient,
    base_url: String,
    server: Source,
}

impl PreprintClient {
    /// `server` must be [`Source::Biorxiv`] or [`Source::Medrxiv`].
    pub fn new(server: Source, keys: &SourceKeys) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(server, keys.rate_limit)?,
            base_url: keys.base_url.trim_end_matches('/').to_string(),
            server,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ArticleSource for PreprintClient {
    fn source(&self) -> Source {
        self.server
    }

    #[instrument(skip(self), fields(server = %self.server))]
    async fn search(&self, query: &HarvestQuery) -> Result<Vec<Article>> {
        let (from, to) = query.date_window();
        let topics: Vec<String> = query
            .topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut articles: Vec<Article> = Vec::new();
        let mut by_doi: HashMap<String, usize> = HashMap::new();
        let mut cursor = 0usize;

        for page in 0..MAX_PAGES {
            let url = format!(
                "{}/details/{}/{}/{}/{}",
                self.base_url,
                self.server.as_str(),
                from.format("%Y-%m-%d"),
                to.format("%Y-%m-%d"),
                cursor,
            );
            let body = self.http.get_json(&url, &[]).await?;
            let collection = body["collection"].as_array().cloned().unwrap_or_default();
            if collection.is_empty() {
                break;
            }

            for item in collection.iter().filter(|item| matches_topics(item, &topics)) {
                let Some(article) = item_to_article(item, self.server) else { continue };
                // The same DOI is listed once per version; keep the latest.
                match by_doi.get(&article.external_id) {
                    Some(&idx) => articles[idx] = article,
                    None => {
                        by_doi.insert(article.external_id.clone(), articles.len());
                        articles.push(article);
                    }
                }
            }

            cursor += collection.len();
            let total = total_count(&body).unwrap_or(cursor);
            debug!(page, cursor, total, matched = articles.len(), "Preprint page fetched");
            if articles.len() >= query.max_results || cursor >= total {
                break;
            }
        }

        articles.truncate(query.max_results);
        Ok(articles)
    }
}

fn total_count(body: &Value) -> Option<usize> {
    let total = &body["messages"][0]["total"];
    total
        .as_u64()
        .map(|n| n as usize)
        .or_else(|| total.as_str().and_then(|s| s.trim().parse().ok()))
}

fn category_matches(topic: &str, category: &str) -> bool {
    CATEGORY_MAP
        .iter()
        .find(|(name, _)| *name == topic)
        .is_some_and(|(_, cats)| cats.iter().any(|c| category.contains(c)))
}

/// Client-side topic filter. `topics` must already be lowercase; an empty
/// list accepts everything.
pub fn matches_topics(item: &Value, topics: &[String]) -> bool {
    if topics.is_empty() {
        return true;
    }
    let title = item["title"].as_str().unwrap_or_default().to_lowercase();
    let abstract_text = item["abstract"].as_str().unwrap_or_default().to_lowercase();
    let category = item["category"].as_str().unwrap_or_default().to_lowercase();

    topics.iter().any(|topic| {
        title.contains(topic.as_str())
            || abstract_text.contains(topic.as_str())
            || category.contains(topic.as_str())
            || category_matches(topic, &category)
    })
}

// ── Conversion ───────────────────────────────────────────────────────────────

pub fn item_to_article(item: &Value, server: Source) -> Option<Article> {
    let doi = item["doi"].as_str().map(str::trim).filter(|d| !d.is_empty())?;
    let title = collapse_whitespace(item["title"].as_str().unwrap_or_default());
    if title.is_empty() {
        warn!(doi, "Skipping preprint with empty title");
        return None;
    }

    let mut article = Article::new(server, doi, title);
    article.doi = Some(doi.to_string());
    article.url = format!("https://www.{}.org/content/{doi}", server.as_str());
    article.abstract_text = collapse_whitespace(item["abstract"].as_str().unwrap_or_default());
    // "Last, F.; Other, A.": commas belong to the names.
    article.authors = item["authors"]
        .as_str()
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect();
    if let Some(inst) = item["author_corresponding_institution"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        article.institutions.push(inst.to_string());
    }
    article.publication_date = item["date"].as_str().and_then(parse_iso_date);
    if let Some(category) = item["category"].as_str().map(str::trim).filter(|s| !s.is_empty()) {
        article.topics.push(category.to_string());
    }
    Some(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn item() -> Value {
        json!({
            "doi": "10.1101/2024.01.02.573900",
            "title": "Root  microbiome assembly",
            "authors": "Darwin, C.; Wallace, A. R.;",
            "author_corresponding_institution": "Down House",
            "date": "2024-01-03",
            "version": "1",
            "category": "plant biology",
            "abstract": "We follow colonisation of roots."
        })
    }

    #[test]
    fn test_item_to_article() {
        let a = item_to_article(&item(), Source::Biorxiv).unwrap();
        assert_eq!(a.id, "biorxiv:10.1101/2024.01.02.573900");
        assert_eq!(a.url, "https://www.biorxiv.org/content/10.1101/2024.01.02.573900");
        assert_eq!(a.title, "Root microbiome assembly");
        assert_eq!(a.authors, vec!["Darwin, C.", "Wallace, A. R."]);
        assert_eq!(a.institutions, vec!["Down House"]);
        assert_eq!(a.topics, vec!["plant biology"]);
        assert_eq!(a.publication_date, NaiveDate::from_ymd_opt(2024, 1, 3));
    }

    #[test]
    fn test_topic_filter_uses_category_map() {
        let it = item();
        assert!(matches_topics(&it, &[]));
        assert!(matches_topics(&it, &["plant-microbe interactions".to_string()]));
        assert!(matches_topics(&it, &["colonisation".to_string()]));
        assert!(!matches_topics(&it, &["bioinformatics".to_string()]));
    }

    #[test]
    fn test_total_count_accepts_string() {
        assert_eq!(total_count(&json!({"messages": [{"total": "250"}]})), Some(250));
        assert_eq!(total_count(&json!({"messages": [{"total": 7}]})), Some(7));
        assert_eq!(total_count(&json!({})), None);
    }
}
