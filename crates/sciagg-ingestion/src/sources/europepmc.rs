//! Europe PMC REST API client.
//!
//! Base URL: https://www.ebi.ac.uk/europepmc/webservices/rest
//! No key required; an optional contact `email` is sent with each request.

use async_trait::async_trait;
use chrono::NaiveDate;
use sciagg_common::config::SourceKeys;
use sciagg_common::text::strip_markup;
use sciagg_common::{Article, Source};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{parse_iso_date, ArticleSource, HarvestQuery};
use crate::error::Result;
use crate::http::HttpClient;

const MAX_PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 20;
const FIRST_CURSOR: &str = "*";
const FALLBACK_QUERY: &str = "bioinformatics OR \"computational biology\"";

pub struct EuropePmcClient {
    http: HttpClient,
    base_url: String,
    email: Option<String>,
}

impl EuropePmcClient {
    pub fn new(keys: &SourceKeys) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(Source::EuropePmc, keys.rate_limit)?,
            base_url: keys.base_url.trim_end_matches('/').to_string(),
            email: keys.email.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ArticleSource for EuropePmcClient {
    fn source(&self) -> Source {
        Source::EuropePmc
    }

    #[instrument(skip(self), fields(topics = query.topics.len()))]
    async fn search(&self, query: &HarvestQuery) -> Result<Vec<Article>> {
        let (from, to) = query.date_window();
        let search_query = build_search_query(&query.topics, from, to);
        let url = format!("{}/search", self.base_url);
        let mut articles: Vec<Article> = Vec::new();
        let mut cursor = FIRST_CURSOR.to_string();

        for page in 0..MAX_PAGES {
            if articles.len() >= query.max_results {
                break;
            }
            let page_size = (query.max_results - articles.len()).min(MAX_PAGE_SIZE);
            let mut params = vec![
                ("query", search_query.clone()),
                ("format", "json".to_string()),
                ("resultType", "core".to_string()),
                ("pageSize", page_size.to_string()),
                ("sort", "FIRST_PDATE desc".to_string()),
                ("cursorMark", cursor.clone()),
            ];
            if let Some(email) = &self.email {
                params.push(("email", email.clone()));
            }

            let body = self.http.get_json(&url, &params).await?;
            let results = body["resultList"]["result"].as_array().cloned().unwrap_or_default();
            articles.extend(results.iter().filter_map(result_to_article));
            debug!(page, fetched = results.len(), kept = articles.len(), "Europe PMC page parsed");

            match body["nextCursorMark"].as_str() {
                Some(next) if next != cursor && results.len() >= page_size => cursor = next.to_string(),
                _ => break,
            }
        }

        articles.truncate(query.max_results);
        Ok(articles)
    }
}

/// Title/abstract phrase search restricted to the window and open access.
pub fn build_search_query(topics: &[String], from: NaiveDate, to: NaiveDate) -> String {
    let terms: Vec<String> = topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("(TITLE:\"{t}\" OR ABSTRACT:\"{t}\")"))
        .collect();

    let topics_query = if terms.is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        terms.join(" OR ")
    };

    format!(
        "({topics_query}) AND FIRST_PDATE:[{} TO {}] AND OPEN_ACCESS:Y",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d"),
    )
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value[key]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ── Conversion ───────────────────────────────────────────────────────────────

/// Convert one `resultList.result[]` entry. Records with neither PMCID nor PMID
/// are skipped.
pub fn result_to_article(result: &Value) -> Option<Article> {
    let pmcid = str_field(result, "pmcid");
    let pmid = str_field(result, "pmid");

    let (external_id, url) = match (&pmcid, &pmid) {
        (Some(pmc), _) => (
            pmc.clone(),
            format!("https://europepmc.org/article/PMC/{}", pmc.trim_start_matches("PMC")),
        ),
        (None, Some(med)) => (med.clone(), format!("https://europepmc.org/article/MED/{med}")),
        (None, None) => {
            warn!("Skipping Europe PMC record without PMCID or PMID");
            return None;
        }
    };

    let title = strip_markup(result["title"].as_str().unwrap_or_default());
    if title.is_empty() {
        warn!(external_id, "Skipping Europe PMC record with empty title");
        return None;
    }

    let mut article = Article::new(Source::EuropePmc, external_id, title);
    article.url = url;
    article.doi = str_field(result, "doi");
    article.abstract_text = strip_markup(result["abstractText"].as_str().unwrap_or_default());
    article.publication_date = result["firstPublicationDate"].as_str().and_then(parse_iso_date);

    let authors = result["authorList"]["author"].as_array().cloned().unwrap_or_default();
    for author in &authors {
        let name = str_field(author, "fullName").or_else(|| {
            let first = author["firstName"].as_str().unwrap_or_default();
            let last = author["lastName"].as_str().unwrap_or_default();
            let joined = format!("{first} {last}").trim().to_string();
            (!joined.is_empty()).then_some(joined)
        });
        if let Some(name) = name {
            article.authors.push(name);
        }

        let affiliations = author["authorAffiliationDetailsList"]["authorAffiliation"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        for aff in affiliations.iter().filter_map(|a| str_field(a, "affiliation")) {
            if !article.institutions.contains(&aff) {
                article.institutions.push(aff);
            }
        }
    }

    article.topics = result["meshHeadingList"]["meshHeading"]
        .as_array()
        .map(|headings| {
            headings
                .iter()
                .filter_map(|h| str_field(h, "descriptorName"))
                .collect()
        })
        .unwrap_or_default();
    if article.topics.is_empty() {
        if let Some(journal) = str_field(&result["journalInfo"]["journal"], "title") {
            article.topics.push(journal);
        }
    }

    Some(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_shape() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let q = build_search_query(&["genomics".to_string()], from, to);
        assert_eq!(
            q,
            "((TITLE:\"genomics\" OR ABSTRACT:\"genomics\")) AND FIRST_PDATE:[2024-01-01 TO 2024-01-08] AND OPEN_ACCESS:Y"
        );
        assert!(build_search_query(&[], from, to).starts_with("(bioinformatics OR"));
    }

    #[test]
    fn test_result_prefers_pmcid() {
        let result = json!({
            "pmid": "38000001",
            "pmcid": "PMC10000001",
            "doi": "10.1000/xyz",
            "title": "Gut <i>microbiome</i> maps",
            "abstractText": "<h4>Background</h4>We sequenced samples.",
            "firstPublicationDate": "2024-01-05",
            "authorList": {"author": [
                {"fullName": "Rosalind Franklin",
                 "authorAffiliationDetailsList": {"authorAffiliation": [{"affiliation": "King's College London"}]}},
                {"firstName": "Francis", "lastName": "Crick"}
            ]},
            "journalInfo": {"journal": {"title": "Microbiome"}}
        });

        let a = result_to_article(&result).unwrap();
        assert_eq!(a.id, "europepmc:PMC10000001");
        assert_eq!(a.url, "https://europepmc.org/article/PMC/10000001");
        assert_eq!(a.title, "Gut microbiome maps");
        assert_eq!(a.abstract_text, "Background We sequenced samples.");
        assert_eq!(a.authors, vec!["Rosalind Franklin", "Francis Crick"]);
        assert_eq!(a.institutions, vec!["King's College London"]);
        assert_eq!(a.topics, vec!["Microbiome"]);
        assert_eq!(a.publication_date, NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn test_result_falls_back_to_pmid_and_mesh() {
        let result = json!({
            "pmid": "123",
            "title": "A title",
            "meshHeadingList": {"meshHeading": [{"descriptorName": "Genomics"}]}
        });
        let a = result_to_article(&result).unwrap();
        assert_eq!(a.url, "https://europepmc.org/article/MED/123");
        assert_eq!(a.topics, vec!["Genomics"]);
        assert!(result_to_article(&json!({"title": "no ids"})).is_none());
    }
}
