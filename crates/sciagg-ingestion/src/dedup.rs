//! In-batch deduplication of harvested articles.
//!
//! Stage 1: normalized DOI exact match (primary)
//! Stage 2: normalized URL exact match (secondary)
//!
//! Duplicates against rows already stored are handled by the repository
//! (`(source, external_id)` uniqueness and the DOI lookup in `insert_batch`).

use std::collections::HashSet;

use sciagg_common::Article;
use url::Url;

/// Result of a deduplication check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupResult {
    /// Article is new; keep it.
    New,
    /// Same normalized DOI as an earlier article in the batch.
    DuplicateDoi(String),
    /// Same normalized URL as an earlier article in the batch.
    DuplicateUrl(String),
}

/// Lowercase, drop resolver prefixes and surrounding whitespace.
pub fn normalize_doi(doi: &str) -> Option<String> {
    let mut d = doi.trim().to_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"] {
        if let Some(rest) = d.strip_prefix(prefix) {
            d = rest.trim().to_string();
        }
    }
    (!d.is_empty()).then_some(d)
}

/// Scheme-less, `www.`-less, lowercase host, no fragment, no trailing slash.
pub fn normalize_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => {
            let host = url.host_str()?.to_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
            let path = url.path().trim_end_matches('/');
            let mut out = format!("{host}{path}");
            if let Some(q) = url.query() {
                out.push('?');
                out.push_str(q);
            }
            Some(out)
        }
        Err(_) => Some(raw.trim_end_matches('/').to_lowercase()),
    }
}

/// Tracks the keys seen so far in one batch.
#[derive(Debug, Default)]
pub struct Deduplicator {
    dois: HashSet<String>,
    urls: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `article` against everything seen so far, then remember its keys
    /// if it is new.
    pub fn check(&mut self, article: &Article) -> DedupResult {
        let doi = article.doi.as_deref().and_then(normalize_doi);
        let url = normalize_url(&article.url);

        if let Some(doi) = &doi {
            if self.dois.contains(doi) {
                return DedupResult::DuplicateDoi(doi.clone());
            }
        }
        if let Some(url) = &url {
            if self.urls.contains(url) {
                return DedupResult::DuplicateUrl(url.clone());
            }
        }

        if let Some(doi) = doi {
            self.dois.insert(doi);
        }
        if let Some(url) = url {
            self.urls.insert(url);
        }
        DedupResult::New
    }
}

/// Keep the first occurrence of every DOI/URL. Returns the survivors and the
/// number of dropped duplicates.
pub fn dedup_articles(articles: Vec<Article>) -> (Vec<Article>, usize) {
    let mut dedup = Deduplicator::new();
    let before = articles.len();
    let kept: Vec<Article> = articles
        .into_iter()
        .filter(|a| dedup.check(a) == DedupResult::New)
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sciagg_common::Source;

    fn article(source: Source, id: &str, doi: Option<&str>, url: &str) -> Article {
        let mut a = Article::new(source, id, format!("Title {id}"));
        a.doi = doi.map(String::from);
        a.url = url.to_string();
        a
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi(" https://doi.org/10.1000/ABC "), Some("10.1000/abc".into()));
        assert_eq!(normalize_doi("doi:10.1/x"), Some("10.1/x".into()));
        assert_eq!(normalize_doi("   "), None);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://www.Example.org/content/1/#frag"),
            Some("example.org/content/1".into())
        );
        assert_eq!(normalize_url("http://example.org/a"), normalize_url("https://example.org/a/"));
        assert_eq!(normalize_url(""), None);
    }

    #[test]
    fn test_dedup_across_sources() {
        let batch = vec![
            article(Source::Crossref, "10.1/a", Some("10.1/A"), "https://doi.org/10.1/a"),
            article(Source::Biorxiv, "10.1/a", Some("10.1/a"), "https://www.biorxiv.org/content/10.1/a"),
            article(Source::Arxiv, "2401.1", None, "http://arxiv.org/abs/2401.1"),
            article(Source::EuropePmc, "PMC1", None, "https://arxiv.org/abs/2401.1/"),
            article(Source::EuropePmc, "PMC2", None, "https://europepmc.org/article/PMC/2"),
        ];
        let (kept, removed) = dedup_articles(batch);
        assert_eq!(removed, 2);
        let ids: Vec<_> = kept.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["crossref:10.1/a", "arxiv:2401.1", "europepmc:PMC2"]);
    }

    #[test]
    fn test_check_reports_reason() {
        let mut d = Deduplicator::new();
        let a = article(Source::Crossref, "x", Some("10.9/z"), "https://a.org/1");
        let b = article(Source::Arxiv, "y", Some("10.9/Z"), "https://b.org/2");
        assert_eq!(d.check(&a), DedupResult::New);
        assert_eq!(d.check(&b), DedupResult::DuplicateDoi("10.9/z".into()));
    }
}
