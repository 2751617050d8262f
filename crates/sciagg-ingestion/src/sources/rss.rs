//! Configured RSS / Atom feeds, parsed with feed-rs.
//!
//! Feeds are curated by the user, so items are not matched against topics;
//! only the date window and `max_results` apply. A feed that fails is logged
//! and skipped unless every configured feed fails.

use async_trait::async_trait;
use feed_rs::model::Entry;
use sciagg_common::config::SourceKeys;
use sciagg_common::text::{collapse_whitespace, strip_markup};
use sciagg_common::{Article, Source};
use tracing::{debug, info, instrument, warn};

use super::{ArticleSource, HarvestQuery};
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;

pub struct RssClient {
    http: HttpClient,
    feeds: Vec<String>,
}

impl RssClient {
    pub fn new(keys: &SourceKeys) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(Source::Rss, keys.rate_limit)?,
            feeds: keys.feeds.iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect(),
        })
    }

    pub fn with_feeds(mut self, feeds: Vec<String>) -> Self {
        self.feeds = feeds;
        self
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<Article>> {
        let xml = self.http.get_text(url, &[]).await?;
        parse_feed(&xml)
    }
}

#[async_trait]
impl ArticleSource for RssClient {
    fn source(&self) -> Source {
        Source::Rss
    }

    #[instrument(skip(self, query), fields(feeds = self.feeds.len()))]
    async fn search(&self, query: &HarvestQuery) -> Result<Vec<Article>> {
        if self.feeds.is_empty() {
            return Err(HarvestError::Permanent {
                origin: Source::Rss,
                message: "no feeds configured under rss.feeds".to_string(),
            });
        }

        let mut articles: Vec<Article> = Vec::new();
        let mut first_error = None;
        let mut failed = 0usize;

        for url in &self.feeds {
            if articles.len() >= query.max_results {
                break;
            }
            match self.fetch_feed(url).await {
                Ok(items) => {
                    let before = articles.len();
                    articles.extend(
                        items
                            .into_iter()
                            .filter(|a| query.accepts_date(a.publication_date))
                            .take(query.max_results - before),
                    );
                    debug!(feed = %url, kept = articles.len() - before, "Feed parsed");
                }
                Err(e) => {
                    warn!(feed = %url, error = %e, "Skipping feed");
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if failed == self.feeds.len() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        info!(count = articles.len(), failed, "RSS feeds collected");
        Ok(articles)
    }
}

// ── Feed parsing ─────────────────────────────────────────────────────────────

/// The entry's article page: the first alternate (or untyped) link.
fn entry_link(entry: &Entry) -> Option<String> {
    entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn entry_to_article(entry: Entry) -> Option<Article> {
    let link = entry_link(&entry);
    // Links are stable across polls; generated ids of guid-less items are not.
    let external_id = link.clone().unwrap_or_else(|| entry.id.trim().to_string());
    if external_id.is_empty() {
        warn!("Skipping feed item without link or id");
        return None;
    }
    let title = entry.title.as_ref().map(|t| strip_markup(&t.content)).unwrap_or_default();
    if title.is_empty() {
        warn!(external_id, "Skipping feed item with empty title");
        return None;
    }

    let abstract_html = entry
        .summary
        .as_ref()
        .map(|t| t.content.clone())
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
        .unwrap_or_default();

    let mut article = Article::new(Source::Rss, external_id, title);
    article.url = link.unwrap_or_else(|| {
        if entry.id.starts_with("http") { entry.id.clone() } else { String::new() }
    });
    article.abstract_text = strip_markup(&abstract_html);
    article.authors = entry.authors.iter().filter_map(|p| author_name(&p.name)).collect();
    article.topics = entry
        .categories
        .iter()
        .map(|c| c.term.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    article.doi = normalize_doi(&entry.id).or_else(|| normalize_doi(&article.url));
    article.publication_date = entry.published.or(entry.updated).map(|dt| dt.date_naive());
    Some(article)
}

/// `"ana@example.org (Ana Ruiz)"` → `"Ana Ruiz"`; plain names pass through.
fn author_name(raw: &str) -> Option<String> {
    let raw = collapse_whitespace(raw);
    let name = match (raw.find('('), raw.rfind(')')) {
        (Some(open), Some(close)) if open < close && raw.contains('@') => raw[open + 1..close].trim().to_string(),
        _ => raw,
    };
    (!name.is_empty()).then_some(name)
}

/// `doi:10.1/x`, `https://doi.org/10.1/x` and bare DOIs.
fn normalize_doi(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let doi = raw
        .strip_prefix("doi:")
        .or_else(|| raw.strip_prefix("https://doi.org/"))
        .or_else(|| raw.strip_prefix("http://dx.doi.org/"))
        .unwrap_or(raw)
        .trim();
    doi.starts_with("10.").then(|| doi.to_string())
}

/// Parse an RSS 0.9x/1.0/2.0, Atom or JSON Feed document. Items without a link,
/// id or title are skipped.
pub fn parse_feed(body: &str) -> Result<Vec<Article>> {
    let feed = feed_rs::parser::parse(body.as_bytes()).map_err(|e| HarvestError::Parse {
        origin: Source::Rss,
        message: e.to_string(),
    })?;
    Ok(feed.entries.into_iter().filter_map(entry_to_article).collect())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Plant Science Weekly</title>
    <link>https://journal.example.org</link>
    <description>Weekly papers</description>
    <item>
      <title>Root exudates shape the &lt;i&gt;Bacillus&lt;/i&gt; niche</title>
      <link>https://journal.example.org/articles/42</link>
      <guid isPermaLink="false">doi:10.5555/jps.42</guid>
      <description><![CDATA[<p>We tracked <b>root</b> exudates over 30 days.</p>]]></description>
      <pubDate>Tue, 04 Jun 2024 09:30:00 GMT</pubDate>
      <author>li.wei@example.org (Li Wei)</author>
      <category>Plant Biology</category>
    </item>
    <item>
      <title></title>
      <link>https://journal.example.org/articles/43</link>
    </item>
    <item>
      <title>Undated editorial</title>
      <link>https://journal.example.org/articles/44</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Lab blog</title>
  <id>https://lab.example.org/</id>
  <updated>2024-05-02T08:00:00Z</updated>
  <entry>
    <id>tag:lab.example.org,2024:post-7</id>
    <title type="html">Teaching statistics with simulations</title>
    <link rel="self" href="https://lab.example.org/feed/7"/>
    <link rel="alternate" href="https://lab.example.org/posts/7"/>
    <updated>2024-05-02T08:00:00Z</updated>
    <author><name>Sam Okoro</name></author>
    <category term="education"/>
    <content type="html">&lt;p&gt;Simulations help students.&lt;/p&gt;</content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let articles = parse_feed(RSS).unwrap();
        assert_eq!(articles.len(), 2);

        let a = &articles[0];
        assert_eq!(a.id, "rss:https://journal.example.org/articles/42");
        assert_eq!(a.title, "Root exudates shape the Bacillus niche");
        assert_eq!(a.url, "https://journal.example.org/articles/42");
        assert_eq!(a.abstract_text, "We tracked root exudates over 30 days.");
        assert_eq!(a.publication_date, NaiveDate::from_ymd_opt(2024, 6, 4));
        assert_eq!(a.authors, vec!["Li Wei"]);
        assert_eq!(a.topics, vec!["Plant Biology"]);
        assert_eq!(a.doi.as_deref(), Some("10.5555/jps.42"));

        let b = &articles[1];
        assert_eq!(b.external_id, "https://journal.example.org/articles/44");
        assert_eq!(b.publication_date, None);
    }

    #[test]
    fn test_parse_atom_entries() {
        let articles = parse_feed(ATOM).unwrap();
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        // The alternate link, not the self link.
        assert_eq!(a.external_id, "https://lab.example.org/posts/7");
        assert_eq!(a.url, "https://lab.example.org/posts/7");
        assert_eq!(a.abstract_text, "Simulations help students.");
        assert_eq!(a.publication_date, NaiveDate::from_ymd_opt(2024, 5, 2));
        assert_eq!(a.authors, vec!["Sam Okoro"]);
        assert_eq!(a.topics, vec!["education"]);
        assert_eq!(a.doi, None);
    }

    #[test]
    fn test_rejects_non_feed() {
        assert!(matches!(
            parse_feed("<html><body>Not here</body></html>"),
            Err(HarvestError::Parse { origin: Source::Rss, .. })
        ));
    }

    #[test]
    fn test_author_and_doi_forms() {
        assert_eq!(author_name("ana@example.org (Ana Ruiz)").as_deref(), Some("Ana Ruiz"));
        assert_eq!(author_name("Ana  Ruiz").as_deref(), Some("Ana Ruiz"));
        assert_eq!(author_name("  "), None);
        assert_eq!(normalize_doi("doi:10.1/x").as_deref(), Some("10.1/x"));
        assert_eq!(normalize_doi("https://doi.org/10.1/x").as_deref(), Some("10.1/x"));
        assert_eq!(normalize_doi("urn:isbn:123"), None);
    }

    #[tokio::test]
    async fn test_search_without_feeds_is_an_error() {
        let client = RssClient::new(&SourceKeys::with_base_url("")).unwrap();
        let err = client.search(&HarvestQuery::new(vec![], 7, 10)).await.unwrap_err();
        assert!(matches!(err, HarvestError::Permanent { origin: Source::Rss, .. }));
    }
}
