//! arXiv export API client.
//!
//! Endpoint: http://export.arxiv.org/api/query (Atom feed)
//! Topics are mapped onto arXiv categories where a mapping exists and always
//! searched as title/abstract phrases.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sciagg_common::config::SourceKeys;
use sciagg_common::text::collapse_whitespace;
use sciagg_common::{Article, Source};
use tracing::{debug, instrument, warn};

use super::{parse_iso_date, ArticleSource, HarvestQuery};
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;

const MAX_PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 20;
const DEFAULT_CATEGORIES: &str = "q-bio.QM OR cs.CE OR stat.AP";

/// Topic (lowercase) → arXiv category expression.
const CATEGORY_MAP: &[(&str, &str)] = &[
    ("bioinformatics",              "q-bio.QM OR cs.CE OR stat.AP"),
    ("computational biology",       "q-bio.QM OR cs.CE"),
    ("programming biology",         "q-bio.QM OR cs.CE"),
    ("biological data analysis",    "q-bio.QM OR stat.AP"),
    ("plant-microbe interactions",  "q-bio.PE OR q-bio.MN"),
    ("plant microorganism",         "q-bio.PE OR q-bio.MN"),
    ("scientific education",        "physics.ed-ph"),
    ("science education",           "physics.ed-ph"),
    ("science communication",       "physics.soc-ph"),
];

pub struct ArxivClient {
    http: HttpClient,
    base_url: String,
}

impl ArxivClient {
    pub fn new(keys: &SourceKeys) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(Source::Arxiv, keys.rate_limit)?,
            base_url: keys.base_url.clone(),
        })
    }

    /// Point the client at another endpoint (used against local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ArticleSource for ArxivClient {
    fn source(&self) -> Source {
        Source::Arxiv
    }

    #[instrument(skip(self), fields(topics = query.topics.len()))]
    async fn search(&self, query: &HarvestQuery) -> Result<Vec<Article>> {
        let search_query = build_search_query(&query.topics);
        let mut articles: Vec<Article> = Vec::new();
        let mut start = 0usize;

        for page in 0..MAX_PAGES {
            if articles.len() >= query.max_results {
                break;
            }
            let page_size = (query.max_results - articles.len()).min(MAX_PAGE_SIZE);
            let params = vec![
                ("search_query", search_query.clone()),
                ("start", start.to_string()),
                ("max_results", page_size.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ];

            let xml = self.http.get_text(&self.base_url, &params).await?;
            let entries = parse_feed(&xml)?;
            let fetched = entries.len();
            // Newest first: one entry older than the window ends the search.
            let mut past_window = false;
            for entry in entries {
                if query.accepts_date(entry.publication_date) {
                    articles.push(entry);
                } else {
                    past_window = true;
                }
            }
            start += fetched;
            debug!(page, fetched, kept = articles.len(), "arXiv page parsed");
            if fetched < page_size || past_window {
                break;
            }
        }

        articles.truncate(query.max_results);
        Ok(articles)
    }
}

// ── Query ────────────────────────────────────────────────────────────────────

fn categories_for(topic: &str) -> Option<&'static str> {
    let topic = topic.trim().to_lowercase();
    CATEGORY_MAP
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, cats)| *cats)
}

/// Build the `search_query` expression for a topic list.
pub fn build_search_query(topics: &[String]) -> String {
    let mut parts = Vec::new();
    for topic in topics.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if let Some(cats) = categories_for(topic) {
            parts.push(format!("(cat:({cats}))"));
        }
        parts.push(format!("(ti:\"{topic}\" OR abs:\"{topic}\")"));
    }

    if parts.is_empty() {
        format!("cat:({DEFAULT_CATEGORIES})")
    } else {
        parts.join(" OR ")
    }
}

// ── Atom parsing ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
    Affiliation,
    Doi,
}

#[derive(Default)]
struct EntryDraft {
    id_url: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    affiliations: Vec<String>,
    doi: Option<String>,
    categories: Vec<String>,
}

impl EntryDraft {
    fn into_article(self) -> Option<Article> {
        let id_url = self.id_url.trim().to_string();
        let external_id = id_url.rsplit('/').next().unwrap_or_default().to_string();
        if external_id.is_empty() {
            warn!("Skipping arXiv entry without id");
            return None;
        }
        let title = collapse_whitespace(&self.title);
        if title.is_empty() {
            warn!(external_id, "Skipping arXiv entry with empty title");
            return None;
        }

        let mut article = Article::new(Source::Arxiv, external_id, title);
        article.url = id_url;
        article.abstract_text = collapse_whitespace(&self.summary);
        article.authors = self.authors;
        article.doi = self.doi.filter(|d| !d.is_empty());
        article.topics = self.categories;
        article.publication_date = parse_published(&self.published);

        let mut institutions: Vec<String> = Vec::new();
        for aff in self.affiliations {
            if !institutions.contains(&aff) {
                institutions.push(aff);
            }
        }
        article.institutions = institutions;
        Some(article)
    }
}

fn parse_published(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| parse_iso_date(value))
}

fn category_term(e: &BytesStart<'_>) -> Option<String> {
    e.try_get_attribute("term")
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an arXiv Atom feed. Entries without an id or title are skipped.
pub fn parse_feed(xml: &str) -> Result<Vec<Article>> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<EntryDraft> = None;
    let mut field = Field::None;
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut saw_feed = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                match e.name().as_ref() {
                    b"feed"  => saw_feed = true,
                    b"entry" => current = Some(EntryDraft::default()),
                    b"category" => {
                        if let (Some(entry), Some(term)) = (current.as_mut(), category_term(e)) {
                            entry.categories.push(term);
                        }
                    }
                    name if current.is_some() => {
                        field = match name {
                            b"id"                => Field::Id,
                            b"title"             => Field::Title,
                            b"summary"           => Field::Summary,
                            b"published"         => Field::Published,
                            b"name"              => Field::AuthorName,
                            b"arxiv:affiliation" => Field::Affiliation,
                            b"arxiv:doi"         => Field::Doi,
                            _                    => Field::None,
                        };
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"category" {
                    if let (Some(entry), Some(term)) = (current.as_mut(), category_term(e)) {
                        entry.categories.push(term);
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if field != Field::None {
                    let chunk = e.unescape().unwrap_or_default();
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&chunk);
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"entry" {
                    if let Some(article) = current.take().and_then(EntryDraft::into_article) {
                        articles.push(article);
                    }
                    field = Field::None;
                } else if let Some(entry) = current.as_mut() {
                    let value = text.trim().to_string();
                    match field {
                        Field::Id          => entry.id_url = value,
                        Field::Title       => entry.title = value,
                        Field::Summary     => entry.summary = value,
                        Field::Published   => entry.published = value,
                        Field::AuthorName  if !value.is_empty() => entry.authors.push(value),
                        Field::Affiliation if !value.is_empty() => entry.affiliations.push(value),
                        Field::Doi         => entry.doi = Some(value),
                        _ => {}
                    }
                    field = Field::None;
                    text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                if articles.is_empty() {
                    return Err(HarvestError::Parse {
                        origin: Source::Arxiv,
                        message: e.to_string(),
                    });
                }
                warn!("arXiv XML parse error after {} entries: {}", articles.len(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_feed {
        return Err(HarvestError::Parse {
            origin: Source::Arxiv,
            message: "response is not an Atom feed".to_string(),
        });
    }
    Ok(articles)
}
