//! Core records shared by every stage of the pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SciaggError;

// ── Sources ──────────────────────────────────────────────────────────────────

/// External literature APIs an article can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Arxiv,
    EuropePmc,
    Crossref,
    Biorxiv,
    Medrxiv,
    Lens,
    Ieee,
    /// User-configured RSS/Atom feeds.
    Rss,
}

impl Source {
    pub const ALL: [Source; 8] = [
        Source::Arxiv,
        Source::EuropePmc,
        Source::Crossref,
        Source::Biorxiv,
        Source::Medrxiv,
        Source::Lens,
        Source::Ieee,
        Source::Rss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Arxiv     => "arxiv",
            Source::EuropePmc => "europepmc",
            Source::Crossref  => "crossref",
            Source::Biorxiv   => "biorxiv",
            Source::Medrxiv   => "medrxiv",
            Source::Lens      => "lens",
            Source::Ieee      => "ieee",
            Source::Rss       => "rss",
        }
    }

    /// Human readable label used in posts and the dashboard.
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Arxiv     => "arXiv",
            Source::EuropePmc => "Europe PMC",
            Source::Crossref  => "Crossref",
            Source::Biorxiv   => "bioRxiv",
            Source::Medrxiv   => "medRxiv",
            Source::Lens      => "Lens",
            Source::Ieee      => "IEEE Xplore",
            Source::Rss       => "RSS feeds",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = SciaggError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arxiv"                     => Ok(Source::Arxiv),
            "europepmc" | "europe_pmc"  => Ok(Source::EuropePmc),
            "crossref"                  => Ok(Source::Crossref),
            "biorxiv"                   => Ok(Source::Biorxiv),
            "medrxiv"                   => Ok(Source::Medrxiv),
            "lens"                      => Ok(Source::Lens),
            "ieee"                      => Ok(Source::Ieee),
            "rss" | "atom"              => Ok(Source::Rss),
            other                       => Err(SciaggError::UnknownSource(other.to_string())),
        }
    }
}

// ── Articles ─────────────────────────────────────────────────────────────────

/// User triage flag, the only field the dashboard may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    New,
    Saved,
    Discarded,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::New       => "new",
            ArticleStatus::Saved     => "saved",
            ArticleStatus::Discarded => "discarded",
        }
    }
}

impl FromStr for ArticleStatus {
    type Err = SciaggError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new"       => Ok(ArticleStatus::New),
            "saved"     => Ok(ArticleStatus::Saved),
            "discarded" => Ok(ArticleStatus::Discarded),
            other       => Err(SciaggError::InvalidArticle(format!("unknown status '{other}'"))),
        }
    }
}

/// A harvested article in the common record shape every harvester produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// `"{source}:{external_id}"`
    pub id: String,
    pub source: Source,
    pub external_id: String,
    pub url: String,
    pub doi: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub institutions: Vec<String>,
    pub topics: Vec<String>,
    pub publication_date: Option<NaiveDate>,
    pub abstract_text: String,
    pub summary: Option<String>,
    pub post_content: Option<String>,
    pub status: ArticleStatus,
    pub retrieved_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(source: Source, external_id: impl Into<String>, title: impl Into<String>) -> Self {
        let external_id = external_id.into();
        let now = Utc::now();
        Self {
            id: Self::make_id(source, &external_id),
            source,
            external_id,
            url: String::new(),
            doi: None,
            title: title.into(),
            authors: Vec::new(),
            institutions: Vec::new(),
            topics: Vec::new(),
            publication_date: None,
            abstract_text: String::new(),
            summary: None,
            post_content: None,
            status: ArticleStatus::New,
            retrieved_at: now,
            updated_at: now,
        }
    }

    pub fn make_id(source: Source, external_id: &str) -> String {
        format!("{}:{}", source.as_str(), external_id)
    }

    /// True once both the casual summary and the post have been generated.
    pub fn is_processed(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.is_empty())
            && self.post_content.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Markdown rendering of an article, one per article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub article_id: String,
    pub markdown_path: String,
    pub generated_at: DateTime<Utc>,
}

// ── Knowledge graph ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Author,
    Institution,
    Concept,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Author      => "author",
            EntityKind::Institution => "institution",
            EntityKind::Concept     => "concept",
        }
    }
}

impl FromStr for EntityKind {
    type Err = SciaggError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author"      => Ok(EntityKind::Author),
            "institution" => Ok(EntityKind::Institution),
            "concept"     => Ok(EntityKind::Concept),
            other         => Err(SciaggError::Config(format!("unknown entity kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// `"{kind}:{name}"`
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    /// Number of articles mentioning the entity.
    pub frequency: u32,
}

impl GraphNode {
    pub fn make_id(kind: EntityKind, name: &str) -> String {
        format!("{}:{}", kind.as_str(), name)
    }
}

/// Undirected co-occurrence edge. `source < target` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trips_through_str() {
        for source in Source::ALL {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
        assert!("pubmed".parse::<Source>().is_err());
    }

    #[test]
    fn test_article_id_is_source_prefixed() {
        let article = Article::new(Source::Arxiv, "2401.00001", "A title");
        assert_eq!(article.id, "arxiv:2401.00001");
        assert_eq!(article.status, ArticleStatus::New);
        assert!(!article.is_processed());
    }

    #[test]
    fn test_is_processed_requires_summary_and_post() {
        let mut article = Article::new(Source::Crossref, "10.1/x", "t");
        article.summary = Some("short".into());
        assert!(!article.is_processed());
        article.post_content = Some("# post".into());
        assert!(article.is_processed());
    }
}
