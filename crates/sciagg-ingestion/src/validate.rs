//! Record validation and cleaning applied to every harvested article before
//! it is stored.

use std::sync::OnceLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use sciagg_common::text::{collapse_whitespace, split_sentences, strip_markup};
use sciagg_common::Article;
use tracing::warn;

const MAX_AUTHORS: usize = 10;
const MAX_INSTITUTIONS: usize = 10;
const MAX_TOPICS: usize = 5;

fn strange_char_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s\-.,:;?!()\[\]%'/]").unwrap())
}

#[derive(Debug, Clone)]
pub struct DataValidator {
    today: NaiveDate,
}

impl Default for DataValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl DataValidator {
    pub fn new() -> Self {
        Self { today: Utc::now().date_naive() }
    }

    /// Validator with a fixed notion of "today".
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Clean every field of `article`. Returns `None` when the record is
    /// unusable (empty title after cleaning).
    pub fn clean(&self, mut article: Article) -> Option<Article> {
        article.title = clean_title(&article.title);
        if article.title.is_empty() {
            warn!(id = %article.id, "Rejecting article with empty title");
            return None;
        }
        article.abstract_text = clean_abstract(&article.abstract_text);
        article.authors = clean_names(&article.authors, MAX_AUTHORS, 3);
        article.institutions = clean_names(&article.institutions, MAX_INSTITUTIONS, 2);
        article.topics = clean_topics(&article.topics);
        article.doi = article.doi.as_deref().map(str::trim).filter(|d| !d.is_empty()).map(String::from);
        article.url = clean_url(&article.url)
            .or_else(|| article.doi.as_ref().map(|d| format!("https://doi.org/{d}")))
            .unwrap_or_default();
        article.publication_date = article.publication_date.map(|d| d.min(self.today));
        Some(article)
    }
}

pub fn clean_title(title: &str) -> String {
    let title = strip_markup(title);
    title.trim_end_matches(['.', ' ']).to_string()
}

/// Strip markup, collapse whitespace and make sure prose ends with punctuation.
pub fn clean_abstract(text: &str) -> String {
    let mut text = strip_markup(text);
    if !text.is_empty() && !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

/// Trim, collapse, drop names shorter than `min_len` chars and exact
/// duplicates, cap at `max`.
fn clean_names(names: &[String], max: usize, min_len: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = collapse_whitespace(name);
        if name.chars().count() < min_len || out.contains(&name) {
            continue;
        }
        out.push(name);
        if out.len() == max {
            break;
        }
    }
    out
}

/// Case-insensitive dedupe, at most five topics.
pub fn clean_topics(topics: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for topic in topics {
        let topic = collapse_whitespace(topic);
        if topic.chars().count() < 2 || out.iter().any(|t| t.eq_ignore_ascii_case(&topic)) {
            continue;
        }
        out.push(topic);
        if out.len() == MAX_TOPICS {
            break;
        }
    }
    out
}

/// Ensure a scheme and prefer https. arXiv export links stay on http.
pub fn clean_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() || url.contains(char::is_whitespace) {
        return None;
    }
    let url = if url.starts_with("https://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("http://") {
        if rest.starts_with("export.arxiv.org") {
            url.to_string()
        } else {
            format!("https://{rest}")
        }
    } else if url.contains("://") {
        return None;
    } else {
        format!("https://{url}")
    };
    Some(url)
}

// ── Text quality ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TextQuality {
    /// 0.0 (unusable) to 1.0.
    pub score: f64,
    pub issues: Vec<&'static str>,
    pub word_count: usize,
    pub sentence_count: usize,
}

/// Rough readability check: length, repetition, unfinished sentences and
/// stray characters each cost a fixed penalty.
pub fn text_quality(text: &str) -> TextQuality {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return TextQuality { score: 0.0, issues: vec!["empty text"], word_count: 0, sentence_count: 0 };
    }

    let sentences = split_sentences(text);
    let mut issues = Vec::new();
    let mut score: i32 = 100;

    if words.len() < 10 {
        issues.push("text too short");
        score -= 30;
    }

    let mut unique: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    unique.sort();
    unique.dedup();
    if (unique.len() as f64) / (words.len() as f64) < 0.5 {
        issues.push("heavy word repetition");
        score -= 20;
    }

    if sentences.iter().any(|s| !s.ends_with(['.', '!', '?'])) {
        issues.push("incomplete sentences");
        score -= 15;
    }

    let strange = strange_char_regex().find_iter(text).count();
    if strange as f64 > text.chars().count() as f64 * 0.1 {
        issues.push("many unusual characters");
        score -= 10;
    }

    TextQuality {
        score: f64::from(score.max(0)) / 100.0,
        issues,
        word_count: words.len(),
        sentence_count: sentences.len(),
    }
}

pub fn text_quality_score(text: &str) -> f64 {
    text_quality(text).score
}
