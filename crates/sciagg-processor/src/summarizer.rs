//! Casual-language summaries assembled from the extracted parts of an abstract.

use sciagg_common::config::Settings;
use sciagg_common::text::{capitalize, collapse_whitespace, split_sentences, truncate_words, word_count};

use crate::extract::{extract_info, ExtractedInfo};
use crate::jargon::simplify_jargon;

pub const NOT_ENOUGH_INFO: &str = "Not enough information to summarize this article.";

/// Sentences used when no pattern matched.
const FALLBACK_SENTENCES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryStyle {
    /// Templated plain-language summary.
    #[default]
    Casual,
    /// Leading sentences of the abstract, vocabulary untouched.
    Technical,
}

impl SummaryStyle {
    /// Unknown names fall back to casual.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "technical" => SummaryStyle::Technical,
            _           => SummaryStyle::Casual,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Summarizer {
    max_words: usize,
    style: SummaryStyle,
}

impl Summarizer {
    pub fn new(max_words: usize, style: SummaryStyle) -> Self {
        Self { max_words: max_words.max(1), style }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.text_processing.max_summary_length,
            SummaryStyle::parse(&settings.text_processing.summary_style),
        )
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn summarize(&self, abstract_text: &str) -> String {
        let text = collapse_whitespace(abstract_text);
        if text.is_empty() {
            return NOT_ENOUGH_INFO.to_string();
        }
        let summary = match self.style {
            SummaryStyle::Technical => leading_sentences(&text),
            SummaryStyle::Casual => {
                let info = extract_info(&text);
                compose(&info).unwrap_or_else(|| plain_fallback(&text))
            }
        };
        limit_length(&summary, self.max_words)
    }

    /// Summarize with the extraction already done by the caller.
    pub fn summarize_extracted(&self, abstract_text: &str, info: &ExtractedInfo) -> String {
        let text = collapse_whitespace(abstract_text);
        if text.is_empty() {
            return NOT_ENOUGH_INFO.to_string();
        }
        if self.style == SummaryStyle::Technical {
            return limit_length(&leading_sentences(&text), self.max_words);
        }
        let summary = compose(info).unwrap_or_else(|| plain_fallback(&text));
        limit_length(&summary, self.max_words)
    }
}

fn leading_sentences(text: &str) -> String {
    split_sentences(text)
        .into_iter()
        .take(FALLBACK_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ")
}

fn plain_fallback(text: &str) -> String {
    capitalize(&simplify_jargon(&leading_sentences(text)))
}

/// Templated summary, or `None` when none of the prose fields were found.
fn compose(info: &ExtractedInfo) -> Option<String> {
    if info.problem.is_none()
        && info.methodology.is_none()
        && info.results.is_none()
        && info.conclusions.is_none()
    {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(problem) = &info.problem {
        parts.push(format!("The researchers tackled {}", lower_first(problem)));
    }
    if let Some(method) = &info.methodology {
        parts.push(format!("Their approach: {}", lower_first(method)));
    }
    if let Some(data) = &info.data_info {
        parts.push(format!("The study drew on {}", lower_first(data)));
    }
    if let Some(results) = &info.results {
        let results = strip_leading_that(results);
        parts.push(format!("The results showed that {}", lower_first(results)));
    }
    if !info.key_numbers.is_empty() {
        parts.push(format!("Key figures include {}", info.key_numbers.join(", ")));
    }
    if let Some(conclusions) = &info.conclusions {
        parts.push(format!("The authors conclude that {}", lower_first(conclusions)));
    }

    let body = parts
        .iter()
        .map(|p| p.trim_end_matches(['.', ' ']))
        .collect::<Vec<_>>()
        .join(". ");
    Some(format!("{body}."))
}

fn strip_leading_that(text: &str) -> &str {
    match text.get(..5) {
        Some(head) if head.eq_ignore_ascii_case("that ") => &text[5..],
        _ => text,
    }
}

/// Lowercase the first letter unless the word is an acronym ("DNA", "RNA-seq").
pub fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let second_upper = text.chars().nth(1).is_some_and(|c| c.is_uppercase());
    if second_upper {
        return text.to_string();
    }
    first.to_lowercase().chain(chars).collect()
}

/// Cap `text` at `max_words`. A cut lands on the last sentence end when that
/// falls within the final 30% of the truncated text, else "..." is appended.
pub fn limit_length(text: &str, max_words: usize) -> String {
    if word_count(text) <= max_words {
        return text.to_string();
    }
    let truncated = truncate_words(text, max_words);
    match truncated.rfind('.') {
        Some(pos) if pos as f64 > truncated.len() as f64 * 0.7 => truncated[..=pos].to_string(),
        _ => format!("{}...", truncated.trim_end_matches([',', ';', ':'])),
    }
}
