//! Long-form, Medium-style posts built from an article and its extracted parts.

use sciagg_common::config::Settings;
use sciagg_common::text::{capitalize, collapse_whitespace, split_sentences, word_count};
use sciagg_common::Article;
use tracing::debug;

use crate::extract::{extract_info, ExtractedInfo};
use crate::jargon::simplify_jargon;
use crate::summarizer::{lower_first, NOT_ENOUGH_INFO};

/// Abstracts shorter than this get the minimal post.
const MIN_ABSTRACT_CHARS: usize = 50;
const MAX_TITLE_CHARS: usize = 80;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "can", "from", "into",
    "using", "their", "this", "that", "these", "those", "through",
];

const METHOD_TERMS: &[&str] = &[
    "analysis", "method", "approach", "technique", "algorithm", "model", "framework",
    "protocol", "experiment", "survey", "evaluation", "measurement", "simulation",
];

// ── Research area ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchArea {
    Bioinformatics,
    AiMl,
    PlantMicrobe,
    Education,
    General,
}

impl ResearchArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchArea::Bioinformatics => "bioinformatics",
            ResearchArea::AiMl           => "ai_ml",
            ResearchArea::PlantMicrobe   => "plant_microbe",
            ResearchArea::Education      => "education",
            ResearchArea::General        => "general",
        }
    }

    /// First area whose keywords appear in the title, abstract or topics.
    pub fn detect(article: &Article) -> Self {
        let text = format!(
            "{} {} {}",
            article.title,
            article.abstract_text,
            article.topics.join(" ")
        )
        .to_lowercase();
        let has_token = |token: &str| {
            text.split(|c: char| !c.is_alphanumeric()).any(|w| w == token)
        };
        let has_any = |terms: &[&str]| terms.iter().any(|t| text.contains(t));

        if has_any(&["bioinformatics", "computational biology", "genomics", "transcriptomics", "proteomics"]) {
            ResearchArea::Bioinformatics
        } else if has_any(&["machine learning", "deep learning", "artificial intelligence", "neural network"])
            || has_token("ai")
        {
            ResearchArea::AiMl
        } else if has_any(&["plant", "microbe", "microbial", "microbiome", "rhizosphere"]) {
            ResearchArea::PlantMicrobe
        } else if has_any(&["education", "teaching", "students", "curriculum", "classroom"]) {
            ResearchArea::Education
        } else {
            ResearchArea::General
        }
    }

    fn title_prefix(&self) -> &'static str {
        match self {
            ResearchArea::Bioinformatics => "Advance in Bioinformatics",
            ResearchArea::AiMl           => "Development in Artificial Intelligence",
            ResearchArea::PlantMicrobe   => "Research on Biological Interactions",
            ResearchArea::Education      => "Study in Education",
            ResearchArea::General        => "Scientific Research",
        }
    }

    fn context(&self) -> Option<&'static str> {
        match self {
            ResearchArea::Bioinformatics => Some(
                "It matters because biology now produces far more data than anyone can read by hand, \
                 so efficient computational tools decide what gets discovered.",
            ),
            ResearchArea::AiMl => Some(
                "Work like this feeds directly into more accurate and more efficient learning systems.",
            ),
            ResearchArea::PlantMicrobe => Some(
                "Understanding how plants and microbes interact is central to sustainable agriculture.",
            ),
            ResearchArea::Education => Some(
                "How people learn science shapes who goes on to do it.",
            ),
            ResearchArea::General => None,
        }
    }

    fn implication(&self) -> &'static str {
        match self {
            ResearchArea::Bioinformatics => {
                "These results add to the toolbox for analysing biological data, with possible uses in \
                 personalised medicine and biotechnology."
            }
            ResearchArea::AiMl => {
                "The methods presented here could make artificial intelligence systems more accurate \
                 and cheaper to run."
            }
            ResearchArea::PlantMicrobe => {
                "The work offers useful pointers for more sustainable and effective farming."
            }
            ResearchArea::Education => {
                "The findings can inform how science is taught and communicated."
            }
            ResearchArea::General => {
                "The study opens new directions for future research in its field."
            }
        }
    }
}

// ── Generator ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostGenerator {
    max_words: usize,
}

impl PostGenerator {
    pub fn new(max_words: usize) -> Self {
        Self { max_words: max_words.max(1) }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.text_processing.max_post_length)
    }

    pub fn generate(&self, article: &Article, summary: &str) -> String {
        let info = extract_info(&article.abstract_text);
        self.generate_with(article, summary, &info)
    }

    /// Build the post from an extraction the caller already ran.
    pub fn generate_with(&self, article: &Article, summary: &str, info: &ExtractedInfo) -> String {
        let abstract_text = collapse_whitespace(&article.abstract_text);
        if abstract_text.chars().count() < MIN_ABSTRACT_CHARS {
            debug!(id = %article.id, "Abstract too short, writing minimal post");
            return minimal_post(article, &abstract_text);
        }

        let area = ResearchArea::detect(article);
        let sections = vec![
            format!("# {}: {}", area.title_prefix(), simplify_title(&article.title)),
            format!("## Introduction\n\n{}", introduction(article, info, &abstract_text)),
            format!("## Context\n\n{}", context(area, info, &abstract_text)),
            format!("## Methodology\n\n{}", methodology(info, &abstract_text)),
            format!("## Results\n\n{}", results(info, summary)),
            format!("## Implications\n\n{}", implications(area, info)),
            format!("## Conclusion\n\n{}", conclusion(info)),
            "---".to_string(),
            references(article),
        ];
        let post = sections.join("\n\n");
        trim_post(&post, self.max_words)
    }
}

/// End a fragment with exactly one period.
fn sentence(text: &str) -> String {
    format!("{}.", text.trim().trim_end_matches(['.', ' ']))
}

fn simplify_title(title: &str) -> String {
    if title.trim().is_empty() {
        return "A New Study".to_string();
    }
    let simplified = capitalize(&simplify_jargon(title));
    if simplified.chars().count() > MAX_TITLE_CHARS {
        let cut: String = simplified.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", cut.trim_end())
    } else {
        simplified
    }
}

fn title_keywords(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| w.len() > 3 && !STOP_WORDS.contains(w))
        .take(5)
        .map(String::from)
        .collect()
}

fn introduction(article: &Article, info: &ExtractedInfo, abstract_text: &str) -> String {
    let mut parts = Vec::new();
    let keywords = title_keywords(&article.title);
    if !keywords.is_empty() {
        let shown: Vec<&str> = keywords.iter().take(2).map(String::as_str).collect();
        parts.push(format!(
            "The study \"{}\" looks at {}.",
            article.title,
            shown.join(" and ")
        ));
    }
    if let Some(problem) = &info.problem {
        parts.push(sentence(&format!("It focuses on {}", lower_first(problem))));
    }
    if let Some(results) = &info.results {
        parts.push(sentence(&format!("The findings reveal {}", lower_first(results))));
    }
    if parts.is_empty() {
        let head: String = abstract_text.chars().take(200).collect();
        if head.len() < abstract_text.len() {
            parts.push(format!("{}...", head.trim_end()));
        } else {
            parts.push(head);
        }
    }
    parts.join(" ")
}

fn context(area: ResearchArea, info: &ExtractedInfo, abstract_text: &str) -> String {
    let mut parts = Vec::new();
    if let Some(problem) = &info.problem {
        parts.push(sentence(&format!("The study addresses {}", lower_first(problem))));
        if let Some(extra) = area.context() {
            parts.push(extra.to_string());
        }
    } else if let Some(first) = split_sentences(abstract_text).into_iter().next() {
        parts.push(simplify_jargon(&first));
    }
    if parts.is_empty() {
        return "The research tackles a question of growing importance in its field.".to_string();
    }
    parts.join(" ")
}

fn methodology(info: &ExtractedInfo, abstract_text: &str) -> String {
    let mut parts = Vec::new();
    if let Some(method) = &info.methodology {
        parts.push(sentence(method));
    }
    if let Some(data) = &info.data_info {
        parts.push(sentence(&format!("The work draws on {}", lower_first(data))));
    }
    if parts.is_empty() {
        let lower = abstract_text.to_lowercase();
        let terms: Vec<&str> = METHOD_TERMS.iter().copied().filter(|t| lower.contains(t)).take(3).collect();
        if !terms.is_empty() {
            parts.push(format!("The approach involves {}.", terms.join(", ")));
        }
    }
    if parts.is_empty() {
        return "The abstract does not describe the methods in detail.".to_string();
    }
    parts.join(" ")
}

fn results(info: &ExtractedInfo, summary: &str) -> String {
    let mut parts = Vec::new();
    if let Some(results) = &info.results {
        parts.push(sentence(results));
    }
    if !info.key_numbers.is_empty() {
        parts.push(format!("Notable figures: {}.", info.key_numbers.join(", ")));
    }
    if parts.is_empty() && !summary.trim().is_empty() && summary != NOT_ENOUGH_INFO {
        parts.push(summary.trim().to_string());
    }
    if parts.is_empty() {
        return "See the original article for the full results.".to_string();
    }
    parts.join(" ")
}

fn implications(area: ResearchArea, info: &ExtractedInfo) -> String {
    let mut parts = Vec::new();
    if let Some(results) = &info.results {
        parts.push(sentence(&format!(
            "These findings matter for the field because {}",
            lower_first(results)
        )));
    }
    if info.methodology.is_some() {
        parts.push(
            "The approach could be carried over to similar problems in other areas.".to_string(),
        );
    }
    parts.push(area.implication().to_string());
    parts.join(" ")
}

fn conclusion(info: &ExtractedInfo) -> String {
    let mut parts = Vec::new();
    match (&info.conclusions, &info.results) {
        (Some(c), _) => parts.push(sentence(&format!("The authors conclude that {}", lower_first(c)))),
        (None, Some(r)) => parts.push(sentence(&format!("This study shows {}", lower_first(r)))),
        (None, None) => {}
    }
    parts.push(
        "It is a step toward a better understanding of the question and opens room for follow-up work."
            .to_string(),
    );
    parts.join(" ")
}

fn references(article: &Article) -> String {
    let mut refs = vec![format!("**Original article**: {}", article.title)];
    if !article.authors.is_empty() {
        let mut authors = article.authors.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
        if article.authors.len() > 3 {
            authors.push_str(" et al.");
        }
        refs.push(format!("**Authors**: {authors}"));
    }
    refs.push(format!("**Source**: {}", article.source.display_name()));
    if let Some(date) = article.publication_date {
        refs.push(format!("**Published**: {}", date.format("%B %Y")));
    }
    if !article.url.is_empty() {
        refs.push(format!("**Link**: [{0}]({0})", article.url));
    }
    if !article.topics.is_empty() {
        refs.push(format!("**Topics**: {}", article.topics.iter().take(3).cloned().collect::<Vec<_>>().join(", ")));
    }
    refs.push(
        "**Note**: This is a plain-language summary of the original paper. \
         Consult the publication for the technical details."
            .to_string(),
    );
    refs.join("\n\n")
}

fn minimal_post(article: &Article, abstract_text: &str) -> String {
    let authors = if article.authors.is_empty() {
        "Not specified".to_string()
    } else {
        article.authors.join(", ")
    };
    let date = article
        .publication_date
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| "Not specified".to_string());
    let summary = if abstract_text.is_empty() { "Abstract not available." } else { abstract_text };
    [
        format!("# {}", article.title),
        "## Summary".to_string(),
        summary.to_string(),
        "## About this article".to_string(),
        format!("**Authors**: {authors}\n**Source**: {}\n**Date**: {date}", article.source.display_name()),
        "**Note**: The abstract was too short for a detailed write-up.".to_string(),
        "---".to_string(),
        references(article),
    ]
    .join("\n\n")
}

/// Keep whole `\n\n`-separated blocks while they fit in `max_words`.
pub fn trim_post(post: &str, max_words: usize) -> String {
    if word_count(post) <= max_words {
        return post.to_string();
    }
    let mut kept = Vec::new();
    let mut used = 0;
    for block in post.split("\n\n") {
        let words = word_count(block);
        if used + words > max_words {
            break;
        }
        kept.push(block);
        used += words;
    }
    kept.join("\n\n")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sciagg_common::Source;

    use super::*;

    fn article() -> Article {
        let mut a = Article::new(Source::Arxiv, "2401.00001v1", "Soil microbes predict crop yield");
        a.abstract_text = "The main goal of this work is to predict crop yield from soil microbes. \
            We used a random forest trained on 1,200 soil samples from three continents. \
            Results show that microbial diversity explains most of the variation in yield. \
            We conclude that soil sequencing could guide fertiliser use in practice."
            .into();
        a.authors = vec!["Ana Ruiz".into(), "Li Wei".into(), "Sam Okoro".into(), "Jo Park".into()];
        a.topics = vec!["q-bio.PE".into()];
        a.url = "https://arxiv.org/abs/2401.00001v1".into();
        a.publication_date = NaiveDate::from_ymd_opt(2024, 1, 3);
        a
    }

    #[test]
    fn test_detect_area() {
        let a = article();
        assert_eq!(ResearchArea::detect(&a), ResearchArea::PlantMicrobe);

        let mut b = Article::new(Source::Crossref, "x", "An AI tutor");
        assert_eq!(ResearchArea::detect(&b), ResearchArea::AiMl);
        b.title = "Fair grading for students".into();
        assert_eq!(ResearchArea::detect(&b), ResearchArea::Education);
        // "ai" inside another word does not count.
        b.title = "Rainfall records".into();
        assert_eq!(ResearchArea::detect(&b), ResearchArea::General);
        b.topics = vec!["Genomics".into()];
        assert_eq!(ResearchArea::detect(&b), ResearchArea::Bioinformatics);
    }

    #[test]
    fn test_full_post_sections() {
        let post = PostGenerator::new(1500).generate(&article(), "A summary.");
        assert!(post.starts_with("# Research on Biological Interactions: Soil microbes predict crop yield"));
        let headings = ["## Introduction", "## Context", "## Methodology", "## Results", "## Implications", "## Conclusion", "---"];
        let mut last = 0;
        for h in headings {
            let pos = post.find(h).unwrap_or_else(|| panic!("missing {h}"));
            assert!(pos > last, "{h} out of order");
            last = pos;
        }
        assert!(post.contains("**Authors**: Ana Ruiz, Li Wei, Sam Okoro et al."));
        assert!(post.contains("**Source**: arXiv"));
        assert!(post.contains("**Published**: January 2024"));
        assert!(post.contains("The authors conclude that soil sequencing"));
    }

    #[test]
    fn test_minimal_post_for_short_abstract() {
        let mut a = article();
        a.abstract_text = "Too short.".into();
        let post = PostGenerator::new(1500).generate(&a, NOT_ENOUGH_INFO);
        assert!(post.starts_with("# Soil microbes predict crop yield\n\n## Summary\n\nToo short."));
        assert!(!post.contains("## Methodology"));
        assert!(post.contains("**Date**: January 2024"));
    }

    #[test]
    fn test_post_is_deterministic() {
        let g = PostGenerator::new(1500);
        assert_eq!(g.generate(&article(), "s"), g.generate(&article(), "s"));
    }

    #[test]
    fn test_trim_keeps_whole_blocks() {
        let post = "# T\n\none two three\n\nfour five six seven\n\neight";
        assert_eq!(trim_post(post, 100), post);
        assert_eq!(trim_post(post, 5), "# T\n\none two three");
        let long = PostGenerator::new(40).generate(&article(), "s");
        assert!(word_count(&long) <= 40);
        assert!(long.starts_with("# "));
    }
}
