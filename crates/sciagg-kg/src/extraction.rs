//! Entity extraction: authors, institutions and concepts per article.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use sciagg_common::text::collapse_whitespace;
use sciagg_common::{Article, EntityKind};

/// Concept keywords looked up in title and abstract. Names are stored lowercase.
const CONCEPT_KEYWORDS: &[&str] = &[
    "bioinformatics",
    "computational biology",
    "genomics",
    "metagenomics",
    "transcriptomics",
    "proteomics",
    "metabolomics",
    "gene expression",
    "sequencing",
    "single-cell",
    "phylogenetics",
    "protein structure",
    "machine learning",
    "deep learning",
    "neural network",
    "language model",
    "artificial intelligence",
    "statistics",
    "data analysis",
    "microbiome",
    "rhizosphere",
    "plant-microbe interaction",
    "symbiosis",
    "pathogen",
    "soil",
    "crop",
    "climate",
    "ecology",
    "evolution",
    "science education",
    "science communication",
    "public health",
    "epidemiology",
    "drug discovery",
];

fn concept_regexes() -> &'static [(Regex, &'static str)] {
    static RE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RE.get_or_init(|| {
        CONCEPT_KEYWORDS
            .iter()
            .map(|kw| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(kw));
                (Regex::new(&pattern).unwrap(), *kw)
            })
            .collect()
    })
}

/// One `(kind, name)` pair. Ordered so sets iterate deterministically.
pub type Entity = (EntityKind, String);

fn clean_name(name: &str) -> Option<String> {
    let name = collapse_whitespace(name);
    (name.chars().count() >= 2).then_some(name)
}

/// Distinct entities mentioned by `article`. Topic tags become concepts
/// alongside the keyword table hits.
pub fn extract_entities(article: &Article) -> BTreeSet<Entity> {
    let mut entities = BTreeSet::new();
    for author in &article.authors {
        if let Some(name) = clean_name(author) {
            entities.insert((EntityKind::Author, name));
        }
    }
    for inst in &article.institutions {
        if let Some(name) = clean_name(inst) {
            entities.insert((EntityKind::Institution, name));
        }
    }
    for topic in &article.topics {
        if let Some(name) = clean_name(topic) {
            entities.insert((EntityKind::Concept, name.to_lowercase()));
        }
    }

    let text = format!("{} {}", article.title, article.abstract_text);
    for (re, keyword) in concept_regexes() {
        if re.is_match(&text) {
            entities.insert((EntityKind::Concept, keyword.to_string()));
        }
    }
    entities
}
