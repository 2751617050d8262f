//! Articles that share entities with a given article.

use std::collections::BTreeSet;

use sciagg_common::{Article, Source};
use serde::Serialize;

use crate::extraction::{extract_entities, Entity};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RelatedArticle {
    pub article_id: String,
    pub title: String,
    pub source: Source,
    /// Names of the shared entities, in entity order.
    pub shared: Vec<String>,
}

impl RelatedArticle {
    pub fn score(&self) -> usize {
        self.shared.len()
    }
}

/// Rank `candidates` by the number of entities they share with `target`
/// (desc, then id). Candidates sharing nothing are left out.
pub fn related_articles(target: &Article, candidates: &[Article], max: usize) -> Vec<RelatedArticle> {
    let wanted: BTreeSet<Entity> = extract_entities(target);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut related: Vec<RelatedArticle> = candidates
        .iter()
        .filter(|c| c.id != target.id)
        .filter_map(|c| {
            let theirs = extract_entities(c);
            let shared: Vec<String> = wanted.intersection(&theirs).map(|(_, name)| name.clone()).collect();
            (!shared.is_empty()).then(|| RelatedArticle {
                article_id: c.id.clone(),
                title: c.title.clone(),
                source: c.source,
                shared,
            })
        })
        .collect();

    related.sort_by(|a, b| b.score().cmp(&a.score()).then_with(|| a.article_id.cmp(&b.article_id)));
    related.truncate(max);
    related
}
