//! Co-occurrence graph construction.
//!
//! Frequency = number of articles mentioning an entity. Edge weight = number
//! of articles mentioning both endpoints. All maps are `BTreeMap`s, so the
//! same article set always yields the same nodes and edges in the same order.

use std::collections::{BTreeMap, BTreeSet};

use sciagg_common::config::Settings;
use sciagg_common::{Article, GraphEdge, GraphNode};
use serde::Serialize;
use tracing::debug;

use crate::extraction::{extract_entities, Entity};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    pub min_entity_frequency: u32,
    pub max_entities: usize,
    pub min_edge_weight: u32,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self { min_entity_frequency: 2, max_entities: 100, min_edge_weight: 1 }
    }
}

impl GraphBuilder {
    pub fn from_settings(settings: &Settings) -> Self {
        let kg = &settings.knowledge_graph;
        Self {
            min_entity_frequency: kg.min_entity_frequency,
            max_entities: kg.max_entities,
            min_edge_weight: kg.min_edge_weight,
        }
    }

    pub fn build(&self, articles: &[Article]) -> KnowledgeGraph {
        let per_article: Vec<BTreeSet<Entity>> = articles.iter().map(extract_entities).collect();

        // ── Frequencies ──────────────────────────────────────────────────────
        let mut frequency: BTreeMap<&Entity, u32> = BTreeMap::new();
        for entities in &per_article {
            for entity in entities {
                *frequency.entry(entity).or_default() += 1;
            }
        }

        // ── Threshold and cap ────────────────────────────────────────────────
        let mut kept: Vec<(&Entity, u32)> = frequency
            .into_iter()
            .filter(|(_, f)| *f >= self.min_entity_frequency)
            .collect();
        // (frequency desc, kind, name); the BTreeMap already ordered by (kind, name).
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        kept.truncate(self.max_entities);

        let ids: BTreeMap<&Entity, String> = kept
            .iter()
            .map(|(entity, _)| (*entity, GraphNode::make_id(entity.0, &entity.1)))
            .collect();

        let nodes: Vec<GraphNode> = kept
            .iter()
            .map(|(entity, freq)| GraphNode {
                id: ids[entity].clone(),
                name: entity.1.clone(),
                kind: entity.0,
                frequency: *freq,
            })
            .collect();

        // ── Co-occurrence ────────────────────────────────────────────────────
        let mut weights: BTreeMap<(String, String), u32> = BTreeMap::new();
        for entities in &per_article {
            let present: Vec<&String> = entities.iter().filter_map(|e| ids.get(e)).collect();
            for (i, a) in present.iter().enumerate() {
                for b in &present[i + 1..] {
                    let key = if a < b {
                        ((*a).clone(), (*b).clone())
                    } else {
                        ((*b).clone(), (*a).clone())
                    };
                    *weights.entry(key).or_default() += 1;
                }
            }
        }

        let edges: Vec<GraphEdge> = weights
            .into_iter()
            .filter(|(_, w)| *w >= self.min_edge_weight)
            .map(|((source, target), weight)| GraphEdge { source, target, weight })
            .collect();

        debug!(articles = articles.len(), nodes = nodes.len(), edges = edges.len(), "Graph built");
        KnowledgeGraph { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use sciagg_common::{EntityKind, Source};

    use super::*;

    fn article(id: &str, authors: &[&str], topics: &[&str]) -> Article {
        let mut a = Article::new(Source::Crossref, id, format!("Paper {id}"));
        a.authors = authors.iter().map(|s| s.to_string()).collect();
        a.topics = topics.iter().map(|s| s.to_string()).collect();
        a
    }

    fn corpus() -> Vec<Article> {
        vec![
            article("1", &["Ana Ruiz", "Li Wei"], &["ecology"]),
            article("2", &["Ana Ruiz", "Li Wei"], &["ecology", "botany"]),
            article("3", &["Ana Ruiz"], &["botany"]),
            article("4", &["Sam Okoro"], &["physics"]),
        ]
    }

    #[test]
    fn test_thresholds_and_weights() {
        let graph = GraphBuilder::default().build(&corpus());
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["author:Ana Ruiz", "author:Li Wei", "concept:botany", "concept:ecology"]
        );
        assert_eq!(graph.nodes[0].frequency, 3);
        assert_eq!(graph.nodes[0].kind, EntityKind::Author);

        let edge = |s: &str, t: &str| {
            graph.edges.iter().find(|e| e.source == s && e.target == t).map(|e| e.weight)
        };
        assert_eq!(edge("author:Ana Ruiz", "author:Li Wei"), Some(2));
        assert_eq!(edge("author:Ana Ruiz", "concept:botany"), Some(2));
        assert_eq!(edge("author:Li Wei", "concept:ecology"), Some(2));
        assert_eq!(edge("concept:botany", "concept:ecology"), Some(1));
        assert!(graph.edges.iter().all(|e| e.source < e.target));
    }

    #[test]
    fn test_max_entities_and_edge_weight() {
        let builder = GraphBuilder { min_entity_frequency: 1, max_entities: 2, min_edge_weight: 2 };
        let graph = builder.build(&corpus());
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "author:Ana Ruiz");
        // Ties on frequency 2 resolve by kind then name.
        assert_eq!(graph.nodes[1].id, "author:Li Wei");
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].weight, 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = GraphBuilder::default();
        let mut reversed = corpus();
        reversed.reverse();
        assert_eq!(builder.build(&corpus()), builder.build(&reversed));
    }

    #[test]
    fn test_empty_input() {
        assert!(GraphBuilder::default().build(&[]).is_empty());
    }
}
