//! Summary numbers for a stored graph.

use std::collections::HashMap;

use sciagg_common::{EntityKind, GraphEdge, GraphNode};
use serde::Serialize;

const TOP_NODES: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopNode {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    pub degree: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    /// `2E / (N (N - 1))`, 0 for fewer than two nodes.
    pub density: f64,
    pub components: usize,
    pub nodes_by_kind: HashMap<EntityKind, usize>,
    pub top_nodes: Vec<TopNode>,
}

impl GraphStats {
    pub fn compute(nodes: &[GraphNode], edges: &[GraphEdge]) -> Self {
        let n = nodes.len();
        let index: HashMap<&str, usize> =
            nodes.iter().enumerate().map(|(i, node)| (node.id.as_str(), i)).collect();

        let mut degree = vec![0usize; n];
        let mut components = UnionFind::new(n);
        for edge in edges {
            if let (Some(&a), Some(&b)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
                degree[a] += 1;
                degree[b] += 1;
                components.union(a, b);
            }
        }

        let density = if n < 2 {
            0.0
        } else {
            (2.0 * edges.len() as f64) / (n as f64 * (n as f64 - 1.0))
        };

        let mut nodes_by_kind = HashMap::new();
        for node in nodes {
            *nodes_by_kind.entry(node.kind).or_insert(0) += 1;
        }

        let mut ranked: Vec<usize> = (0..n).collect();
        ranked.sort_by(|&a, &b| degree[b].cmp(&degree[a]).then_with(|| nodes[a].id.cmp(&nodes[b].id)));
        let top_nodes = ranked
            .into_iter()
            .take(TOP_NODES)
            .map(|i| TopNode {
                id: nodes[i].id.clone(),
                name: nodes[i].name.clone(),
                kind: nodes[i].kind,
                degree: degree[i],
            })
            .collect();

        Self {
            nodes: n,
            edges: edges.len(),
            density,
            components: components.count(),
            nodes_by_kind,
            top_nodes,
        }
    }
}

struct UnionFind {
    parent: Vec<usize>,
    sets: usize,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), sets: n }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
            self.sets -= 1;
        }
    }

    fn count(&self) -> usize {
        self.sets
    }
}
