//! sciagg-kg — entity co-occurrence graph over stored articles.

pub mod builder;
pub mod extraction;
pub mod related;
pub mod repository;
pub mod stats;

pub use builder::{GraphBuilder, KnowledgeGraph};
pub use extraction::extract_entities;
pub use related::{related_articles, RelatedArticle};
pub use repository::{rebuild_graph, KgService};
pub use stats::GraphStats;
