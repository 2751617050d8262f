//! Graph service over the article and graph tables.

use std::sync::Arc;

use anyhow::{Context, Result};
use sciagg_db::{ArticleRepository, Database, GraphRepository};
use tracing::{info, instrument};

use crate::builder::{GraphBuilder, KnowledgeGraph};
use crate::related::{related_articles, RelatedArticle};
use crate::stats::GraphStats;

/// Articles scanned when looking for related work.
const RELATED_CANDIDATES: usize = 1000;

#[derive(Clone)]
pub struct KgService {
    articles: ArticleRepository,
    graph: GraphRepository,
}

impl KgService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            articles: ArticleRepository::new(db.clone()),
            graph: GraphRepository::new(db),
        }
    }

    /// Rebuild from the articles retrieved in the last `days` days (at most
    /// `limit`), replacing the stored graph in one transaction.
    #[instrument(skip(self, builder))]
    pub async fn rebuild(&self, builder: &GraphBuilder, days: u32, limit: usize) -> Result<GraphStats> {
        let articles = self
            .articles
            .get_recent(days, limit)
            .await
            .context("loading articles for graph rebuild")?;
        let graph = builder.build(&articles);
        self.graph
            .replace(&graph.nodes, &graph.edges)
            .await
            .context("storing knowledge graph")?;

        let stats = GraphStats::compute(&graph.nodes, &graph.edges);
        info!(
            articles = articles.len(),
            nodes = stats.nodes,
            edges = stats.edges,
            components = stats.components,
            "Knowledge graph rebuilt"
        );
        Ok(stats)
    }

    pub async fn load(&self) -> Result<KnowledgeGraph> {
        let nodes = self.graph.nodes().await.context("loading graph nodes")?;
        let edges = self.graph.edges().await.context("loading graph edges")?;
        Ok(KnowledgeGraph { nodes, edges })
    }

    pub async fn stats(&self) -> Result<GraphStats> {
        let graph = self.load().await?;
        Ok(GraphStats::compute(&graph.nodes, &graph.edges))
    }

    /// Related articles for `article_id`; empty when the article is unknown.
    pub async fn related(&self, article_id: &str, max: usize) -> Result<Vec<RelatedArticle>> {
        let Some(target) = self.articles.find_by_id(article_id).await? else {
            return Ok(Vec::new());
        };
        let candidates = self.articles.list_all(RELATED_CANDIDATES).await?;
        Ok(related_articles(&target, &candidates, max))
    }
}

/// One-shot rebuild used by the CLI and the scheduler.
pub async fn rebuild_graph(
    db: Arc<Database>,
    builder: &GraphBuilder,
    days: u32,
    limit: usize,
) -> Result<GraphStats> {
    KgService::new(db).rebuild(builder, days, limit).await
}

#[cfg(test)]
mod tests {
    use sciagg_common::{Article, Source};

    use super::*;

    fn article(id: &str, authors: &[&str]) -> Article {
        let mut a = Article::new(Source::Arxiv, id, format!("Paper {id}"));
        a.authors = authors.iter().map(|s| s.to_string()).collect();
        a.url = format!("https://arxiv.org/abs/{id}");
        a
    }

    async fn service() -> KgService {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let svc = KgService::new(db);
        for a in [
            article("1", &["Ana Ruiz", "Li Wei"]),
            article("2", &["Ana Ruiz", "Li Wei"]),
            article("3", &["Sam Okoro"]),
        ] {
            svc.articles.insert(&a).await.unwrap();
        }
        svc
    }

    #[tokio::test]
    async fn test_rebuild_replaces_graph() {
        let svc = service().await;
        let stats = svc.rebuild(&GraphBuilder::default(), 30, 100).await.unwrap();
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.edges, 1);

        let first = svc.load().await.unwrap();
        svc.rebuild(&GraphBuilder::default(), 30, 100).await.unwrap();
        assert_eq!(svc.load().await.unwrap(), first);
        assert_eq!(svc.stats().await.unwrap().components, 1);
    }

    #[tokio::test]
    async fn test_related() {
        let svc = service().await;
        let related = svc.related("arxiv:1", 5).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].article_id, "arxiv:2");
        assert!(svc.related("arxiv:missing", 5).await.unwrap().is_empty());
    }
}
