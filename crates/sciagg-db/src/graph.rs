//! Knowledge graph tables. The graph is never updated incrementally:
//! [`GraphRepository::replace`] swaps the whole node/edge set in one transaction.

use std::str::FromStr;
use std::sync::Arc;

use sciagg_common::{EntityKind, GraphEdge, GraphNode};
use tracing::{info, instrument};

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Clone)]
pub struct GraphRepository {
    db: Arc<Database>,
}

impl GraphRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Delete the stored graph and write `nodes`/`edges` in its place.
    #[instrument(skip(self, nodes, edges), fields(nodes = nodes.len(), edges = edges.len()))]
    pub async fn replace(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM graph_edges").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM graph_nodes").execute(&mut *tx).await?;

        for node in nodes {
            sqlx::query("INSERT INTO graph_nodes (id, name, kind, frequency) VALUES (?, ?, ?, ?)")
                .bind(&node.id)
                .bind(&node.name)
                .bind(node.kind.as_str())
                .bind(node.frequency as i64)
                .execute(&mut *tx)
                .await?;
        }
        for edge in edges {
            sqlx::query("INSERT INTO graph_edges (source, target, weight) VALUES (?, ?, ?)")
                .bind(&edge.source)
                .bind(&edge.target)
                .bind(edge.weight as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Knowledge graph replaced");
        Ok(())
    }

    /// Nodes ordered by frequency (desc) then id.
    pub async fn nodes(&self) -> Result<Vec<GraphNode>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT id, name, kind, frequency FROM graph_nodes ORDER BY frequency DESC, id",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter()
            .map(|(id, name, kind, frequency)| {
                let kind = EntityKind::from_str(&kind)
                    .map_err(|_| DbError::InvalidData { column: "kind", value: kind.clone() })?;
                Ok(GraphNode { id, name, kind, frequency: frequency as u32 })
            })
            .collect()
    }

    /// Edges ordered by weight (desc) then endpoints.
    pub async fn edges(&self) -> Result<Vec<GraphEdge>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT source, target, weight FROM graph_edges ORDER BY weight DESC, source, target",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(source, target, weight)| GraphEdge { source, target, weight: weight as u32 })
            .collect())
    }
}
