//! Post repository. Posts are written through
//! [`ArticleRepository::save_processed`](crate::articles::ArticleRepository::save_processed)
//! so the article body and its markdown record change together.

use std::sync::Arc;

use sciagg_common::Post;
use sqlx::Row;

use crate::database::{decode_ts, Database};
use crate::error::Result;

#[derive(Clone)]
pub struct PostRepository {
    db: Arc<Database>,
}

impl PostRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn find(&self, article_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT article_id, markdown_path, generated_at FROM posts WHERE article_id = ?")
            .bind(article_id)
            .fetch_optional(self.db.pool())
            .await?;
        match row {
            Some(row) => {
                let generated_at: String = row.try_get("generated_at")?;
                Ok(Some(Post {
                    article_id: row.try_get("article_id")?,
                    markdown_path: row.try_get("markdown_path")?,
                    generated_at: decode_ts("generated_at", &generated_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Most recently generated posts first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Post>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT article_id, markdown_path, generated_at FROM posts \
             ORDER BY generated_at DESC, article_id LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter()
            .map(|(article_id, markdown_path, generated_at)| {
                Ok(Post {
                    article_id,
                    markdown_path,
                    generated_at: decode_ts("generated_at", &generated_at)?,
                })
            })
            .collect()
    }

    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::ArticleRepository;
    use chrono::Utc;
    use sciagg_common::{Article, Source};

    #[tokio::test]
    async fn test_post_written_with_article() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let articles = ArticleRepository::new(db.clone());
        let posts = PostRepository::new(db);

        let article = Article::new(Source::Medrxiv, "10.1101/2024.01.01.1", "Trial");
        articles.insert(&article).await.unwrap();
        let post = Post {
            article_id: article.id.clone(),
            markdown_path: "outputs/posts/2024-01-01_trial.md".into(),
            generated_at: Utc::now(),
        };
        articles.save_processed(&article.id, "s", "p", Some(&post)).await.unwrap();
        // Regenerating replaces the record instead of adding one.
        articles.save_processed(&article.id, "s", "p", Some(&post)).await.unwrap();

        assert_eq!(posts.count().await.unwrap(), 1);
        let found = posts.find(&article.id).await.unwrap().unwrap();
        assert_eq!(found.markdown_path, post.markdown_path);
        assert_eq!(posts.list_recent(5).await.unwrap().len(), 1);
    }
}
