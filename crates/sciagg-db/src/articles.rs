//! Article repository.
//!
//! Articles are unique on `(source, external_id)`. Inserts never overwrite an
//! existing row; the only in-place updates are the generated summary/post and
//! the user status flag.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sciagg_common::{Article, ArticleStatus, Post, Source};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, instrument};

use crate::database::{decode_date, decode_ts, encode_date, encode_ts, Database};
use crate::error::{DbError, Result};

const ARTICLE_COLUMNS: &str = "id, source, external_id, url, doi, title, authors, institutions, \
     topics, publication_date, abstract_text, summary, post_content, status, retrieved_at, updated_at";

/// Outcome of a batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

/// Dashboard listing filter. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub source: Option<Source>,
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
    pub processed_only: bool,
    pub offset: usize,
    pub limit: usize,
}

/// Repository for article operations.
#[derive(Clone)]
pub struct ArticleRepository {
    db: Arc<Database>,
}

impl ArticleRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new article. Returns `false` if `(source, external_id)` already exists.
    #[instrument(skip(self, article), fields(id = %article.id))]
    pub async fn insert(&self, article: &Article) -> Result<bool> {
        let mut conn = self.db.pool().acquire().await?;
        let inserted = insert_one(&mut *conn, article).await?;
        Ok(inserted)
    }

    /// Insert many articles in one transaction. Rows whose `(source, external_id)`
    /// or DOI already exist are skipped.
    #[instrument(skip(self, articles), fields(count = articles.len()))]
    pub async fn insert_batch(&self, articles: &[Article]) -> Result<InsertOutcome> {
        let mut outcome = InsertOutcome::default();
        if articles.is_empty() {
            return Ok(outcome);
        }

        let mut tx = self.db.pool().begin().await?;
        for article in articles {
            if let Some(doi) = article.doi.as_deref() {
                let existing: Option<(String,)> =
                    sqlx::query_as("SELECT id FROM articles WHERE doi = ? COLLATE NOCASE AND id <> ? LIMIT 1")
                        .bind(doi)
                        .bind(&article.id)
                        .fetch_optional(&mut *tx)
                        .await?;
                if let Some((existing_id,)) = existing {
                    debug!(id = %article.id, existing = %existing_id, "DOI already stored, skipping");
                    outcome.skipped += 1;
                    continue;
                }
            }
            if insert_one(&mut *tx, article).await? {
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        tx.commit().await?;

        debug!(inserted = outcome.inserted, skipped = outcome.skipped, "Batch stored");
        Ok(outcome)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(self.db.pool()).await?;
        row.as_ref().map(row_to_article).transpose()
    }

    pub async fn find_by_doi(&self, doi: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE doi = ? COLLATE NOCASE LIMIT 1");
        let row = sqlx::query(&sql).bind(doi).fetch_optional(self.db.pool()).await?;
        row.as_ref().map(row_to_article).transpose()
    }

    pub async fn exists(&self, source: Source, external_id: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM articles WHERE source = ? AND external_id = ?")
                .bind(source.as_str())
                .bind(external_id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(row.is_some())
    }

    /// Most recently retrieved articles from one source.
    pub async fn get_by_source(&self, source: Source, limit: usize) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE source = ? \
             ORDER BY retrieved_at DESC, id LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(source.as_str())
            .bind(limit as i64)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Articles retrieved within the last `days` days, newest first.
    pub async fn get_recent(&self, days: u32, limit: usize) -> Result<Vec<Article>> {
        let cutoff = Utc::now() - Duration::days(days as i64);
        self.retrieved_since(cutoff, limit).await
    }

    pub async fn retrieved_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE retrieved_at >= ? \
             ORDER BY retrieved_at DESC, id LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(encode_ts(&since))
            .bind(limit as i64)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Case-insensitive substring search over title, abstract and summary.
    pub async fn search(&self, term: &str, limit: usize) -> Result<Vec<Article>> {
        let pattern = format!("%{}%", escape_like(term));
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE title LIKE ? ESCAPE '\\' OR abstract_text LIKE ? ESCAPE '\\' \
                OR summary LIKE ? ESCAPE '\\' \
             ORDER BY retrieved_at DESC, id LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit as i64)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Articles still missing a summary or post, oldest first.
    pub async fn list_unprocessed(&self, limit: usize) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE (summary IS NULL OR post_content IS NULL) AND status <> 'discarded' \
             ORDER BY retrieved_at ASC, id LIMIT ?"
        );
        let rows = sqlx::query(&sql).bind(limit as i64).fetch_all(self.db.pool()).await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Filtered, paginated listing for the dashboard.
    pub async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE 1 = 1"));
        if let Some(source) = filter.source {
            qb.push(" AND source = ").push_bind(source.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if filter.processed_only {
            qb.push(" AND summary IS NOT NULL AND post_content IS NOT NULL");
        }
        if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(term.trim()));
            qb.push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR abstract_text LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        let limit = if filter.limit == 0 { 50 } else { filter.limit };
        qb.push(" ORDER BY retrieved_at DESC, id LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(filter.offset as i64);

        let rows = qb.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(row_to_article).collect()
    }

    /// All articles ordered by id, for exports and graph rebuilds.
    pub async fn list_all(&self, limit: usize) -> Result<Vec<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY id LIMIT ?");
        let rows = sqlx::query(&sql).bind(limit as i64).fetch_all(self.db.pool()).await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Store the generated summary and post body together with the post record.
    #[instrument(skip(self, summary, post_content, post))]
    pub async fn save_processed(
        &self,
        article_id: &str,
        summary: &str,
        post_content: &str,
        post: Option<&Post>,
    ) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        let updated = sqlx::query(
            "UPDATE articles SET summary = ?, post_content = ?, updated_at = ? WHERE id = ?",
        )
        .bind(summary)
        .bind(post_content)
        .bind(encode_ts(&Utc::now()))
        .bind(article_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound(article_id.to_string()));
        }

        if let Some(post) = post {
            sqlx::query(
                "INSERT INTO posts (article_id, markdown_path, generated_at) VALUES (?, ?, ?) \
                 ON CONFLICT(article_id) DO UPDATE SET \
                    markdown_path = excluded.markdown_path, generated_at = excluded.generated_at",
            )
            .bind(&post.article_id)
            .bind(&post.markdown_path)
            .bind(encode_ts(&post.generated_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Set the user save/discard flag. Returns `false` if the article does not exist.
    pub async fn set_status(&self, article_id: &str, status: ArticleStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE articles SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(encode_ts(&Utc::now()))
            .bind(article_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count as u64)
    }

    pub async fn count_by_source(&self, source: Source) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE source = ?")
            .bind(source.as_str())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count as u64)
    }

    /// Article count per source, ordered by source name.
    pub async fn source_counts(&self) -> Result<Vec<(Source, u64)>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, COUNT(*) FROM articles GROUP BY source ORDER BY source")
                .fetch_all(self.db.pool())
                .await?;
        rows.into_iter()
            .map(|(source, count)| Ok((parse_source(&source)?, count as u64)))
            .collect()
    }
}

async fn insert_one(conn: &mut sqlx::SqliteConnection, article: &Article) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles
            (id, source, external_id, url, doi, title, authors, institutions, topics,
             publication_date, abstract_text, summary, post_content, status,
             retrieved_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&article.id)
    .bind(article.source.as_str())
    .bind(&article.external_id)
    .bind(&article.url)
    .bind(&article.doi)
    .bind(&article.title)
    .bind(serde_json::to_string(&article.authors)?)
    .bind(serde_json::to_string(&article.institutions)?)
    .bind(serde_json::to_string(&article.topics)?)
    .bind(article.publication_date.as_ref().map(encode_date))
    .bind(&article.abstract_text)
    .bind(&article.summary)
    .bind(&article.post_content)
    .bind(article.status.as_str())
    .bind(encode_ts(&article.retrieved_at))
    .bind(encode_ts(&article.updated_at))
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn parse_source(value: &str) -> Result<Source> {
    Source::from_str(value).map_err(|_| DbError::InvalidData { column: "source", value: value.to_string() })
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let source: String = row.try_get("source")?;
    let status: String = row.try_get("status")?;
    let authors: String = row.try_get("authors")?;
    let institutions: String = row.try_get("institutions")?;
    let topics: String = row.try_get("topics")?;
    let publication_date: Option<String> = row.try_get("publication_date")?;
    let retrieved_at: String = row.try_get("retrieved_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Article {
        id: row.try_get("id")?,
        source: parse_source(&source)?,
        external_id: row.try_get("external_id")?,
        url: row.try_get("url")?,
        doi: row.try_get("doi")?,
        title: row.try_get("title")?,
        authors: serde_json::from_str(&authors)?,
        institutions: serde_json::from_str(&institutions)?,
        topics: serde_json::from_str(&topics)?,
        publication_date: publication_date
            .as_deref()
            .map(|d| decode_date("publication_date", d))
            .transpose()?,
        abstract_text: row.try_get("abstract_text")?,
        summary: row.try_get("summary")?,
        post_content: row.try_get("post_content")?,
        status: ArticleStatus::from_str(&status)
            .map_err(|_| DbError::InvalidData { column: "status", value: status.clone() })?,
        retrieved_at: decode_ts("retrieved_at", &retrieved_at)?,
        updated_at: decode_ts("updated_at", &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample(source: Source, external_id: &str, title: &str) -> Article {
        let mut a = Article::new(source, external_id, title);
        a.url = format!("https://example.org/{external_id}");
        a.authors = vec!["Ada Lovelace".into(), "Alan Turing".into()];
        a.topics = vec!["genomics".into()];
        a.abstract_text = format!("Abstract for {title}");
        a.publication_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        a
    }

    async fn repo() -> ArticleRepository {
        let db = Database::open_in_memory().await.unwrap();
        ArticleRepository::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let repo = repo().await;
        let article = sample(Source::Arxiv, "2401.00001", "Graph neural nets");
        assert!(repo.insert(&article).await.unwrap());

        let stored = repo.find_by_id("arxiv:2401.00001").await.unwrap().unwrap();
        assert_eq!(stored.title, "Graph neural nets");
        assert_eq!(stored.authors, article.authors);
        assert_eq!(stored.publication_date, article.publication_date);
        assert_eq!(stored.status, ArticleStatus::New);
    }

    #[tokio::test]
    async fn test_reinsert_same_source_id_is_skipped() {
        let repo = repo().await;
        let article = sample(Source::Arxiv, "2401.00001", "First");
        assert!(repo.insert(&article).await.unwrap());

        let mut again = article.clone();
        again.title = "Changed title".into();
        assert!(!repo.insert(&again).await.unwrap());

        let outcome = repo.insert_batch(&[again]).await.unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 0, skipped: 1 });
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.find_by_id(&article.id).await.unwrap().unwrap().title, "First");
    }

    #[tokio::test]
    async fn test_batch_skips_known_doi_from_other_source() {
        let repo = repo().await;
        let mut a = sample(Source::Crossref, "10.1000/xyz", "Paper");
        a.doi = Some("10.1000/xyz".into());
        let mut b = sample(Source::EuropePmc, "PMC123", "Paper");
        b.doi = Some("10.1000/XYZ".into());

        let outcome = repo.insert_batch(&[a, b]).await.unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 1, skipped: 1 });
        assert!(repo.find_by_doi("10.1000/xyz").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_and_source_counts() {
        let repo = repo().await;
        repo.insert_batch(&[
            sample(Source::Arxiv, "1", "Protein folding with transformers"),
            sample(Source::Arxiv, "2", "Soil microbiome survey"),
            sample(Source::Biorxiv, "10.1101/3", "Transformers for single-cell data"),
        ])
        .await
        .unwrap();

        let hits = repo.search("transformers", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(repo.search("100%", 10).await.unwrap().is_empty());

        let counts = repo.source_counts().await.unwrap();
        assert_eq!(counts, vec![(Source::Arxiv, 2), (Source::Biorxiv, 1)]);
        assert_eq!(repo.get_by_source(Source::Biorxiv, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_processed_and_status_flag() {
        let repo = repo().await;
        let article = sample(Source::Arxiv, "9", "Title");
        repo.insert(&article).await.unwrap();
        assert_eq!(repo.list_unprocessed(10).await.unwrap().len(), 1);

        let post = Post {
            article_id: article.id.clone(),
            markdown_path: "outputs/posts/x.md".into(),
            generated_at: Utc::now(),
        };
        repo.save_processed(&article.id, "summary", "# post", Some(&post)).await.unwrap();
        assert!(repo.list_unprocessed(10).await.unwrap().is_empty());
        assert!(repo.find_by_id(&article.id).await.unwrap().unwrap().is_processed());

        assert!(repo.set_status(&article.id, ArticleStatus::Saved).await.unwrap());
        assert!(!repo.set_status("arxiv:missing", ArticleStatus::Saved).await.unwrap());

        let saved = repo
            .list(&ArticleFilter { status: Some(ArticleStatus::Saved), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);

        let missing = repo.save_processed("arxiv:missing", "s", "p", None).await;
        assert!(matches!(missing, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_recent_uses_retrieval_time() {
        let repo = repo().await;
        let mut old = sample(Source::Arxiv, "old", "Old");
        old.retrieved_at = Utc::now() - Duration::days(40);
        repo.insert_batch(&[old, sample(Source::Arxiv, "new", "New")]).await.unwrap();

        let recent = repo.get_recent(30, 100).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].external_id, "new");
    }
}
