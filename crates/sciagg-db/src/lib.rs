//! sciagg Database Layer
//!
//! Embedded SQLite storage for harvested articles, generated posts, the
//! co-occurrence graph and the run log.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sciagg_db::{ArticleRepository, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(Database::open("./data/articles.db").await?);
//!     let articles = ArticleRepository::new(db);
//!     println!("{} articles", articles.count().await?);
//!     Ok(())
//! }
//! ```

pub mod articles;
pub mod database;
pub mod error;
pub mod graph;
pub mod posts;
pub mod runs;
pub mod schema;

pub use articles::{ArticleFilter, ArticleRepository, InsertOutcome};
pub use database::{Database, DatabaseStats};
pub use error::{DbError, Result};
pub use graph::GraphRepository;
pub use posts::PostRepository;
pub use runs::{RunRecord, RunRepository, RunStatus};
