//! sciagg-common — Shared records, configuration, errors and logging setup used by all sciagg crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod text;

// Re-export commonly used types
pub use config::{ApiKeys, AppConfig, Settings, SourceKeys};
pub use error::{Result, SciaggError};
pub use models::{Article, ArticleStatus, EntityKind, GraphEdge, GraphNode, Post, Source};
