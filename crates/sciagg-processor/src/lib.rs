//! sciagg-processor — turns stored abstracts into readable output.
//!
//! - Heuristic extraction of problem, method, results and conclusions
//! - Casual-language summaries with jargon substitution
//! - Long-form posts rendered to markdown files with front matter
//! - Daily digest and bulk export (markdown, JSON, CSV)

pub mod digest;
pub mod error;
pub mod export;
pub mod extract;
pub mod jargon;
pub mod markdown;
pub mod pipeline;
pub mod post;
pub mod summarizer;

pub use error::{ProcessError, Result};
pub use export::{export_articles, ExportFormat};
pub use digest::{build_digest, write_digest};
pub use pipeline::{process_article, run_processing, ProcessedArticle, ProcessingConfig, ProcessingResult};
pub use post::{PostGenerator, ResearchArea};
pub use summarizer::{Summarizer, SummaryStyle};
