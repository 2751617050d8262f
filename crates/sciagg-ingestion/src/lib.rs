//! sciagg-ingestion — article harvesting.
//!
//! - Source clients for arXiv, Europe PMC, Crossref, bioRxiv/medRxiv and RSS/Atom feeds
//! - Per-source rate limiting and bounded retries
//! - Record validation and cleaning
//! - In-batch deduplication by DOI and URL
//! - The harvest run that fans out over sources and persists new articles

pub mod dedup;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod sources;
pub mod validate;

pub use error::{HarvestError, Result};
pub use pipeline::{available_sources, run_harvest, test_sources, HarvestJob, HarvestProgress, HarvestResult};
pub use sources::{build_source, ArticleSource, HarvestQuery};
