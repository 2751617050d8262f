//! Harvest error taxonomy.

use sciagg_common::Source;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Network failure, 429 or 5xx that outlived every retry.
    #[error("{origin}: transient failure after {attempts} attempt(s): {message}")]
    Transient { origin: Source, attempts: u32, message: String },

    /// The API rejected the request (4xx other than 429).
    #[error("{origin}: request rejected: {message}")]
    Permanent { origin: Source, message: String },

    /// The response body could not be decoded at all.
    #[error("{origin}: unreadable response: {message}")]
    Parse { origin: Source, message: String },

    #[error("{0} has no harvester")]
    Unsupported(Source),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] sciagg_db::DbError),
}

impl HarvestError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Source the failure belongs to, when there is one.
    pub fn origin(&self) -> Option<Source> {
        match self {
            Self::Transient { origin, .. }
            | Self::Permanent { origin, .. }
            | Self::Parse { origin, .. } => Some(*origin),
            Self::Unsupported(source) => Some(*source),
            Self::Client(_) | Self::Storage(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
