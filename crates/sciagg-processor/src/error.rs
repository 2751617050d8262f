use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Database error: {0}")]
    Db(#[from] sciagg_db::DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
