use thiserror::Error;

pub type Result<T> = std::result::Result<T, NocoError>;

#[derive(Debug, Error)]
pub enum NocoError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Batch of {0} exceeds the {max} records/request API limit", max = crate::MAX_BATCH)]
    BatchTooLarge(usize),

    #[error("Table not found in base: {0}")]
    TableNotFound(String),
}

impl From<reqwest::Error> for NocoError {
    fn from(err: reqwest::Error) -> Self {
        NocoError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for NocoError {
    fn from(err: serde_json::Error) -> Self {
        NocoError::Parse(err.to_string())
    }
}
