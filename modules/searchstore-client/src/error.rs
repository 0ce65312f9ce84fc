use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchStoreError>;

#[derive(Debug, Error)]
pub enum SearchStoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for SearchStoreError {
    fn from(err: reqwest::Error) -> Self {
        SearchStoreError::Network(err.to_string())
    }
}
