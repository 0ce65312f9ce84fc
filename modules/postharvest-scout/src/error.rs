use searchstore_client::SearchStoreError;
use webdriver_client::BrowserError;

/// Failures of one scrape run. Element-not-found never shows up here: the
/// extractor replaces missing elements with defaults.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Login or driver start-up failed. Fatal to the current run.
    #[error("Session failure: {0}")]
    Session(String),

    /// One post could not be built. The post is dropped, the batch continues.
    #[error("Extraction failed: {0}")]
    Extraction(#[source] BrowserError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Document store error: {0}")]
    Store(#[from] SearchStoreError),

    #[error("Account list error: {0}")]
    Accounts(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
