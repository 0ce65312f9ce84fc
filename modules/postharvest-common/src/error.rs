use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostHarvestError {
    #[error("Invalid account URL: {0}")]
    InvalidAccount(String),
}
