use thirtyfour::error::{WebDriverError, WebDriverErrorInner};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("WebDriver error: {0}")]
    Driver(String),

    #[error("Cookie conversion error: {0}")]
    Cookie(String),
}

impl BrowserError {
    /// True when the driver reported that an element lookup came back empty.
    pub(crate) fn is_no_such_element(err: &WebDriverError) -> bool {
        matches!(err.as_inner(), WebDriverErrorInner::NoSuchElement(..))
    }
}

impl From<WebDriverError> for BrowserError {
    fn from(err: WebDriverError) -> Self {
        match err.as_inner() {
            WebDriverErrorInner::JavascriptError(..) => BrowserError::Script(err.to_string()),
            _ => BrowserError::Driver(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(err: serde_json::Error) -> Self {
        BrowserError::Cookie(err.to_string())
    }
}
