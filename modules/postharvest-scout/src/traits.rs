// Trait seams for the two external collaborators.
//
// Browser: the capability object the collector, extractor and session
//   manager drive. Lookups return Option so "element not found" is a value,
//   never an error.
// DocumentStore: create-by-id into a named index.
//
// Both have in-memory mocks in `testing` so the whole pipeline runs under
// `cargo test` without chromedriver or a search cluster.

use async_trait::async_trait;
use serde_json::Value;

use postharvest_common::SessionCookie;
use searchstore_client::{CreateOutcome, SearchStoreClient, SearchStoreError};
use webdriver_client::{BrowserError, WebDriverSession, WebElement};

pub use webdriver_client::Locator;

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Browser: Send + Sync {
    type Node: Clone + Send + Sync;

    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Every page element matching `locator`, in document order.
    async fn find_all(&self, locator: Locator<'_>) -> Result<Vec<Self::Node>, BrowserError>;

    /// First page element matching `locator`.
    async fn find(&self, locator: Locator<'_>) -> Result<Option<Self::Node>, BrowserError>;

    /// First descendant of `node` matching `locator`.
    async fn find_in(
        &self,
        node: &Self::Node,
        locator: Locator<'_>,
    ) -> Result<Option<Self::Node>, BrowserError>;

    async fn text(&self, node: &Self::Node) -> Result<String, BrowserError>;

    async fn attribute(&self, node: &Self::Node, name: &str)
        -> Result<Option<String>, BrowserError>;

    /// Run an in-page script; `args` become `arguments[i]`.
    async fn execute(&self, script: &str, args: &[&Self::Node]) -> Result<Value, BrowserError>;

    async fn click(&self, node: &Self::Node) -> Result<(), BrowserError>;

    /// Clear an input, then type into it.
    async fn fill(&self, node: &Self::Node, text: &str) -> Result<(), BrowserError>;

    async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError>;

    async fn add_cookie(&self, cookie: SessionCookie) -> Result<(), BrowserError>;

    async fn quit(&self) -> Result<(), BrowserError>;
}

/// Starts a fresh browser session for each run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Browser: Browser;

    async fn launch(&self) -> Result<Self::Browser, BrowserError>;
}

#[async_trait]
impl Browser for WebDriverSession {
    type Node = WebElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        WebDriverSession::goto(self, url).await
    }

    async fn find_all(&self, locator: Locator<'_>) -> Result<Vec<WebElement>, BrowserError> {
        WebDriverSession::find_all(self, locator).await
    }

    async fn find(&self, locator: Locator<'_>) -> Result<Option<WebElement>, BrowserError> {
        WebDriverSession::find(self, locator).await
    }

    async fn find_in(
        &self,
        node: &WebElement,
        locator: Locator<'_>,
    ) -> Result<Option<WebElement>, BrowserError> {
        WebDriverSession::find_in(self, node, locator).await
    }

    async fn text(&self, node: &WebElement) -> Result<String, BrowserError> {
        WebDriverSession::text(self, node).await
    }

    async fn attribute(
        &self,
        node: &WebElement,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        WebDriverSession::attribute(self, node, name).await
    }

    async fn execute(&self, script: &str, args: &[&WebElement]) -> Result<Value, BrowserError> {
        WebDriverSession::execute(self, script, args).await
    }

    async fn click(&self, node: &WebElement) -> Result<(), BrowserError> {
        WebDriverSession::click(self, node).await
    }

    async fn fill(&self, node: &WebElement, text: &str) -> Result<(), BrowserError> {
        WebDriverSession::fill(self, node, text).await
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError> {
        WebDriverSession::cookies(self)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(BrowserError::from))
            .collect()
    }

    async fn add_cookie(&self, cookie: SessionCookie) -> Result<(), BrowserError> {
        WebDriverSession::add_cookie(self, serde_json::to_value(cookie)?).await
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        WebDriverSession::quit(self).await
    }
}

/// Launches Chrome through a running chromedriver.
pub struct ChromeLauncher {
    pub webdriver_url: String,
    pub headless: bool,
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Browser = WebDriverSession;

    async fn launch(&self) -> Result<WebDriverSession, BrowserError> {
        WebDriverSession::start(&self.webdriver_url, self.headless).await
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create `doc` under `id` in `index`. An existing id is reported as
    /// `AlreadyExists`, not as an error.
    async fn create(
        &self,
        index: &str,
        id: &str,
        doc: &Value,
    ) -> Result<CreateOutcome, SearchStoreError>;
}

#[async_trait]
impl DocumentStore for SearchStoreClient {
    async fn create(
        &self,
        index: &str,
        id: &str,
        doc: &Value,
    ) -> Result<CreateOutcome, SearchStoreError> {
        SearchStoreClient::create(self, index, id, doc).await
    }
}
