pub mod error;

pub use error::{BrowserError, Result};
pub use thirtyfour::WebElement;

use serde_json::Value;
use thirtyfour::prelude::*;
use thirtyfour::{ChromiumLikeCapabilities, Cookie};

/// Chrome flags every session is started with.
const CHROME_ARGS: &[&str] = &["--ignore-certificate-errors", "--test-type", "--no-sandbox"];

/// How to locate an element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    XPath(&'a str),
    Id(&'a str),
}

impl<'a> Locator<'a> {
    fn by(self) -> By {
        match self {
            Locator::XPath(xpath) => By::XPath(xpath),
            Locator::Id(id) => By::Id(id),
        }
    }
}

/// One chromedriver session. Every call blocks (awaits) until the driver answers.
pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    /// Open a Chrome session against a running chromedriver at `webdriver_url`.
    pub async fn start(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in CHROME_ARGS {
            caps.add_arg(arg)
                .map_err(|e| BrowserError::Session(e.to_string()))?;
        }
        if headless {
            caps.set_headless()
                .map_err(|e| BrowserError::Session(e.to_string()))?;
        }

        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .map_err(|e| BrowserError::Session(format!("cannot start Chrome session: {e}")))?;
        tracing::info!(webdriver_url, headless, "WebDriver session started");

        Ok(Self { driver })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "navigating");
        self.driver.goto(url).await?;
        Ok(())
    }

    /// All page elements matching `locator`. Empty when none match.
    pub async fn find_all(&self, locator: Locator<'_>) -> Result<Vec<WebElement>> {
        match self.driver.find_all(locator.by()).await {
            Ok(elements) => Ok(elements),
            Err(e) if BrowserError::is_no_such_element(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// First page element matching `locator`, or `None`.
    pub async fn find(&self, locator: Locator<'_>) -> Result<Option<WebElement>> {
        optional(self.driver.find(locator.by()).await)
    }

    /// First descendant of `element` matching `locator`, or `None`.
    pub async fn find_in(
        &self,
        element: &WebElement,
        locator: Locator<'_>,
    ) -> Result<Option<WebElement>> {
        optional(element.find(locator.by()).await)
    }

    pub async fn text(&self, element: &WebElement) -> Result<String> {
        Ok(element.text().await?)
    }

    pub async fn attribute(&self, element: &WebElement, name: &str) -> Result<Option<String>> {
        Ok(element.attr(name).await?)
    }

    /// Run `script` in the page. `args` are exposed to it as `arguments[i]`.
    pub async fn execute(&self, script: &str, args: &[&WebElement]) -> Result<Value> {
        let args = args
            .iter()
            .map(|e| e.to_json())
            .collect::<WebDriverResult<Vec<Value>>>()?;
        let ret = self.driver.execute(script, args).await?;
        Ok(ret.json().clone())
    }

    pub async fn click(&self, element: &WebElement) -> Result<()> {
        element.click().await?;
        Ok(())
    }

    /// Clear an input and type `text` into it.
    pub async fn fill(&self, element: &WebElement, text: &str) -> Result<()> {
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    /// All cookies of the current browsing context, as W3C cookie JSON objects.
    pub async fn cookies(&self) -> Result<Vec<Value>> {
        let cookies = self.driver.get_all_cookies().await?;
        let values = cookies
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }

    /// Add a cookie given as a W3C cookie JSON object.
    pub async fn add_cookie(&self, cookie: Value) -> Result<()> {
        let cookie: Cookie = serde_json::from_value(cookie)?;
        self.driver.add_cookie(cookie).await?;
        Ok(())
    }

    /// End the session and close the browser.
    pub async fn quit(&self) -> Result<()> {
        self.driver.clone().quit().await?;
        tracing::info!("WebDriver session closed");
        Ok(())
    }
}

fn optional<T>(res: WebDriverResult<T>) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if BrowserError::is_no_such_element(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
