use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use postharvest_common::SessionCookie;
use webdriver_client::BrowserError;

use crate::error::ScrapeError;
use crate::traits::{Browser, Locator};

pub const USERNAME_FIELD: Locator<'static> = Locator::Id("username");
pub const PASSWORD_FIELD: Locator<'static> = Locator::Id("password");
pub const LOGIN_SUBMIT: Locator<'static> = Locator::XPath(r#"//form//button[@type="submit"]"#);

/// Cookie the site only sets for an authenticated session.
pub const SESSION_COOKIE: &str = "li_at";

#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How the session got authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Persisted cookies were re-injected. Holds the cookie count.
    ReusedCookies(usize),
    FreshLogin,
}

/// Authenticates a browser session, preferring persisted cookies over an
/// interactive login.
pub struct SessionManager {
    cookie_file: PathBuf,
    site_url: String,
    login_url: String,
    credentials: Credentials,
    settle: Duration,
}

impl SessionManager {
    pub fn new(
        cookie_file: PathBuf,
        site_url: String,
        login_url: String,
        credentials: Credentials,
        settle: Duration,
    ) -> Self {
        Self {
            cookie_file,
            site_url,
            login_url,
            credentials,
            settle,
        }
    }

    /// Every failure here is a session failure: the run cannot continue.
    pub async fn authenticate<B: Browser>(
        &self,
        browser: &B,
        now: DateTime<Utc>,
    ) -> Result<SessionOrigin, ScrapeError> {
        if tokio::fs::try_exists(&self.cookie_file).await.unwrap_or(false) {
            let count = self.reuse_cookies(browser, now).await?;
            info!(cookies = count, file = %self.cookie_file.display(), "Session restored from cookies");
            Ok(SessionOrigin::ReusedCookies(count))
        } else {
            self.login(browser).await?;
            info!("Logged in with credentials");
            Ok(SessionOrigin::FreshLogin)
        }
    }

    async fn reuse_cookies<B: Browser>(
        &self,
        browser: &B,
        now: DateTime<Utc>,
    ) -> Result<usize, ScrapeError> {
        let raw = tokio::fs::read_to_string(&self.cookie_file)
            .await
            .map_err(|e| session_err(format!("cannot read {}: {e}", self.cookie_file.display())))?;
        let cookies: Vec<SessionCookie> = serde_json::from_str(&raw).map_err(|e| {
            session_err(format!("corrupt cookie file {}: {e}", self.cookie_file.display()))
        })?;

        // Cookies can only be set for the domain currently loaded.
        browser.goto(&self.site_url).await.map_err(driver_err)?;

        let count = cookies.len();
        for mut cookie in cookies {
            cookie.extend_expiry(now);
            browser.add_cookie(cookie).await.map_err(driver_err)?;
        }
        Ok(count)
    }

    async fn login<B: Browser>(&self, browser: &B) -> Result<(), ScrapeError> {
        browser.goto(&self.login_url).await.map_err(driver_err)?;

        let username = self.require(browser, USERNAME_FIELD, "username field").await?;
        browser
            .fill(&username, &self.credentials.login)
            .await
            .map_err(driver_err)?;

        let password = self.require(browser, PASSWORD_FIELD, "password field").await?;
        browser
            .fill(&password, &self.credentials.password)
            .await
            .map_err(driver_err)?;

        let submit = self.require(browser, LOGIN_SUBMIT, "submit button").await?;
        browser.click(&submit).await.map_err(driver_err)?;

        tokio::time::sleep(self.settle).await;

        let cookies = browser.cookies().await.map_err(driver_err)?;
        if !cookies.iter().any(|c| c.name == SESSION_COOKIE) {
            warn!(
                cookie = SESSION_COOKIE,
                "No session cookie after login, check the credentials; cookies not saved"
            );
            return Ok(());
        }
        match self.persist(&cookies).await {
            Ok(()) => info!(file = %self.cookie_file.display(), "Session cookies saved"),
            Err(e) => {
                warn!(error = %e, file = %self.cookie_file.display(), "Could not save session cookies")
            }
        }
        Ok(())
    }

    async fn require<B: Browser>(
        &self,
        browser: &B,
        locator: Locator<'_>,
        what: &str,
    ) -> Result<B::Node, ScrapeError> {
        browser.find(locator).await.map_err(driver_err)?.ok_or_else(|| {
            session_err(format!(
                "login page {} has no {what}; check that the page opens and the connection works",
                self.login_url
            ))
        })
    }

    async fn persist(&self, cookies: &[SessionCookie]) -> anyhow::Result<()> {
        if let Some(parent) = self.cookie_file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(cookies)?;
        tokio::fs::write(&self.cookie_file, json).await?;
        Ok(())
    }
}

fn session_err(msg: String) -> ScrapeError {
    ScrapeError::Session(msg)
}

fn driver_err(err: BrowserError) -> ScrapeError {
    ScrapeError::Session(err.to_string())
}
