use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use postharvest_common::{AccountTarget, Config, FileConfig, PostRecord};
use searchstore_client::CreateOutcome;

use crate::accounts::AccountSource;
use crate::collector::ScrollCollector;
use crate::error::ScrapeError;
use crate::extractor::FieldExtractor;
use crate::session::{Credentials, SessionManager};
use crate::traits::{Browser, BrowserLauncher, DocumentStore};

/// Everything one scrape run needs, resolved from env and file config.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub accounts: AccountSource,
    pub cookie_file: PathBuf,
    pub site_url: String,
    pub login_url: String,
    pub credentials: Credentials,
    pub post_limit: Option<usize>,
    pub scroll_pause: Duration,
    pub max_scrolls: usize,
    pub login_settle: Duration,
    pub index: String,
    pub source_tags: Vec<String>,
    pub fallback_language: String,
}

impl ScrapeSettings {
    pub fn from_config(config: &Config, file: &FileConfig) -> Self {
        Self {
            accounts: AccountSource::Csv(file.site.accounts_csv.clone()),
            cookie_file: file.site.cookie_file.clone(),
            site_url: file.site.base_url.clone(),
            login_url: file.login_url(),
            credentials: Credentials {
                login: config.login_email.clone(),
                password: config.login_password.clone(),
            },
            post_limit: file.scroll.post_limit,
            scroll_pause: file.scroll_pause(),
            max_scrolls: file.scroll.max_scrolls,
            login_settle: file.login_settle(),
            index: file.index.name.clone(),
            source_tags: file.index.source_tags.clone(),
            fallback_language: file.index.fallback_language.clone(),
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub accounts_scraped: u32,
    pub accounts_failed: u32,
    pub posts_collected: u32,
    pub posts_indexed: u32,
    pub posts_duplicate: u32,
    pub posts_dropped: u32,
    pub upload_failures: u32,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accounts {}/{} ok, posts collected={} indexed={} duplicate={} dropped={} upload_failed={}",
            self.accounts_scraped,
            self.accounts_scraped + self.accounts_failed,
            self.posts_collected,
            self.posts_indexed,
            self.posts_duplicate,
            self.posts_dropped,
            self.upload_failures,
        )
    }
}

/// One pass over every account: authenticate, collect, extract, index.
pub struct Orchestrator<L, S> {
    launcher: L,
    store: S,
    accounts: AccountSource,
    session: SessionManager,
    collector: ScrollCollector,
    extractor: FieldExtractor,
    index: String,
    source_tags: Vec<String>,
}

impl<L: BrowserLauncher, S: DocumentStore> Orchestrator<L, S> {
    pub fn new(settings: ScrapeSettings, launcher: L, store: S) -> Self {
        Self {
            launcher,
            store,
            accounts: settings.accounts,
            session: SessionManager::new(
                settings.cookie_file,
                settings.site_url,
                settings.login_url,
                settings.credentials,
                settings.login_settle,
            ),
            collector: ScrollCollector::new(
                settings.post_limit,
                settings.scroll_pause,
                settings.max_scrolls,
            ),
            extractor: FieldExtractor::new(settings.fallback_language),
            index: settings.index,
            source_tags: settings.source_tags,
        }
    }

    /// Run once. Per-post and per-account failures are absorbed into the
    /// stats; anything returned as `Err` abandoned the whole run.
    pub async fn run_once(&self) -> Result<RunStats, ScrapeError> {
        let accounts = self.accounts.load()?;
        info!(accounts = accounts.len(), "Scrape run starting");

        let browser = self
            .launcher
            .launch()
            .await
            .map_err(|e| ScrapeError::Session(format!("cannot start browser: {e}")))?;

        let result = self.run_with(&browser, &accounts).await;

        if let Err(e) = browser.quit().await {
            warn!(error = %e, "Failed to close browser session");
        }
        result
    }

    async fn run_with<B: Browser>(
        &self,
        browser: &B,
        accounts: &[AccountTarget],
    ) -> Result<RunStats, ScrapeError> {
        self.session.authenticate(browser, Utc::now()).await?;

        let mut stats = RunStats::default();
        for account in accounts {
            match self.scrape_account(browser, account, &mut stats).await {
                Ok(()) => stats.accounts_scraped += 1,
                Err(e) => {
                    warn!(account = %account.profile_url, error = %e, "Account failed, moving on");
                    stats.accounts_failed += 1;
                }
            }
        }

        info!("Scrape run complete. {stats}");
        Ok(stats)
    }

    async fn scrape_account<B: Browser>(
        &self,
        browser: &B,
        account: &AccountTarget,
        stats: &mut RunStats,
    ) -> Result<(), ScrapeError> {
        info!(account = %account.profile_url, "Scraping account");
        browser.goto(&account.feed_url).await?;

        let collected = self.collector.collect(browser).await?;
        stats.posts_collected += collected.nodes.len() as u32;

        for node in &collected.nodes {
            let record = match self.extractor.extract(browser, node, Utc::now()).await {
                Ok(post) => PostRecord::new(account, post, &self.source_tags, Utc::now()),
                Err(e) => {
                    let e = ScrapeError::Extraction(e);
                    warn!(account = %account.profile_url, error = %e, "Dropping post");
                    stats.posts_dropped += 1;
                    continue;
                }
            };
            match self.upload(&record).await {
                Ok(CreateOutcome::Created) => stats.posts_indexed += 1,
                Ok(CreateOutcome::AlreadyExists) => stats.posts_duplicate += 1,
                Err(e) => {
                    warn!(id = %record.id(), error = %e, "Upload failed");
                    stats.upload_failures += 1;
                }
            }
        }
        Ok(())
    }

    async fn upload(&self, record: &PostRecord) -> Result<CreateOutcome, ScrapeError> {
        let doc = serde_json::to_value(record)?;
        Ok(self.store.create(&self.index, &record.id(), &doc).await?)
    }
}
