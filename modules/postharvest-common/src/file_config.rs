use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// TOML-backed scraping configuration loaded from disk.
/// Credentials stay as env vars (see [`Config`](crate::Config)).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub site: SiteConfig,
    pub scroll: ScrollConfig,
    pub schedule: ScheduleConfig,
    pub index: IndexConfig,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SiteConfig {
    /// Site root; the login page is `<base_url>login`.
    pub base_url: String,
    /// CSV file listing the profiles to scrape (one `url` column).
    pub accounts_csv: PathBuf,
    /// Where session cookies are persisted between runs.
    pub cookie_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScrollConfig {
    /// Stop collecting once this many posts are found. Unset = whole feed.
    pub post_limit: Option<usize>,
    pub pause_ms: u64,
    pub max_scrolls: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScheduleConfig {
    pub poll_min_secs: u64,
    pub poll_max_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IndexConfig {
    pub name: String,
    pub source_tags: Vec<String>,
    pub fallback_language: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub login_settle_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com/".to_string(),
            accounts_csv: PathBuf::from("accounts.csv"),
            cookie_file: PathBuf::from("cookiefile.json"),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            post_limit: None,
            pause_ms: 3_000,
            max_scrolls: 200,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_min_secs: 15 * 60,
            poll_max_secs: 45 * 60,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: "social-posts".to_string(),
            source_tags: vec!["linkedin".to_string(), "social".to_string()],
            fallback_language: "eng".to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            login_settle_ms: 5_000,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.schedule.poll_min_secs > self.schedule.poll_max_secs {
            bail!(
                "schedule.poll_min_secs ({}) must not exceed schedule.poll_max_secs ({})",
                self.schedule.poll_min_secs,
                self.schedule.poll_max_secs
            );
        }
        if self.index.name.trim().is_empty() {
            bail!("index.name must not be empty");
        }
        if self.scroll.post_limit == Some(0) {
            bail!("scroll.post_limit must be at least 1 when set");
        }
        url::Url::parse(&self.site.base_url)
            .with_context(|| format!("site.base_url is not a URL: {}", self.site.base_url))?;
        Ok(())
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.site.base_url.trim_end_matches('/'))
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll.pause_ms)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.browser.login_settle_ms)
    }

    pub fn poll_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.schedule.poll_min_secs),
            Duration::from_secs(self.schedule.poll_max_secs),
        )
    }
}

/// Load, parse and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}
