use std::env;

use anyhow::{Context, Result};

/// Secrets and endpoints loaded from environment variables.
/// Scraping knobs live in the TOML [`FileConfig`](crate::FileConfig).
#[derive(Debug, Clone)]
pub struct Config {
    // Site login
    pub login_email: String,
    pub login_password: String,

    // Browser
    pub webdriver_url: String,

    // Search store
    pub search_url: String,
    pub search_user: Option<String>,
    pub search_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            login_email: required_env("LOGIN_EMAIL")?,
            login_password: required_env("LOGIN_PASSWORD")?,
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            search_url: env::var("SEARCH_URL")
                .unwrap_or_else(|_| "http://localhost:9200".to_string()),
            search_user: env::var("SEARCH_USER").ok().filter(|s| !s.is_empty()),
            search_password: env::var("SEARCH_PASSWORD").ok().filter(|s| !s.is_empty()),
        })
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().take(3).map(char::len_utf8).sum::<usize>();
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => preview(v),
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  LOGIN_EMAIL: {}", preview(&self.login_email));
        tracing::info!("  LOGIN_PASSWORD: {}", preview(&self.login_password));
        tracing::info!("  WEBDRIVER_URL: {}", self.webdriver_url);
        tracing::info!("  SEARCH_URL: {}", self.search_url);
        tracing::info!("  SEARCH_USER: {}", preview_opt(&self.search_user));
        tracing::info!("  SEARCH_PASSWORD: {}", preview_opt(&self.search_password));
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} environment variable is required"))
}
