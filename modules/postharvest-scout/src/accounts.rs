use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use postharvest_common::AccountTarget;

use crate::error::ScrapeError;

/// Where the list of profiles to scrape comes from. Re-read at every run so
/// edits to the file apply on the next cycle.
#[derive(Debug, Clone)]
pub enum AccountSource {
    /// CSV file with a `url` column.
    Csv(PathBuf),
    Fixed(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    url: String,
}

impl AccountSource {
    pub fn load(&self) -> Result<Vec<AccountTarget>, ScrapeError> {
        let urls = match self {
            AccountSource::Csv(path) => read_csv(path)?,
            AccountSource::Fixed(urls) => urls.clone(),
        };
        Ok(parse_targets(urls))
    }
}

fn read_csv(path: &Path) -> Result<Vec<String>, ScrapeError> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ScrapeError::Accounts(format!("{}: {e}", path.display())))?;

    let mut urls = Vec::new();
    for (line, row) in reader.deserialize::<AccountRow>().enumerate() {
        match row {
            Ok(row) => urls.push(row.url),
            Err(e) => warn!(file = %path.display(), row = line + 1, error = %e, "skipping unreadable account row"),
        }
    }
    Ok(urls)
}

fn parse_targets(urls: Vec<String>) -> Vec<AccountTarget> {
    urls.into_iter()
        .filter(|u| !u.trim().is_empty())
        .filter_map(|u| match AccountTarget::parse(&u) {
            Ok(target) => Some(target),
            Err(e) => {
                warn!(error = %e, "skipping invalid account");
                None
            }
        })
        .collect()
}
