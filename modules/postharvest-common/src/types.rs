use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PostHarvestError;

/// Sentinel stored when a post's author element is missing.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Number of leading words that make up a post title.
const TITLE_WORDS: usize = 3;

/// Lifetime given to persisted session cookies when they are re-injected.
pub const COOKIE_LIFETIME_DAYS: i64 = 365;

/// SHA-256 hex digest of `input`. Used as the document-store idempotency key.
pub fn content_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

// --- Accounts ---

/// A profile whose activity feed gets scraped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountTarget {
    /// Profile URL, always with a trailing slash.
    pub profile_url: String,
    /// Last path segment of the profile URL (the public handle).
    pub owner_id: String,
    /// Activity feed page listing the profile's own posts.
    pub feed_url: String,
}

impl AccountTarget {
    pub fn parse(profile_url: &str) -> Result<Self, PostHarvestError> {
        let trimmed = profile_url.trim();
        let mut parsed = url::Url::parse(trimmed)
            .map_err(|e| PostHarvestError::InvalidAccount(format!("{trimmed}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(PostHarvestError::InvalidAccount(format!(
                "{trimmed}: only http/https profiles are supported"
            )));
        }
        parsed.set_query(None);
        parsed.set_fragment(None);

        let owner_id = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(String::from)
            .ok_or_else(|| {
                PostHarvestError::InvalidAccount(format!("{trimmed}: no profile handle in path"))
            })?;

        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        let feed_url = parsed
            .join("detail/recent-activity/shares/")
            .map_err(|e| PostHarvestError::InvalidAccount(format!("{trimmed}: {e}")))?;

        Ok(Self {
            profile_url: parsed.to_string(),
            owner_id,
            feed_url: feed_url.to_string(),
        })
    }
}

// --- Posts ---

/// Raw per-post fields as pulled off the page, defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPost {
    pub owner: String,
    pub text: String,
    pub url: Option<String>,
    pub likes: u64,
    pub comments: u64,
    pub language: String,
    pub time_label: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// One indexed post. Only constructible through [`PostRecord::new`], and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    owner_url: String,
    owner: String,
    owner_id: String,
    text: String,
    title: String,
    url: Option<String>,
    likes: u64,
    comments: u64,
    language: String,
    time_label: Option<String>,
    timestamp: Option<i64>,
    date: Option<DateTime<Utc>>,
    ingested_at: DateTime<Utc>,
    tags: Vec<String>,
}

impl PostRecord {
    pub fn new(
        account: &AccountTarget,
        post: ExtractedPost,
        tags: &[String],
        ingested_at: DateTime<Utc>,
    ) -> Self {
        let owner = if post.owner.trim().is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            post.owner.trim().to_string()
        };
        let title = title_of(&post.text);
        let url = post.url.filter(|u| !u.trim().is_empty());

        Self {
            owner_url: account.profile_url.clone(),
            owner,
            owner_id: account.owner_id.clone(),
            title,
            text: post.text,
            url,
            likes: post.likes,
            comments: post.comments,
            language: post.language,
            time_label: post.time_label,
            timestamp: post.posted_at.map(|t| t.timestamp()),
            date: post.posted_at,
            ingested_at,
            tags: tags.to_vec(),
        }
    }

    /// Idempotency key: hash of the post URL. Posts whose URL could not be
    /// read fall back to owner URL plus text.
    pub fn id(&self) -> String {
        match &self.url {
            Some(url) => content_hash(url),
            None => content_hash(&format!("{}\n{}", self.owner_url, self.text)),
        }
    }

    pub fn owner_url(&self) -> &str {
        &self.owner_url
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn likes(&self) -> u64 {
        self.likes
    }

    pub fn comments(&self) -> u64 {
        self.comments
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn time_label(&self) -> Option<&str> {
        self.time_label.as_deref()
    }

    /// Unix seconds derived from the relative time label.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

fn title_of(text: &str) -> String {
    text.split_whitespace()
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

// --- Session cookies ---

/// A browser cookie in W3C WebDriver JSON shape. Fields the driver adds
/// beyond the standard ones are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionCookie {
    /// Push the cookie's expiry to one year after `now` so a reused session stays valid.
    pub fn extend_expiry(&mut self, now: DateTime<Utc>) {
        self.expiry = Some((now + Duration::days(COOKIE_LIFETIME_DAYS)).timestamp());
    }
}
