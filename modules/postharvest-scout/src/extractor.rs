// Per-post field extraction.
//
// Every field is looked up independently and falls back to its default when
// the element is missing:
//
//   author    -> "unknown"
//   time      -> no timestamp
//   text      -> ""
//   likes     -> 0
//   comments  -> 0
//   url       -> none
//   language  -> configured fallback
//
// Only real driver failures (stale session, dead browser) escape as errors.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use postharvest_common::{ExtractedPost, UNKNOWN_AUTHOR};
use webdriver_client::BrowserError;

use crate::time_label::parse_relative_at;
use crate::traits::{Browser, Locator};

/// Page locators for the activity feed markup.
pub mod selectors {
    use crate::traits::Locator;

    /// One feed entry.
    pub const POST: Locator<'static> =
        Locator::XPath(r#"//div[contains(@class,"occludable-update")]"#);
    pub const AUTHOR: Locator<'static> =
        Locator::XPath(r#".//*[@data-control-name="actor"]/h3/span/span[@dir="ltr"]"#);
    pub const TIME_LABEL: Locator<'static> = Locator::XPath(
        r#".//*[contains(@class,"feed-shared-actor__sub-description")]/div/span[1]"#,
    );
    pub const TEXT: Locator<'static> =
        Locator::XPath(r#".//*[contains(@class,"feed-shared-text")]/span[1]"#);
    pub const LIKES_BUTTON: Locator<'static> =
        Locator::XPath(r#".//*[@data-control-name="likes_count"]"#);
    pub const LIKES_COUNT: Locator<'static> = Locator::XPath(
        r#".//*[contains(@class,"social-details-social-counts__reactions-count")]"#,
    );
    pub const COMMENTS: Locator<'static> =
        Locator::XPath(r#".//*[@data-control-name="comments_count"]/span"#);
    /// Link inside the toast shown after "copy link to post". Page-level.
    pub const SHARE_TOAST_LINK: Locator<'static> =
        Locator::XPath(r#"//*[contains(@class,"artdeco-toast-item__cta")]"#);
}

/// Clicks the post's "copy link" menu entry; the share toast then holds the URL.
pub const COPY_LINK_SCRIPT: &str =
    r#"arguments[0].getElementsByTagName("artdeco-dropdown-item")[0].click();"#;

pub struct FieldExtractor {
    fallback_language: String,
}

impl FieldExtractor {
    pub fn new(fallback_language: impl Into<String>) -> Self {
        Self {
            fallback_language: fallback_language.into(),
        }
    }

    /// Pull every field out of one post node. `now` anchors relative time labels.
    pub async fn extract<B: Browser>(
        &self,
        browser: &B,
        node: &B::Node,
        now: DateTime<Utc>,
    ) -> Result<ExtractedPost, BrowserError> {
        let owner = self.author(browser, node).await?;
        let (time_label, posted_at) = self.posted_at(browser, node, now).await?;
        let text = self.text(browser, node).await?;
        let likes = self.likes(browser, node).await?;
        let comments = self.comments(browser, node).await?;
        let url = self.url(browser, node).await?;
        let language = detect_language(&text, &self.fallback_language);

        Ok(ExtractedPost {
            owner,
            text,
            url,
            likes,
            comments,
            language,
            time_label,
            posted_at,
        })
    }

    async fn author<B: Browser>(&self, browser: &B, node: &B::Node) -> Result<String, BrowserError> {
        Ok(text_of(browser, node, selectors::AUTHOR)
            .await?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()))
    }

    async fn posted_at<B: Browser>(
        &self,
        browser: &B,
        node: &B::Node,
        now: DateTime<Utc>,
    ) -> Result<(Option<String>, Option<DateTime<Utc>>), BrowserError> {
        let Some(label) = text_of(browser, node, selectors::TIME_LABEL).await? else {
            return Ok((None, None));
        };
        let label = label.trim().to_lowercase();
        match parse_relative_at(&label, now) {
            Ok(at) => Ok((Some(label), Some(at))),
            Err(e) => {
                warn!(error = %e, "post time label not understood, leaving date empty");
                Ok((Some(label), None))
            }
        }
    }

    async fn text<B: Browser>(&self, browser: &B, node: &B::Node) -> Result<String, BrowserError> {
        Ok(text_of(browser, node, selectors::TEXT)
            .await?
            .unwrap_or_default())
    }

    async fn likes<B: Browser>(&self, browser: &B, node: &B::Node) -> Result<u64, BrowserError> {
        let Some(button) = browser.find_in(node, selectors::LIKES_BUTTON).await? else {
            return Ok(0);
        };
        Ok(text_of(browser, &button, selectors::LIKES_COUNT)
            .await?
            .map(|s| parse_count(&s))
            .unwrap_or(0))
    }

    async fn comments<B: Browser>(&self, browser: &B, node: &B::Node) -> Result<u64, BrowserError> {
        Ok(text_of(browser, node, selectors::COMMENTS)
            .await?
            .map(|s| parse_count(&s))
            .unwrap_or(0))
    }

    /// Has a side effect: clicks the post's "copy link" entry so the page
    /// shows a share toast, then reads the link off that toast. The toast is
    /// page-level and can outlive an earlier click, so a link equal to the
    /// one shown before the click is not trusted.
    async fn url<B: Browser>(
        &self,
        browser: &B,
        node: &B::Node,
    ) -> Result<Option<String>, BrowserError> {
        let before = toast_href(browser).await?;
        match browser.execute(COPY_LINK_SCRIPT, &[node]).await {
            Ok(_) => {}
            Err(BrowserError::Script(e)) => {
                debug!(error = %e, "no copy-link entry on post");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        match toast_href(browser).await? {
            Some(href) if before.as_deref() == Some(href.as_str()) => {
                warn!(href = %href, "share toast did not change after copy-link, leaving url empty");
                Ok(None)
            }
            href => Ok(href),
        }
    }
}

async fn toast_href<B: Browser>(browser: &B) -> Result<Option<String>, BrowserError> {
    let Some(toast) = browser.find(selectors::SHARE_TOAST_LINK).await? else {
        return Ok(None);
    };
    Ok(browser
        .attribute(&toast, "href")
        .await?
        .filter(|href| !href.trim().is_empty()))
}

async fn text_of<B: Browser>(
    browser: &B,
    node: &B::Node,
    locator: Locator<'_>,
) -> Result<Option<String>, BrowserError> {
    match browser.find_in(node, locator).await? {
        Some(el) => Ok(Some(browser.text(&el).await?)),
        None => Ok(None),
    }
}

/// Count parse: "1,234 reactions" -> 1234, "1.2K" -> 1200, "3M" -> 3000000.
/// Without a K/M suffix `,` `.` and spaces are thousands separators, so a
/// plain decimal like "1.5" reads as 15. No digits -> 0.
pub fn parse_count(raw: &str) -> u64 {
    if let Some(n) = parse_abbreviated(raw) {
        return n;
    }
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | '\'' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    let digits: String = cleaned
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// "1.2K", "3,4 M", "12K reactions". The suffix must stand alone, so
/// "12 Kommentare" is not read as thousands.
fn parse_abbreviated(raw: &str) -> Option<u64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let rest = &raw[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(rest.len());
    let (number, tail) = rest.split_at(end);
    let tail = tail.trim_start();
    let multiplier = match tail.chars().next()? {
        'k' | 'K' => 1_000.0,
        'm' | 'M' => 1_000_000.0,
        _ => return None,
    };
    if tail[1..].chars().next().is_some_and(char::is_alphabetic) {
        return None;
    }
    let value: f64 = number.replace(',', ".").parse().ok()?;
    Some((value * multiplier).round() as u64)
}

/// ISO 639-3 code of the text's language, or `fallback` when detection is
/// not reliable.
pub fn detect_language(text: &str, fallback: &str) -> String {
    match whatlang::detect(text) {
        Some(info) if info.is_reliable() => info.lang().code().to_string(),
        _ => fallback.to_string(),
    }
}
