//! End-to-end scrape runs against the in-memory browser and store.
//!
//! Covers the run-level guarantees: every collected post lands in the index
//! once, account and upload failures stay local, and the browser session is
//! closed whatever happens.

use std::path::{Path, PathBuf};
use std::time::Duration;

use postharvest_common::{content_hash, AccountTarget};
use postharvest_scout::accounts::AccountSource;
use postharvest_scout::session::Credentials;
use postharvest_scout::testing::{post_url, MockBrowser, MockLauncher, MockPost, MockStore};
use postharvest_scout::{Orchestrator, ScrapeError, ScrapeSettings};

const INDEX: &str = "social-posts";
const JANE: &str = "https://www.linkedin.com/in/jane-doe/";
const JOHN: &str = "https://www.linkedin.com/in/john-roe/";
const GONE: &str = "https://www.linkedin.com/in/deleted-account/";

fn settings(accounts: &[&str], cookie_file: PathBuf) -> ScrapeSettings {
    ScrapeSettings {
        accounts: AccountSource::Fixed(accounts.iter().map(|a| a.to_string()).collect()),
        cookie_file,
        site_url: "https://www.linkedin.com/".to_string(),
        login_url: "https://www.linkedin.com/login".to_string(),
        credentials: Credentials {
            login: "me@example.com".to_string(),
            password: "hunter2".to_string(),
        },
        post_limit: None,
        scroll_pause: Duration::ZERO,
        max_scrolls: 10,
        login_settle: Duration::ZERO,
        index: INDEX.to_string(),
        source_tags: vec!["linkedin".to_string(), "social".to_string()],
        fallback_language: "eng".to_string(),
    }
}

fn feed_url(profile: &str) -> String {
    AccountTarget::parse(profile).unwrap().feed_url
}

fn posts(range: std::ops::Range<usize>) -> Vec<MockPost> {
    range.map(MockPost::complete).collect()
}

fn write_cookie_file(dir: &Path) -> PathBuf {
    let path = dir.join("cookies.json");
    std::fs::write(
        &path,
        r#"[{"name":"li_at","value":"token","domain":".linkedin.com","expiry":1}]"#,
    )
    .unwrap();
    path
}

/// Jane has 7 posts over two feed stages, John has 2.
fn two_account_browser() -> MockBrowser {
    MockBrowser::new()
        .with_account_feed(&feed_url(JANE), vec![posts(0..5), posts(0..7)])
        .with_account_feed(&feed_url(JOHN), vec![posts(100..102)])
}

#[tokio::test]
async fn full_run_indexes_every_post() {
    let dir = tempfile::tempdir().unwrap();
    let browser = two_account_browser();
    let store = MockStore::new();
    let orchestrator = Orchestrator::new(
        settings(&[JANE, JOHN], write_cookie_file(dir.path())),
        MockLauncher::new(browser.clone()),
        store.clone(),
    );

    let stats = orchestrator.run_once().await.unwrap();

    assert_eq!(stats.accounts_scraped, 2);
    assert_eq!(stats.accounts_failed, 0);
    assert_eq!(stats.posts_collected, 9);
    assert_eq!(stats.posts_indexed, 9);
    assert_eq!(store.len(), 9);
    assert!(browser.quit_called());

    let doc = store.get(INDEX, &content_hash(&post_url(100))).unwrap();
    assert_eq!(doc["owner_url"], JOHN);
    assert_eq!(doc["owner_id"], "john-roe");
    assert_eq!(doc["owner"], "Author 100");
    assert_eq!(doc["comments"], 3);
    assert_eq!(doc["language"], "eng");
    assert_eq!(doc["tags"], serde_json::json!(["linkedin", "social"]));
    assert!(doc["timestamp"].is_i64());
}

#[tokio::test]
async fn second_run_reports_duplicates_without_rewriting() {
    let dir = tempfile::tempdir().unwrap();
    let browser = two_account_browser();
    let store = MockStore::new();
    let orchestrator = Orchestrator::new(
        settings(&[JANE, JOHN], write_cookie_file(dir.path())),
        MockLauncher::new(browser),
        store.clone(),
    );

    orchestrator.run_once().await.unwrap();
    let second = orchestrator.run_once().await.unwrap();

    assert_eq!(second.posts_indexed, 0);
    assert_eq!(second.posts_duplicate, 9);
    assert_eq!(second.upload_failures, 0);
    assert_eq!(store.len(), 9);
}

#[tokio::test]
async fn unreachable_account_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let browser = two_account_browser().with_unreachable(&feed_url(GONE));
    let store = MockStore::new();
    let orchestrator = Orchestrator::new(
        settings(&[GONE, JOHN], write_cookie_file(dir.path())),
        MockLauncher::new(browser),
        store.clone(),
    );

    let stats = orchestrator.run_once().await.unwrap();

    assert_eq!(stats.accounts_failed, 1);
    assert_eq!(stats.accounts_scraped, 1);
    assert_eq!(stats.posts_indexed, 2);
    assert!(store.get(INDEX, &content_hash(&post_url(101))).is_some());
}

#[tokio::test]
async fn upload_failure_only_loses_that_post() {
    let dir = tempfile::tempdir().unwrap();
    let store = MockStore::new().failing_on(&content_hash(&post_url(3)));
    let orchestrator = Orchestrator::new(
        settings(&[JANE], write_cookie_file(dir.path())),
        MockLauncher::new(two_account_browser()),
        store.clone(),
    );

    let stats = orchestrator.run_once().await.unwrap();

    assert_eq!(stats.upload_failures, 1);
    assert_eq!(stats.posts_indexed, 6);
    assert_eq!(stats.accounts_scraped, 1);
    assert!(store.get(INDEX, &content_hash(&post_url(3))).is_none());
}

#[tokio::test]
async fn broken_post_is_dropped_and_later_posts_still_indexed() {
    let dir = tempfile::tempdir().unwrap();
    let browser = MockBrowser::new()
        .with_account_feed(&feed_url(JANE), vec![posts(0..3)])
        .with_failing_post(1);
    let store = MockStore::new();
    let orchestrator = Orchestrator::new(
        settings(&[JANE], write_cookie_file(dir.path())),
        MockLauncher::new(browser),
        store.clone(),
    );

    let stats = orchestrator.run_once().await.unwrap();

    assert_eq!(stats.posts_collected, 3);
    assert_eq!(stats.posts_dropped, 1);
    assert_eq!(stats.posts_indexed, 2);
    assert_eq!(stats.accounts_scraped, 1);
    assert!(store.get(INDEX, &content_hash(&post_url(1))).is_none());
    assert!(store.get(INDEX, &content_hash(&post_url(2))).is_some());
}

#[tokio::test]
async fn leftover_share_toast_does_not_merge_posts() {
    let dir = tempfile::tempdir().unwrap();
    let browser = MockBrowser::new()
        .with_account_feed(&feed_url(JANE), vec![posts(0..2)])
        .with_silent_copy_link(1);
    let store = MockStore::new();
    let orchestrator = Orchestrator::new(
        settings(&[JANE], write_cookie_file(dir.path())),
        MockLauncher::new(browser),
        store.clone(),
    );

    let stats = orchestrator.run_once().await.unwrap();

    assert_eq!(stats.posts_indexed, 2);
    assert_eq!(stats.posts_duplicate, 0);
    let text = MockPost::complete(1).text.unwrap();
    let fallback_id = content_hash(&format!("{JANE}\n{text}"));
    assert!(store.get(INDEX, &fallback_id).is_some());
}

#[tokio::test]
async fn post_without_link_is_keyed_by_owner_and_text() {
    let dir = tempfile::tempdir().unwrap();
    let linkless = MockPost {
        url: None,
        ..MockPost::complete(7)
    };
    let text = linkless.text.clone().unwrap();
    let browser = MockBrowser::new().with_account_feed(&feed_url(JANE), vec![vec![linkless]]);
    let store = MockStore::new();
    let orchestrator = Orchestrator::new(
        settings(&[JANE], write_cookie_file(dir.path())),
        MockLauncher::new(browser),
        store.clone(),
    );

    let stats = orchestrator.run_once().await.unwrap();

    assert_eq!(stats.posts_indexed, 1);
    let id = content_hash(&format!("{JANE}\n{text}"));
    let doc = store.get(INDEX, &id).unwrap();
    assert!(doc["url"].is_null());
}

#[tokio::test]
async fn failed_login_aborts_run_and_closes_browser() {
    let dir = tempfile::tempdir().unwrap();
    // No cookie file and no login form on the page.
    let browser = two_account_browser();
    let store = MockStore::new();
    let orchestrator = Orchestrator::new(
        settings(&[JANE], dir.path().join("cookies.json")),
        MockLauncher::new(browser.clone()),
        store.clone(),
    );

    let err = orchestrator.run_once().await.unwrap_err();

    assert!(matches!(err, ScrapeError::Session(_)));
    assert!(browser.quit_called());
    assert!(store.is_empty());
    assert!(!browser.visited().contains(&feed_url(JANE)));
}

#[tokio::test]
async fn browser_that_cannot_start_is_a_session_failure() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        settings(&[JANE], write_cookie_file(dir.path())),
        MockLauncher::unavailable(),
        MockStore::new(),
    );

    let err = orchestrator.run_once().await.unwrap_err();

    assert!(matches!(err, ScrapeError::Session(ref msg) if msg.contains("cannot start browser")));
}

#[tokio::test]
async fn fresh_login_cookies_are_reused_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let cookie_file = dir.path().join("cookies.json");
    let cookie = serde_json::from_value(serde_json::json!({
        "name": "li_at",
        "value": "fresh",
        "domain": ".linkedin.com"
    }))
    .unwrap();
    let browser = two_account_browser()
        .with_login_form()
        .with_login_cookies(vec![cookie]);
    let orchestrator = Orchestrator::new(
        settings(&[JOHN], cookie_file.clone()),
        MockLauncher::new(browser.clone()),
        MockStore::new(),
    );

    orchestrator.run_once().await.unwrap();
    assert!(cookie_file.exists());
    assert_eq!(browser.filled_fields().len(), 2);
    assert!(browser.injected_cookies().is_empty());

    orchestrator.run_once().await.unwrap();
    assert_eq!(browser.filled_fields().len(), 2);
    assert_eq!(browser.injected_cookies().len(), 1);
    assert_eq!(browser.injected_cookies()[0].value, "fresh");
}

#[tokio::test]
async fn empty_account_list_still_authenticates() {
    let dir = tempfile::tempdir().unwrap();
    let browser = MockBrowser::new();
    let orchestrator = Orchestrator::new(
        settings(&[], write_cookie_file(dir.path())),
        MockLauncher::new(browser.clone()),
        MockStore::new(),
    );

    let stats = orchestrator.run_once().await.unwrap();

    assert_eq!(stats.accounts_scraped, 0);
    assert_eq!(stats.posts_collected, 0);
    assert_eq!(browser.visited(), vec!["https://www.linkedin.com/".to_string()]);
    assert!(browser.quit_called());
}
