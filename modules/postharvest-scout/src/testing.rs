// Test mocks for the scrape pipeline.
//
// Three mocks matching the three trait boundaries:
// - MockBrowser (Browser): scripted feed pages, login form and cookie jar
// - MockLauncher (BrowserLauncher): hands out clones of one MockBrowser
// - MockStore (DocumentStore): in-memory create-only index
//
// MockBrowser clones share state, so a test keeps one handle for assertions
// while the pipeline drives another.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use postharvest_common::SessionCookie;
use searchstore_client::{CreateOutcome, SearchStoreError};
use webdriver_client::BrowserError;

use crate::collector::{SCROLL_HEIGHT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT};
use crate::extractor::{selectors, COPY_LINK_SCRIPT};
use crate::session::{LOGIN_SUBMIT, PASSWORD_FIELD, USERNAME_FIELD};
use crate::traits::{Browser, BrowserLauncher, DocumentStore, Locator};

// ---------------------------------------------------------------------------
// MockPost
// ---------------------------------------------------------------------------

/// Raw strings a feed entry shows. `None` means the element is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockPost {
    pub author: Option<String>,
    pub time_label: Option<String>,
    pub text: Option<String>,
    pub likes: Option<String>,
    pub comments: Option<String>,
    pub url: Option<String>,
}

impl MockPost {
    /// A post with every field present and a unique URL.
    pub fn complete(i: usize) -> Self {
        Self {
            author: Some(format!("Author {i}")),
            time_label: Some("2d".to_string()),
            text: Some(format!(
                "Post number {i}: we just shipped a new version of our scheduling product \
                 and would love to hear what you think about the redesigned calendar view."
            )),
            likes: Some(format!("{}", 10 + i)),
            comments: Some("3 comments".to_string()),
            url: Some(post_url(i)),
        }
    }
}

pub fn post_url(i: usize) -> String {
    format!("https://www.linkedin.com/feed/update/urn:li:activity:{i}")
}

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Author,
    TimeLabel,
    Text,
    LikesCount,
    Comments,
}

/// Element handle handed out by [`MockBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockNode {
    Post(usize),
    Field(usize, Field),
    LikesButton(usize),
    ShareToast,
    LoginInput(&'static str),
    LoginSubmit,
}

#[derive(Default)]
struct BrowserState {
    /// Feed stages of the loaded page. Each scroll advances one stage.
    pages: Vec<Vec<MockPost>>,
    stage: usize,
    feeds: HashMap<String, Vec<Vec<MockPost>>>,
    unreachable: HashSet<String>,
    login_form: bool,
    login_cookies: Vec<SessionCookie>,
    jar: Vec<SessionCookie>,
    injected: Vec<SessionCookie>,
    filled: Vec<(String, String)>,
    toast: Option<String>,
    silent_copy_link: HashSet<usize>,
    failing_posts: HashSet<usize>,
    visited: Vec<String>,
    scrolls: usize,
    copy_link_clicks: usize,
    broken: bool,
    quit: bool,
}

impl BrowserState {
    fn post(&self, i: usize) -> Option<&MockPost> {
        self.pages.get(self.stage).and_then(|page| page.get(i))
    }

    fn height(&self) -> u64 {
        1000 * (self.stage as u64 + 1)
    }
}

/// Scripted browser. Builder pattern: `.with_feed_page()`,
/// `.with_account_feed()`, `.with_login_form()`, `.with_login_cookies()`,
/// `.with_unreachable()`, `.with_silent_copy_link()`, `.with_failing_post()`.
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage to the currently loaded feed. Stage `n` is what the
    /// page shows after `n` scrolls; stages should grow.
    pub fn with_feed_page(self, posts: Vec<MockPost>) -> Self {
        self.lock().pages.push(posts);
        self
    }

    /// Feed stages shown after navigating to `url`.
    pub fn with_account_feed(self, url: &str, pages: Vec<Vec<MockPost>>) -> Self {
        self.lock().feeds.insert(url.to_string(), pages);
        self
    }

    /// Navigating to `url` fails with a driver error.
    pub fn with_unreachable(self, url: &str) -> Self {
        self.lock().unreachable.insert(url.to_string());
        self
    }

    /// Copy-link on post `i` succeeds but leaves the share toast as it was.
    pub fn with_silent_copy_link(self, i: usize) -> Self {
        self.lock().silent_copy_link.insert(i);
        self
    }

    /// Every lookup inside post `i` fails with a driver error.
    pub fn with_failing_post(self, i: usize) -> Self {
        self.lock().failing_posts.insert(i);
        self
    }

    pub fn with_login_form(self) -> Self {
        self.lock().login_form = true;
        self
    }

    /// Cookies the site sets once the login form is submitted.
    pub fn with_login_cookies(self, cookies: Vec<SessionCookie>) -> Self {
        self.lock().login_cookies = cookies;
        self
    }

    /// Every later call fails as if the driver session died.
    pub fn break_session(&self) {
        self.lock().broken = true;
    }

    pub fn post_node(&self, i: usize) -> MockNode {
        MockNode::Post(i)
    }

    pub fn scroll_count(&self) -> usize {
        self.lock().scrolls
    }

    pub fn copy_link_clicks(&self) -> usize {
        self.lock().copy_link_clicks
    }

    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    pub fn injected_cookies(&self) -> Vec<SessionCookie> {
        self.lock().injected.clone()
    }

    pub fn filled_fields(&self) -> Vec<(String, String)> {
        self.lock().filled.clone()
    }

    pub fn quit_called(&self) -> bool {
        self.lock().quit
    }

    fn lock(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn guard(&self) -> Result<MutexGuard<'_, BrowserState>, BrowserError> {
        let state = self.lock();
        if state.broken {
            return Err(BrowserError::Driver("invalid session id".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl Browser for MockBrowser {
    type Node = MockNode;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.guard()?;
        if state.unreachable.contains(url) {
            return Err(BrowserError::Driver(format!(
                "unknown error: net::ERR_NAME_NOT_RESOLVED ({url})"
            )));
        }
        state.visited.push(url.to_string());
        state.pages = state.feeds.get(url).cloned().unwrap_or_default();
        state.stage = 0;
        state.toast = None;
        Ok(())
    }

    async fn find_all(&self, locator: Locator<'_>) -> Result<Vec<MockNode>, BrowserError> {
        let state = self.guard()?;
        if locator != selectors::POST {
            return Ok(Vec::new());
        }
        let count = state.pages.get(state.stage).map_or(0, Vec::len);
        Ok((0..count).map(MockNode::Post).collect())
    }

    async fn find(&self, locator: Locator<'_>) -> Result<Option<MockNode>, BrowserError> {
        let state = self.guard()?;
        let node = if locator == selectors::SHARE_TOAST_LINK {
            state.toast.as_ref().map(|_| MockNode::ShareToast)
        } else if !state.login_form {
            None
        } else if locator == USERNAME_FIELD {
            Some(MockNode::LoginInput("username"))
        } else if locator == PASSWORD_FIELD {
            Some(MockNode::LoginInput("password"))
        } else if locator == LOGIN_SUBMIT {
            Some(MockNode::LoginSubmit)
        } else {
            None
        };
        Ok(node)
    }

    async fn find_in(
        &self,
        node: &MockNode,
        locator: Locator<'_>,
    ) -> Result<Option<MockNode>, BrowserError> {
        let state = self.guard()?;
        let found = match node {
            MockNode::Post(i) if state.failing_posts.contains(i) => {
                return Err(BrowserError::Driver("stale element reference".to_string()));
            }
            MockNode::Post(i) => {
                let Some(post) = state.post(*i) else {
                    return Err(BrowserError::Driver("stale element reference".to_string()));
                };
                let lookups = [
                    (selectors::AUTHOR, &post.author, MockNode::Field(*i, Field::Author)),
                    (selectors::TIME_LABEL, &post.time_label, MockNode::Field(*i, Field::TimeLabel)),
                    (selectors::TEXT, &post.text, MockNode::Field(*i, Field::Text)),
                    (selectors::LIKES_BUTTON, &post.likes, MockNode::LikesButton(*i)),
                    (selectors::COMMENTS, &post.comments, MockNode::Field(*i, Field::Comments)),
                ];
                lookups
                    .into_iter()
                    .find(|(l, value, _)| *l == locator && value.is_some())
                    .map(|(_, _, found)| found)
            }
            MockNode::LikesButton(i) if locator == selectors::LIKES_COUNT => {
                Some(MockNode::Field(*i, Field::LikesCount))
            }
            _ => None,
        };
        Ok(found)
    }

    async fn text(&self, node: &MockNode) -> Result<String, BrowserError> {
        let state = self.guard()?;
        let MockNode::Field(i, field) = node else {
            return Ok(String::new());
        };
        let value = state.post(*i).and_then(|post| match field {
            Field::Author => post.author.clone(),
            Field::TimeLabel => post.time_label.clone(),
            Field::Text => post.text.clone(),
            Field::LikesCount => post.likes.clone(),
            Field::Comments => post.comments.clone(),
        });
        Ok(value.unwrap_or_default())
    }

    async fn attribute(&self, node: &MockNode, name: &str) -> Result<Option<String>, BrowserError> {
        let state = self.guard()?;
        match node {
            MockNode::ShareToast if name == "href" => Ok(state.toast.clone()),
            _ => Ok(None),
        }
    }

    async fn execute(&self, script: &str, args: &[&MockNode]) -> Result<Value, BrowserError> {
        let mut state = self.guard()?;
        if script == SCROLL_HEIGHT_SCRIPT {
            return Ok(json!(state.height()));
        }
        if script == SCROLL_TO_BOTTOM_SCRIPT {
            state.scrolls += 1;
            if state.stage + 1 < state.pages.len() {
                state.stage += 1;
            }
            return Ok(Value::Null);
        }
        if script == COPY_LINK_SCRIPT {
            let Some(MockNode::Post(i)) = args.first() else {
                return Ok(Value::Null);
            };
            let url = state.post(*i).and_then(|p| p.url.clone());
            // A failed click leaves whatever toast is on screen.
            let Some(url) = url else {
                return Err(BrowserError::Script(
                    "TypeError: Cannot read properties of undefined (reading 'click')".to_string(),
                ));
            };
            state.copy_link_clicks += 1;
            if !state.silent_copy_link.contains(i) {
                state.toast = Some(url);
            }
            return Ok(Value::Null);
        }
        Ok(Value::Null)
    }

    async fn click(&self, node: &MockNode) -> Result<(), BrowserError> {
        let mut state = self.guard()?;
        if *node == MockNode::LoginSubmit {
            state.jar = state.login_cookies.clone();
        }
        Ok(())
    }

    async fn fill(&self, node: &MockNode, text: &str) -> Result<(), BrowserError> {
        let mut state = self.guard()?;
        if let MockNode::LoginInput(name) = node {
            state.filled.push((name.to_string(), text.to_string()));
        }
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError> {
        Ok(self.guard()?.jar.clone())
    }

    async fn add_cookie(&self, cookie: SessionCookie) -> Result<(), BrowserError> {
        let mut state = self.guard()?;
        state.injected.push(cookie.clone());
        state.jar.push(cookie);
        Ok(())
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        // Quitting a dead session still counts as closing it.
        self.lock().quit = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockLauncher
// ---------------------------------------------------------------------------

pub struct MockLauncher {
    browser: MockBrowser,
    fail: bool,
}

impl MockLauncher {
    pub fn new(browser: MockBrowser) -> Self {
        Self {
            browser,
            fail: false,
        }
    }

    /// Launching fails as if chromedriver were not running.
    pub fn unavailable() -> Self {
        Self {
            browser: MockBrowser::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    type Browser = MockBrowser;

    async fn launch(&self) -> Result<MockBrowser, BrowserError> {
        if self.fail {
            return Err(BrowserError::Session(
                "could not connect to http://localhost:9515".to_string(),
            ));
        }
        Ok(self.browser.clone())
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory index keyed by `(index, id)`. Clones share storage.
#[derive(Clone, Default)]
pub struct MockStore {
    docs: Arc<Mutex<HashMap<(String, String), Value>>>,
    failing_ids: Arc<Mutex<HashSet<String>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document so a later create reports a conflict.
    pub fn with_existing(self, index: &str, id: &str) -> Self {
        self.lock_docs()
            .insert((index.to_string(), id.to_string()), json!({}));
        self
    }

    /// Creating `id` fails with a server error.
    pub fn failing_on(self, id: &str) -> Self {
        self.failing_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.lock_docs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: &str, id: &str) -> Option<Value> {
        self.lock_docs()
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }

    /// Documents of `index`, in no particular order.
    pub fn documents(&self, index: &str) -> Vec<Value> {
        self.lock_docs()
            .iter()
            .filter(|((i, _), _)| i == index)
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    fn lock_docs(&self) -> MutexGuard<'_, HashMap<(String, String), Value>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn create(
        &self,
        index: &str,
        id: &str,
        doc: &Value,
    ) -> Result<CreateOutcome, SearchStoreError> {
        if self
            .failing_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
        {
            return Err(SearchStoreError::Api {
                status: 503,
                message: "cluster unavailable".to_string(),
            });
        }
        let mut docs = self.lock_docs();
        let key = (index.to_string(), id.to_string());
        if docs.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        docs.insert(key, doc.clone());
        Ok(CreateOutcome::Created)
    }
}
