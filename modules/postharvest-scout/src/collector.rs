use std::time::Duration;

use tracing::{debug, info, warn};

use webdriver_client::BrowserError;

use crate::extractor::selectors;
use crate::traits::{Browser, Locator};

/// The feed shows this many posts before the first scroll.
pub const FIRST_PAGE_SIZE: usize = 5;

pub const SCROLL_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight;";
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// What the collector knows between two scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollState {
    pub height: u64,
    pub collected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    /// Page height did not change after a scroll: no more content.
    Stalled,
    ScrollLimit,
}

#[derive(Debug)]
pub struct Collected<N> {
    pub nodes: Vec<N>,
    pub scrolls: usize,
    pub stop: StopReason,
}

/// Scrolls the current feed page and accumulates post nodes until a target
/// count is reached or the page stops growing.
pub struct ScrollCollector {
    target: Option<usize>,
    pause: Duration,
    max_scrolls: usize,
    post_locator: Locator<'static>,
}

impl ScrollCollector {
    pub fn new(target: Option<usize>, pause: Duration, max_scrolls: usize) -> Self {
        Self {
            target,
            pause,
            max_scrolls,
            post_locator: selectors::POST,
        }
    }

    /// Collect posts from the page the browser is currently on.
    pub async fn collect<B: Browser>(&self, browser: &B) -> Result<Collected<B::Node>, BrowserError> {
        let mut state = ScrollState {
            height: probe_height(browser).await?,
            collected: 0,
        };
        let mut nodes: Vec<B::Node> = Vec::new();
        let mut scrolls = 0usize;

        let stop = loop {
            let visible = browser.find_all(self.post_locator).await?;
            if visible.len() > state.collected {
                nodes.extend(visible[state.collected..].iter().cloned());
                state.collected = visible.len();
            }
            debug!(visible = visible.len(), collected = nodes.len(), height = state.height, "feed pass");

            if let Some(target) = self.target {
                if nodes.len() >= target {
                    break StopReason::TargetReached;
                }
            }
            if scrolls >= self.max_scrolls {
                warn!(scrolls, collected = nodes.len(), "scroll limit reached, stopping early");
                break StopReason::ScrollLimit;
            }

            browser.execute(SCROLL_TO_BOTTOM_SCRIPT, &[]).await?;
            scrolls += 1;
            tokio::time::sleep(self.pause).await;

            let height = probe_height(browser).await?;
            if height == state.height {
                break StopReason::Stalled;
            }
            state.height = height;
        };

        if let Some(target) = self.target {
            if target <= FIRST_PAGE_SIZE {
                nodes.truncate(target);
            }
        }

        if nodes.is_empty() {
            info!("account has no posts");
        }
        info!(collected = nodes.len(), scrolls, ?stop, "feed collection finished");

        Ok(Collected {
            nodes,
            scrolls,
            stop,
        })
    }
}

async fn probe_height<B: Browser>(browser: &B) -> Result<u64, BrowserError> {
    let value = browser.execute(SCROLL_HEIGHT_SCRIPT, &[]).await?;
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|h| h.max(0.0) as u64))
        .ok_or_else(|| BrowserError::Script(format!("scroll height is not a number: {value}")))
}
