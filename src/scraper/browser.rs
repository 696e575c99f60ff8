use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, SetBlockedUrLsParams,
};
use chromiumoxide::cdp::browser_protocol::page::SetBypassCspParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::AppError;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// List pages get a short navigation budget; a timeout is logged and the
/// partially loaded page is still handed to extraction.
pub const LIST_NAV_TIMEOUT: Duration = Duration::from_secs(20);
/// Detail pages are slower (Workday renders client-side) and failures are
/// retried, so the budget is generous.
pub const DETAIL_NAV_TIMEOUT: Duration = Duration::from_secs(60);

const PAGINATION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
const SCROLL_SETTLE_DELAY: Duration = Duration::from_secs(1);

const MAX_SCROLL_ITERATIONS: usize = 20;
const SCROLL_STAGNATION_LIMIT: usize = 5;

/// URL patterns aborted before the request leaves the browser. Images,
/// stylesheets, and webfonts carry nothing the extractors read.
fn blocked_url_patterns() -> Vec<String> {
    [
        "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.webp", "*.ico", "*.css", "*.woff",
        "*.woff2", "*.ttf", "*.otf",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// One headless Chromium process and the task driving its CDP connection.
/// Owned by a single board crawl; dropping it tears the child process down.
pub struct BrowserDriver {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// A page living in its own browsing context, used by exactly one detail
/// task. Both halves are torn down together via `close_isolated_page`.
pub struct IsolatedPage {
    pub page: Page,
    context_id: BrowserContextId,
}

impl BrowserDriver {
    pub async fn launch() -> Result<Self, AppError> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(AppError::Config)?;
        let (browser, mut handler) = Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open the primary session for a board and navigate to its listing
    /// page. A navigation timeout is not fatal: whatever rendered is still
    /// worth extracting.
    pub async fn open_session(&self, target_url: &str) -> Result<Page, AppError> {
        let page = self.browser.new_page("about:blank").await?;
        self.prepare_page(&page).await?;
        if let Err(error) = navigate(&page, target_url, LIST_NAV_TIMEOUT).await {
            if error.is_timeout() {
                tracing::warn!("Timeout navigating to {target_url}; proceeding with partial page");
            } else {
                return Err(error);
            }
        }
        Ok(page)
    }

    /// New browsing context plus page, with the same filters as the primary
    /// session. A hung or crashed detail page cannot leak into siblings.
    pub async fn open_isolated_page(&self) -> Result<IsolatedPage, AppError> {
        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?;
        let context_id = created.result.browser_context_id.clone();

        match self.page_in_context(&context_id).await {
            Ok(page) => Ok(IsolatedPage { page, context_id }),
            Err(error) => {
                let _ = self
                    .browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await;
                Err(error)
            }
        }
    }

    async fn page_in_context(&self, context_id: &BrowserContextId) -> Result<Page, AppError> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(AppError::Config)?;
        let page = self.browser.new_page(params).await?;
        self.prepare_page(&page).await?;
        Ok(page)
    }

    /// Close page then context, in reverse order of acquisition. Close
    /// failures are logged, not propagated: the context may already be gone
    /// when the task is being torn down after a crash.
    pub async fn close_isolated_page(&self, isolated: IsolatedPage) {
        if let Err(error) = isolated.page.close().await {
            tracing::debug!("Error closing detail page: {error}");
        }
        if let Err(error) = self
            .browser
            .execute(DisposeBrowserContextParams::new(isolated.context_id))
            .await
        {
            tracing::debug!("Error disposing browser context: {error}");
        }
    }

    async fn prepare_page(&self, page: &Page) -> Result<(), AppError> {
        page.set_user_agent(DESKTOP_USER_AGENT).await?;
        page.execute(SetBypassCspParams::new(true)).await?;
        page.execute(NetworkEnableParams::default()).await?;
        page.execute(SetBlockedUrLsParams::new(blocked_url_patterns()))
            .await?;
        Ok(())
    }

    pub async fn shutdown(mut self) {
        if let Err(error) = self.browser.close().await {
            tracing::warn!("Browser did not close cleanly: {error}");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

impl Drop for BrowserDriver {
    fn drop(&mut self) {
        // Cancellation path: the CDP handler must not outlive the driver.
        self.handler_task.abort();
    }
}

/// Navigate and wait for the load to finish, bounded by `timeout`.
pub async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), AppError> {
    let result = tokio::time::timeout(timeout, async {
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        Ok::<_, AppError>(())
    })
    .await;
    match result {
        Ok(inner) => inner,
        Err(_) => Err(AppError::NavigationTimeout {
            url: url.to_string(),
        }),
    }
}

/// Poll for a selector until it appears or the budget runs out.
pub async fn wait_for_selector(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<(), AppError> {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AppError::SelectorTimeout {
                selector: selector.to_string(),
                waited_ms: timeout.as_millis() as u64,
            });
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

/// Presence probe for pagination controls; absence is an answer, not an
/// error.
pub async fn has_pagination(page: &Page, pagination_selector: &str) -> bool {
    wait_for_selector(page, pagination_selector, PAGINATION_PROBE_TIMEOUT)
        .await
        .is_ok()
}

/// Click the next-page control if present and enabled. Returns whether a
/// page turn happened.
pub async fn click_next(page: &Page, next_selector: &str) -> Result<bool, AppError> {
    let Ok(button) = page.find_element(next_selector).await else {
        return Ok(false);
    };
    let disabled = button.attribute("disabled").await?.is_some()
        || button
            .attribute("aria-disabled")
            .await?
            .is_some_and(|v| v == "true");
    if disabled {
        return Ok(false);
    }
    button.click().await?;
    tokio::time::sleep(SCROLL_SETTLE_DELAY).await;
    Ok(true)
}

/// Drive an infinite-scroll list to the bottom: scroll, let content land,
/// count items, and stop after `SCROLL_STAGNATION_LIMIT` iterations without
/// growth (hard cap `MAX_SCROLL_ITERATIONS`). Returns the final item count.
pub async fn scroll_to_exhaust(page: &Page, item_selector: &str) -> Result<usize, AppError> {
    let mut item_count = 0usize;
    let mut stagnant = 0usize;

    for _ in 0..MAX_SCROLL_ITERATIONS {
        let current = page
            .find_elements(item_selector)
            .await
            .map(|items| items.len())
            .unwrap_or(0);
        if current > item_count {
            item_count = current;
            stagnant = 0;
        } else {
            stagnant += 1;
            if stagnant >= SCROLL_STAGNATION_LIMIT {
                tracing::debug!("No new items after {stagnant} scroll attempts; assuming end of list");
                break;
            }
        }
        page.evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await?;
        tokio::time::sleep(SCROLL_SETTLE_DELAY).await;
    }

    Ok(item_count)
}
