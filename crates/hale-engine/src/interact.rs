//! The self-healing element interaction engine.
//!
//! Every operation takes a [`LocatorSet`], a primary selector plus
//! ordered fallbacks for the same logical element, and tries each
//! selector in order, sequentially, until one works. Failed attempts
//! are recorded in the shared failure ledger, attributed to the
//! current scenario from the worker's [`ScenarioContext`].
//!
//! Timeout budgeting: click/fill/read-text divide the global wait
//! across the fallbacks, so the worst case for a full pass stays one
//! global timeout no matter how many fallbacks exist. `is_visible`
//! intentionally keeps the full budget per attempt (probe semantics;
//! worst case N×T).

use crate::context::ScenarioContext;
use crate::driver::{Driver, DriverError};
use hale_core::config::HarnessConfig;
use hale_core::locator::LocatorSet;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Action labels as they appear in the failure ledger and report.
pub mod actions {
    pub const CLICK: &str = "click";
    pub const FILL_TEXT: &str = "fill_text";
    pub const READ_TEXT: &str = "read_text";
    pub const CHECK_VISIBLE: &str = "check_visible";
}

const URL_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Small buffer after network idle so the render/paint cycle finishes
/// before steps touch freshly rendered elements.
const REPAINT_BUFFER: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum InteractError {
    #[error("all locators failed for {action}")]
    LocatorsExhausted { action: &'static str },
    #[error("timed out waiting for URL to contain '{expected}'; current URL is {actual}")]
    UrlTimeout { expected: String, actual: String },
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Interaction capability bound to one worker's live page and scenario
/// context. Page objects hold locator sets and call through this.
pub struct Interactor<'a> {
    driver: &'a mut dyn Driver,
    ctx: &'a ScenarioContext,
    config: &'a HarnessConfig,
}

impl<'a> Interactor<'a> {
    pub fn new(
        driver: &'a mut dyn Driver,
        ctx: &'a ScenarioContext,
        config: &'a HarnessConfig,
    ) -> Self {
        Self {
            driver,
            ctx,
            config,
        }
    }

    /// Click the first selector that resolves. A successful click is
    /// followed by a page-load wait, since clicks routinely trigger
    /// navigation.
    pub async fn click(&mut self, locators: &LocatorSet) -> Result<(), InteractError> {
        let per_attempt = locators.per_attempt(self.config.timeouts.global_wait());
        for selector in locators.iter() {
            match self.try_click(selector, per_attempt).await {
                Ok(()) => {
                    tracing::debug!(selector, "clicked element");
                    self.ctx.trace(actions::CLICK, Some(selector), "ok", None);
                    return Ok(());
                }
                Err(e) => self.note_failure(actions::CLICK, selector, &e),
            }
        }
        Err(InteractError::LocatorsExhausted {
            action: actions::CLICK,
        })
    }

    /// Type into the first selector that resolves. The field is
    /// cleared before the value is set.
    pub async fn fill(&mut self, locators: &LocatorSet, value: &str) -> Result<(), InteractError> {
        let per_attempt = locators.per_attempt(self.config.timeouts.global_wait());
        for selector in locators.iter() {
            match self.try_fill(selector, value, per_attempt).await {
                Ok(()) => {
                    tracing::debug!(selector, "entered text");
                    self.ctx.trace(actions::FILL_TEXT, Some(selector), "ok", None);
                    return Ok(());
                }
                Err(e) => self.note_failure(actions::FILL_TEXT, selector, &e),
            }
        }
        Err(InteractError::LocatorsExhausted {
            action: actions::FILL_TEXT,
        })
    }

    /// Trimmed text content of the first selector that resolves.
    pub async fn read_text(&mut self, locators: &LocatorSet) -> Result<String, InteractError> {
        // Page must be settled before reading, or we race the render.
        let _ = self
            .driver
            .wait_for_load(self.config.timeouts.page_load())
            .await;
        let per_attempt = locators.per_attempt(self.config.timeouts.global_wait());
        for selector in locators.iter() {
            match self.try_read(selector, per_attempt).await {
                Ok(text) => {
                    tracing::debug!(selector, text, "text retrieved");
                    self.ctx.trace(actions::READ_TEXT, Some(selector), "ok", None);
                    return Ok(text);
                }
                Err(e) => self.note_failure(actions::READ_TEXT, selector, &e),
            }
        }
        Err(InteractError::LocatorsExhausted {
            action: actions::READ_TEXT,
        })
    }

    /// Whether any selector in the set resolves to a visible element.
    ///
    /// Total exhaustion is a valid outcome here, not an error:
    /// callers use the `false` branch for conditional test logic.
    /// Each attempt keeps the full global timeout.
    pub async fn is_visible(&mut self, locators: &LocatorSet) -> bool {
        let budget = self.config.timeouts.global_wait();
        for selector in locators.iter() {
            let _ = self
                .driver
                .wait_for_load(self.config.timeouts.page_load())
                .await;
            match self.driver.wait_for_selector(selector, budget).await {
                Ok(()) => {
                    self.ctx
                        .trace(actions::CHECK_VISIBLE, Some(selector), "ok", None);
                    return true;
                }
                Err(e) => {
                    tracing::debug!(selector, "selector is not visible");
                    self.ctx.trace(
                        actions::CHECK_VISIBLE,
                        Some(selector),
                        "failed",
                        Some(e.to_string()),
                    );
                    self.ctx.record_failure(actions::CHECK_VISIBLE, selector);
                }
            }
        }
        false
    }

    /// Poll the current URL until it contains `part`
    /// (case-insensitive), bounded by the global timeout. Confirms a
    /// navigation landed before the next steps run.
    pub async fn wait_for_url_contains(&mut self, part: &str) -> Result<(), InteractError> {
        let deadline = Instant::now() + self.config.timeouts.global_wait();
        let want = part.to_lowercase();
        loop {
            let url = self.driver.current_url().await?;
            if url.to_lowercase().contains(&want) {
                tracing::debug!(part, url, "found expected fragment in current URL");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(InteractError::UrlTimeout {
                    expected: part.to_string(),
                    actual: url,
                });
            }
            tokio::time::sleep(URL_POLL_INTERVAL).await;
        }
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), InteractError> {
        self.driver.navigate(url).await?;
        self.driver
            .wait_for_load(self.config.timeouts.page_load())
            .await?;
        self.ctx.trace("navigate", Some(url), "ok", None);
        Ok(())
    }

    /// Wait for DOM load plus page-load semantics.
    pub async fn wait_for_load(&mut self) -> Result<(), InteractError> {
        self.driver
            .wait_for_load(self.config.timeouts.page_load())
            .await?;
        Ok(())
    }

    /// Three-stage wait for SPA-style pages: body visible, network
    /// idle (best effort; pages with polling never fully settle),
    /// then a short repaint buffer.
    pub async fn wait_for_page_stable(&mut self) {
        if let Err(e) = self
            .driver
            .wait_for_selector("body", self.config.timeouts.global_wait())
            .await
        {
            tracing::debug!(error = %e, "body not visible within global wait");
        }
        if let Err(e) = self
            .driver
            .wait_for_network_idle(self.config.timeouts.page_load())
            .await
        {
            tracing::debug!(error = %e, "network idle not reached, continuing");
        }
        tokio::time::sleep(REPAINT_BUFFER).await;
    }

    pub async fn page_title(&mut self) -> Result<String, InteractError> {
        let title = self.driver.title().await?;
        tracing::debug!(title, "current page title");
        Ok(title)
    }

    pub async fn current_url(&mut self) -> Result<String, InteractError> {
        Ok(self.driver.current_url().await?)
    }

    async fn try_click(&mut self, selector: &str, budget: Duration) -> Result<(), DriverError> {
        self.driver.wait_for_selector(selector, budget).await?;
        self.driver.click(selector).await?;
        self.driver
            .wait_for_load(self.config.timeouts.page_load())
            .await?;
        Ok(())
    }

    async fn try_fill(
        &mut self,
        selector: &str,
        value: &str,
        budget: Duration,
    ) -> Result<(), DriverError> {
        self.driver.wait_for_selector(selector, budget).await?;
        self.driver.fill(selector, value).await?;
        Ok(())
    }

    async fn try_read(&mut self, selector: &str, budget: Duration) -> Result<String, DriverError> {
        self.driver.wait_for_selector(selector, budget).await?;
        let text = self.driver.text_content(selector).await?;
        Ok(text.trim().to_string())
    }

    fn note_failure(&self, action: &'static str, selector: &str, error: &DriverError) {
        tracing::debug!(selector, error = %error, "locator attempt failed");
        self.ctx
            .trace(action, Some(selector), "failed", Some(error.to_string()));
        self.ctx.record_failure(action, selector);
    }
}
