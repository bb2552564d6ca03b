use crate::caps::capabilities;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use hale_core::config::BrowserVariant;
use hale_engine::driver::is_xpath;
use hale_engine::{ContextOptions, Driver, DriverError, LaunchOptions};
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const NETWORK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Any browser variant over a remote WebDriver endpoint. The endpoint
/// (chromedriver, geckodriver, a Selenium grid) must already be
/// listening; this driver only opens sessions against it.
pub struct WdDriver {
    endpoint: String,
    engine_started: bool,
    client: Option<Client>,
    page_open: bool,
}

impl WdDriver {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            engine_started: false,
            client: None,
            page_open: false,
        }
    }

    fn client(&self) -> Result<&Client, DriverError> {
        self.client.as_ref().ok_or(DriverError::NoBrowser)
    }

    fn page(&self) -> Result<&Client, DriverError> {
        if !self.page_open {
            return Err(DriverError::NoPage);
        }
        self.client()
    }

    async fn ready_state(client: &Client) -> Result<String, DriverError> {
        let value = client
            .execute("return document.readyState", vec![])
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn resource_count(client: &Client) -> Result<u64, DriverError> {
        let value = client
            .execute(
                "return performance.getEntriesByType('resource').length",
                vec![],
            )
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        Ok(value.as_u64().unwrap_or_default())
    }
}

fn locator(selector: &str) -> Locator<'_> {
    if is_xpath(selector) {
        Locator::XPath(selector)
    } else {
        Locator::Css(selector)
    }
}

#[async_trait]
impl Driver for WdDriver {
    async fn start_engine(&mut self) -> Result<(), DriverError> {
        // The WebDriver server is external; there is nothing to spawn.
        self.engine_started = true;
        Ok(())
    }

    async fn launch_browser(
        &mut self,
        variant: BrowserVariant,
        opts: &LaunchOptions,
    ) -> Result<(), DriverError> {
        if !self.engine_started {
            return Err(DriverError::NotStarted);
        }
        tracing::info!(endpoint = self.endpoint, %variant, "opening webdriver session");
        let client = ClientBuilder::native()
            .capabilities(capabilities(variant, opts))
            .connect(&self.endpoint)
            .await
            .map_err(|e| {
                DriverError::Launch(format!(
                    "failed to connect to webdriver at {}: {e}",
                    self.endpoint
                ))
            })?;
        self.client = Some(client);
        Ok(())
    }

    async fn open_context(&mut self, _opts: &ContextOptions) -> Result<(), DriverError> {
        // One session is one context in WebDriver; recording settings
        // have no channel to apply to.
        self.client()?;
        Ok(())
    }

    async fn open_page(&mut self) -> Result<(), DriverError> {
        self.client()?;
        self.page_open = true;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let client = self.page()?;
        tracing::info!(url, "navigating");
        client
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let client = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = client.find(locator(selector)).await {
                match element.is_displayed().await {
                    Ok(true) => return Ok(()),
                    Ok(false) => {}
                    Err(e) => tracing::debug!(selector, error = %e, "displayed check failed"),
                }
            }
            if Instant::now() >= deadline {
                return Err(DriverError::WaitTimeout(selector.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        let client = self.page()?;
        let element = client
            .find(locator(selector))
            .await
            .map_err(|e| DriverError::Action {
                selector: selector.to_string(),
                message: e.to_string(),
            })?;
        element.click().await.map_err(|e| DriverError::Action {
            selector: selector.to_string(),
            message: e.to_string(),
        })
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), DriverError> {
        let client = self.page()?;
        let element = client
            .find(locator(selector))
            .await
            .map_err(|e| DriverError::Action {
                selector: selector.to_string(),
                message: e.to_string(),
            })?;
        element.clear().await.map_err(|e| DriverError::Action {
            selector: selector.to_string(),
            message: e.to_string(),
        })?;
        element
            .send_keys(value)
            .await
            .map_err(|e| DriverError::Action {
                selector: selector.to_string(),
                message: e.to_string(),
            })
    }

    async fn text_content(&mut self, selector: &str) -> Result<String, DriverError> {
        let client = self.page()?;
        let element = client
            .find(locator(selector))
            .await
            .map_err(|e| DriverError::Action {
                selector: selector.to_string(),
                message: e.to_string(),
            })?;
        element.text().await.map_err(|e| DriverError::Action {
            selector: selector.to_string(),
            message: e.to_string(),
        })
    }

    async fn wait_for_load(&mut self, timeout: Duration) -> Result<(), DriverError> {
        let client = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            let state = Self::ready_state(client).await?;
            if state == "interactive" || state == "complete" {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::WaitTimeout("page load".to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), DriverError> {
        let client = self.page()?;
        let deadline = Instant::now() + timeout;
        let mut previous = Self::resource_count(client).await?;
        loop {
            tokio::time::sleep(NETWORK_POLL_INTERVAL).await;
            let current = Self::resource_count(client).await?;
            let state = Self::ready_state(client).await?;
            if current == previous && state == "complete" {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::WaitTimeout("network idle".to_string()));
            }
            previous = current;
        }
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let client = self.page()?;
        let url = client
            .current_url()
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        let client = self.page()?;
        client
            .title()
            .await
            .map_err(|e| DriverError::Other(e.to_string()))
    }

    async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        if full_page {
            // W3C screenshots are viewport-only; callers fall back.
            return Err(DriverError::NotSupported("full-page screenshot"));
        }
        let client = self.page()?;
        client
            .screenshot()
            .await
            .map_err(|e| DriverError::Other(format!("screenshot failed: {e}")))
    }

    async fn close_page(&mut self) -> Result<(), DriverError> {
        self.page_open = false;
        Ok(())
    }

    async fn close_context(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close_browser(&mut self) -> Result<(), DriverError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DriverError::Other(format!("failed to close session: {e}")))?;
        }
        Ok(())
    }

    async fn shutdown_engine(&mut self) -> Result<(), DriverError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DriverError::Other(format!("failed to close session: {e}")))?;
        }
        self.engine_started = false;
        Ok(())
    }
}
