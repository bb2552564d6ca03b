use crate::client::CdpClient;
use crate::js;
use crate::recorder::ScreencastRecorder;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::CloseParams;
use hale_core::config::BrowserVariant;
use hale_engine::{ContextOptions, Driver, DriverError, LaunchOptions};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);
const NETWORK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Chromium over CDP. Only the `chromium` variant is supported;
/// Firefox and WebKit go through the WebDriver driver instead.
pub struct CdpDriver {
    engine_started: bool,
    client: Option<CdpClient>,
    page: Option<Page>,
    recorder: Option<ScreencastRecorder>,
    context_opts: Option<ContextOptions>,
}

impl CdpDriver {
    pub fn new() -> Self {
        Self {
            engine_started: false,
            client: None,
            page: None,
            recorder: None,
            context_opts: None,
        }
    }

    fn page(&self) -> Result<&Page, DriverError> {
        self.page.as_ref().ok_or(DriverError::NoPage)
    }
}

impl Default for CdpDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for CdpDriver {
    async fn start_engine(&mut self) -> Result<(), DriverError> {
        // The CDP handler loop starts with the browser; nothing to do
        // here beyond marking the driver usable.
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
        if variant != BrowserVariant::Chromium {
            return Err(DriverError::UnsupportedVariant(variant));
        }
        self.client = Some(CdpClient::launch(opts).await?);
        Ok(())
    }

    async fn open_context(&mut self, opts: &ContextOptions) -> Result<(), DriverError> {
        if self.client.is_none() {
            return Err(DriverError::NoBrowser);
        }
        // Isolation comes from the per-launch profile directory; the
        // context carries the recording and timeout settings for the
        // page that follows.
        self.context_opts = Some(opts.clone());
        Ok(())
    }

    async fn open_page(&mut self) -> Result<(), DriverError> {
        let client = self.client.as_ref().ok_or(DriverError::NoBrowser)?;
        let page = client.new_page().await?;

        if let Some(opts) = &self.context_opts {
            if let Some(dir) = &opts.record_video_dir {
                match ScreencastRecorder::start(&page, dir, opts.video_width, opts.video_height)
                    .await
                {
                    Ok(recorder) => self.recorder = Some(recorder),
                    Err(e) => tracing::warn!(error = %e, "recording unavailable for this session"),
                }
            }
        }
        self.page = Some(page);
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let page = self.page()?;
        tracing::info!(url, "navigating");
        page.goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if js::is_visible(page, selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::WaitTimeout(selector.to_string()));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        js::click(self.page()?, selector).await
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), DriverError> {
        js::fill(self.page()?, selector, value).await
    }

    async fn text_content(&mut self, selector: &str) -> Result<String, DriverError> {
        js::text_content(self.page()?, selector).await
    }

    async fn wait_for_load(&mut self, timeout: Duration) -> Result<(), DriverError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            let state = js::ready_state(page).await?;
            if state == "interactive" || state == "complete" {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::WaitTimeout("page load".to_string()));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), DriverError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        let mut previous = js::resource_count(page).await?;
        loop {
            tokio::time::sleep(NETWORK_POLL_INTERVAL).await;
            let current = js::resource_count(page).await?;
            let state = js::ready_state(page).await?;
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
        let page = self.page()?;
        let url = page
            .url()
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        let page = self.page()?;
        let title = page
            .get_title()
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        Ok(title.unwrap_or_default())
    }

    async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        let page = self.page()?;
        page.screenshot(
            chromiumoxide::page::ScreenshotParams::builder()
                .full_page(full_page)
                .build(),
        )
        .await
        .map_err(|e| DriverError::Other(format!("screenshot failed: {e}")))
    }

    async fn video_path(&mut self) -> Result<Option<PathBuf>, DriverError> {
        Ok(self.recorder.as_ref().map(|r| r.path().to_path_buf()))
    }

    async fn close_page(&mut self) -> Result<(), DriverError> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        page.execute(CloseParams::default())
            .await
            .map_err(|e| DriverError::Other(format!("error closing page: {e}")))?;
        Ok(())
    }

    async fn close_context(&mut self) -> Result<(), DriverError> {
        if let Some(recorder) = self.recorder.take() {
            recorder.stop().await?;
        }
        self.context_opts = None;
        Ok(())
    }

    async fn close_browser(&mut self) -> Result<(), DriverError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }

    async fn shutdown_engine(&mut self) -> Result<(), DriverError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        self.engine_started = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_chromium_variants_are_rejected() {
        let mut driver = CdpDriver::new();
        driver.start_engine().await.unwrap();
        let opts = LaunchOptions {
            headless: true,
            args: Vec::new(),
        };
        let err = driver
            .launch_browser(BrowserVariant::Firefox, &opts)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::UnsupportedVariant(BrowserVariant::Firefox)
        ));
    }

    #[tokio::test]
    async fn launch_requires_a_started_engine() {
        let mut driver = CdpDriver::new();
        let opts = LaunchOptions {
            headless: true,
            args: Vec::new(),
        };
        let err = driver
            .launch_browser(BrowserVariant::Chromium, &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NotStarted));
    }

    #[tokio::test]
    async fn page_operations_without_a_page_fail_cleanly() {
        let mut driver = CdpDriver::new();
        assert!(matches!(
            driver.navigate("https://example.test").await.unwrap_err(),
            DriverError::NoPage
        ));
        assert!(matches!(
            driver.open_context(&test_context_opts()).await.unwrap_err(),
            DriverError::NoBrowser
        ));
        // Teardown from an empty state is a no-op, not an error.
        driver.close_page().await.unwrap();
        driver.close_context().await.unwrap();
        driver.close_browser().await.unwrap();
    }

    fn test_context_opts() -> ContextOptions {
        ContextOptions {
            record_video_dir: None,
            video_width: 1280,
            video_height: 720,
            assertion_timeout: Duration::from_secs(5),
            default_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}
