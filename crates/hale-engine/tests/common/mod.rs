#![allow(dead_code)] // not every test binary uses every helper

//! Scripted in-memory driver for engine tests.
//!
//! The mock resolves selectors from a configurable set, serves canned
//! text and URLs, and records every trait call (with the timeout it
//! was given) so tests can assert call order and budget handling.

use async_trait::async_trait;
use hale_engine::{ContextOptions, Driver, DriverError, LaunchOptions};
use hale_core::config::BrowserVariant;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StartEngine,
    LaunchBrowser(String),
    OpenContext,
    OpenPage,
    Navigate(String),
    WaitForSelector { selector: String, timeout_ms: u64 },
    Click(String),
    Fill(String, String),
    TextContent(String),
    WaitForLoad,
    WaitForNetworkIdle,
    CurrentUrl,
    Title,
    Screenshot { full_page: bool },
    VideoPath,
    ClosePage,
    CloseContext,
    CloseBrowser,
    ShutdownEngine,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    /// Selectors that resolve as visible.
    pub available: HashSet<String>,
    pub texts: HashMap<String, String>,
    /// Served by `current_url`, one per call; the last entry repeats.
    pub urls: VecDeque<String>,
    pub title: String,
    pub video: Option<PathBuf>,
    pub screenshot_bytes: Vec<u8>,
    pub fail_full_page_screenshot: bool,
    pub fail_launch: bool,
    pub fail_close_page: bool,
    pub fail_close_context: bool,
}

#[derive(Clone)]
pub struct MockHandle(Arc<Mutex<MockState>>);

impl MockHandle {
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn make_available(&self, selector: &str) {
        self.state().available.insert(selector.to_string());
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        let mut state = self.state();
        state.available.insert(selector.to_string());
        state.texts.insert(selector.to_string(), text.to_string());
    }

    /// Timeouts handed to `wait_for_selector`, in call order.
    pub fn selector_waits(&self) -> Vec<(String, u64)> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::WaitForSelector {
                    selector,
                    timeout_ms,
                } => Some((selector.clone(), *timeout_ms)),
                _ => None,
            })
            .collect()
    }
}

pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState {
            screenshot_bytes: b"png-bytes".to_vec(),
            ..MockState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle(state),
        )
    }

    /// A driver sharing existing state; lets a suite factory hand
    /// every attempt the same scripted world.
    pub fn sharing(handle: &MockHandle) -> Self {
        Self {
            state: Arc::clone(&handle.0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn start_engine(&mut self) -> Result<(), DriverError> {
        self.lock().calls.push(Call::StartEngine);
        Ok(())
    }

    async fn launch_browser(
        &mut self,
        variant: BrowserVariant,
        _opts: &LaunchOptions,
    ) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::LaunchBrowser(variant.to_string()));
        if state.fail_launch {
            return Err(DriverError::Launch("scripted launch failure".into()));
        }
        Ok(())
    }

    async fn open_context(&mut self, _opts: &ContextOptions) -> Result<(), DriverError> {
        self.lock().calls.push(Call::OpenContext);
        Ok(())
    }

    async fn open_page(&mut self) -> Result<(), DriverError> {
        self.lock().calls.push(Call::OpenPage);
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.lock().calls.push(Call::Navigate(url.to_string()));
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::WaitForSelector {
            selector: selector.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        });
        if state.available.contains(selector) {
            Ok(())
        } else {
            Err(DriverError::WaitTimeout(selector.to_string()))
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        self.lock().calls.push(Call::Click(selector.to_string()));
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.lock()
            .calls
            .push(Call::Fill(selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn text_content(&mut self, selector: &str) -> Result<String, DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::TextContent(selector.to_string()));
        state
            .texts
            .get(selector)
            .cloned()
            .ok_or_else(|| DriverError::Action {
                selector: selector.to_string(),
                message: "no text scripted".into(),
            })
    }

    async fn wait_for_load(&mut self, _timeout: Duration) -> Result<(), DriverError> {
        self.lock().calls.push(Call::WaitForLoad);
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> Result<(), DriverError> {
        self.lock().calls.push(Call::WaitForNetworkIdle);
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::CurrentUrl);
        let url = if state.urls.len() > 1 {
            state.urls.pop_front()
        } else {
            state.urls.front().cloned()
        };
        url.ok_or(DriverError::NoPage)
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::Title);
        Ok(state.title.clone())
    }

    async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::Screenshot { full_page });
        if full_page && state.fail_full_page_screenshot {
            return Err(DriverError::Other("full-page rendering failed".into()));
        }
        Ok(state.screenshot_bytes.clone())
    }

    async fn video_path(&mut self) -> Result<Option<PathBuf>, DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::VideoPath);
        Ok(state.video.clone())
    }

    async fn close_page(&mut self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::ClosePage);
        if state.fail_close_page {
            return Err(DriverError::Other("page already gone".into()));
        }
        Ok(())
    }

    async fn close_context(&mut self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.calls.push(Call::CloseContext);
        if state.fail_close_context {
            return Err(DriverError::Other("context already gone".into()));
        }
        Ok(())
    }

    async fn close_browser(&mut self) -> Result<(), DriverError> {
        self.lock().calls.push(Call::CloseBrowser);
        Ok(())
    }

    async fn shutdown_engine(&mut self) -> Result<(), DriverError> {
        self.lock().calls.push(Call::ShutdownEngine);
        Ok(())
    }
}

/// Configuration with a browser set and all timeouts at their
/// defaults, writing artifacts under the given directory.
pub fn test_config(output_dir: &std::path::Path) -> hale_core::config::HarnessConfig {
    let mut config = hale_core::config::HarnessConfig::default();
    config.browser = Some("chromium".to_string());
    config.output_dir = output_dir.to_path_buf();
    config.video.dir = output_dir.join("videos");
    config.trace.dir = output_dir.join("traces");
    config
}
