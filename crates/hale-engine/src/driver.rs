use async_trait::async_trait;
use hale_core::config::BrowserVariant;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver engine not started")]
    NotStarted,
    #[error("no browser launched")]
    NoBrowser,
    #[error("no open page")]
    NoPage,
    #[error("browser variant '{0}' is not supported by this driver")]
    UnsupportedVariant(BrowserVariant),
    #[error("launch failed: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("timed out waiting for '{0}'")]
    WaitTimeout(String),
    #[error("action failed on '{selector}': {message}")]
    Action { selector: String, message: String },
    #[error("not supported: {0}")]
    NotSupported(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
}

/// Settings applied when the isolated context opens: recording target
/// and the three timeout classes every session carries.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Directory for video recording; `None` disables recording.
    pub record_video_dir: Option<PathBuf>,
    pub video_width: u32,
    pub video_height: u32,
    pub assertion_timeout: Duration,
    pub default_timeout: Duration,
    pub navigation_timeout: Duration,
}

/// The seam between the harness and a concrete browser automation
/// backend. One `Driver` instance backs exactly one worker's session;
/// instances are never shared.
///
/// Lifecycle methods mirror the session sub-resources (engine →
/// browser → context → page) and must tolerate being called when the
/// sub-resource is already closed. Capabilities a backend cannot offer
/// keep the default implementation.
#[async_trait]
pub trait Driver: Send {
    /// Start the underlying automation engine (handler loops, child
    /// processes). No browser is launched yet.
    async fn start_engine(&mut self) -> Result<(), DriverError>;

    /// Launch one browser of the given variant.
    async fn launch_browser(
        &mut self,
        variant: BrowserVariant,
        opts: &LaunchOptions,
    ) -> Result<(), DriverError>;

    /// Open one isolated context (profile, recording, timeouts).
    async fn open_context(&mut self, opts: &ContextOptions) -> Result<(), DriverError>;

    /// Open the single page this session interacts through.
    async fn open_page(&mut self) -> Result<(), DriverError>;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Wait until the selector resolves to a visible element, or
    /// `Err(WaitTimeout)` once the budget is spent. Selectors starting
    /// with `//` or `(` are XPath, anything else is CSS.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    async fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    /// Clear the field, then set the value.
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), DriverError>;

    async fn text_content(&mut self, selector: &str) -> Result<String, DriverError>;

    /// Wait for the document to be usable (DOM content loaded).
    async fn wait_for_load(&mut self, timeout: Duration) -> Result<(), DriverError>;

    /// Wait for in-flight network activity to settle. Callers treat a
    /// timeout here as acceptable.
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    async fn title(&mut self) -> Result<String, DriverError>;

    async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError>;

    /// Where the session video will land once the context closes.
    /// Must be read while the page is still open; backends without
    /// recording report `None`.
    async fn video_path(&mut self) -> Result<Option<PathBuf>, DriverError> {
        Ok(None)
    }

    async fn close_page(&mut self) -> Result<(), DriverError>;

    /// Closing the context finalizes any recording to disk.
    async fn close_context(&mut self) -> Result<(), DriverError>;

    async fn close_browser(&mut self) -> Result<(), DriverError>;

    async fn shutdown_engine(&mut self) -> Result<(), DriverError>;
}

/// Selector dialect sniffing shared by driver implementations.
pub fn is_xpath(selector: &str) -> bool {
    selector.starts_with("//") || selector.starts_with('(')
}
