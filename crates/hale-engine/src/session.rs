//! Per-worker browser session lifecycle.
//!
//! A session owns one driver and walks it through a strict resource
//! ladder: engine, browser, context, page. Acquisition is idempotent
//! and resumes from wherever the ladder stopped; teardown runs in
//! strict reverse order and never raises, so one dead sub-resource
//! cannot leak the ones beneath it.

use crate::driver::{ContextOptions, Driver, DriverError, LaunchOptions};
use hale_core::config::{ConfigError, HarnessConfig};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Where the session sits on the resource ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unallocated,
    /// Engine started, no browser yet.
    Allocated,
    /// Browser process up.
    Launched,
    /// Isolated context open (profile, recording, timeouts applied).
    Contextualized,
    /// Page open; interactions may run.
    PageReady,
    /// Page and context closed, recording finalized; browser still up.
    Finalizing,
    Closed,
}

/// Browser flags applied to every launch.
fn default_launch_args() -> Vec<String> {
    vec![
        "--start-maximized".to_string(),
        "--disable-extensions".to_string(),
        "--allow-insecure-localhost".to_string(),
    ]
}

pub struct Session {
    driver: Box<dyn Driver>,
    config: Arc<HarnessConfig>,
    state: SessionState,
}

impl Session {
    pub fn new(driver: Box<dyn Driver>, config: Arc<HarnessConfig>) -> Self {
        Self {
            driver,
            config,
            state: SessionState::Unallocated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_page_open(&self) -> bool {
        self.state == SessionState::PageReady
    }

    /// Mutable access to the underlying driver for interactions.
    /// Meaningful only while the page is open.
    pub fn driver_mut(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }

    /// Bring the session to [`SessionState::PageReady`], resuming from
    /// whatever rung it currently holds. Calling this on a ready
    /// session is a no-op.
    ///
    /// The browser variant is validated before anything launches; a
    /// missing or unknown variant is a configuration error, not a
    /// driver one.
    pub async fn acquire(&mut self) -> Result<(), SessionError> {
        let variant = self.config.browser_variant()?;

        // A finalized or closed session restarts from the bottom.
        if matches!(self.state, SessionState::Finalizing | SessionState::Closed) {
            self.release().await;
        }

        if self.state == SessionState::Unallocated {
            self.driver.start_engine().await?;
            self.state = SessionState::Allocated;
            tracing::debug!("driver engine started");
        }
        if self.state == SessionState::Allocated {
            let opts = LaunchOptions {
                headless: self.config.headless,
                args: default_launch_args(),
            };
            self.driver.launch_browser(variant, &opts).await?;
            self.state = SessionState::Launched;
            tracing::info!(%variant, headless = self.config.headless, "browser launched");
        }
        if self.state == SessionState::Launched {
            let opts = self.context_options();
            self.driver.open_context(&opts).await?;
            self.state = SessionState::Contextualized;
            tracing::debug!("browser context opened");
        }
        if self.state == SessionState::Contextualized {
            self.driver.open_page().await?;
            self.state = SessionState::PageReady;
            tracing::debug!("page opened");
        }
        Ok(())
    }

    /// Close the page and context so any in-flight recording lands on
    /// disk, returning the recording path if the driver produced one.
    ///
    /// The path must be read while the page is still open; reading it
    /// afterwards is undefined for recording backends. Never raises:
    /// recording is evidence, not a verdict.
    pub async fn finalize_recording(&mut self) -> Option<PathBuf> {
        if self.state != SessionState::PageReady {
            return None;
        }
        let video = match self.driver.video_path().await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve recording path");
                None
            }
        };
        if let Err(e) = self.driver.close_page().await {
            tracing::warn!(error = %e, "failed to close page");
        }
        if let Err(e) = self.driver.close_context().await {
            tracing::warn!(error = %e, "failed to close context");
        }
        self.state = SessionState::Finalizing;
        video
    }

    /// Tear down every remaining sub-resource in reverse acquisition
    /// order. Safe from any state; failures are logged and the
    /// teardown continues, because a crashed browser must not stop the
    /// worker from reclaiming the session.
    pub async fn release(&mut self) {
        if self.state == SessionState::PageReady {
            if let Err(e) = self.driver.close_page().await {
                tracing::warn!(error = %e, "failed to close page");
            }
            if let Err(e) = self.driver.close_context().await {
                tracing::warn!(error = %e, "failed to close context");
            }
        }
        if matches!(
            self.state,
            SessionState::PageReady
                | SessionState::Finalizing
                | SessionState::Contextualized
                | SessionState::Launched
        ) {
            if let Err(e) = self.driver.close_browser().await {
                tracing::warn!(error = %e, "failed to close browser");
            }
        }
        if self.state != SessionState::Unallocated {
            if let Err(e) = self.driver.shutdown_engine().await {
                tracing::warn!(error = %e, "failed to shut down driver engine");
            }
        }
        self.state = SessionState::Unallocated;
        tracing::debug!("session released");
    }

    fn context_options(&self) -> ContextOptions {
        ContextOptions {
            record_video_dir: self
                .config
                .video
                .enabled
                .then(|| self.config.video.dir.clone()),
            video_width: self.config.video.width,
            video_height: self.config.video.height,
            assertion_timeout: self.config.timeouts.assertion(),
            default_timeout: self.config.timeouts.global_wait(),
            navigation_timeout: self.config.timeouts.page_load(),
        }
    }
}
