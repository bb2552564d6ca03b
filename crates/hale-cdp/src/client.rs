//! Browser process management for the CDP driver.

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use hale_engine::{DriverError, LaunchOptions};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

/// One launched Chromium with its handler loop and profile directory.
pub struct CdpClient {
    pub browser: Browser,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(opts: &LaunchOptions) -> Result<Self, DriverError> {
        let mut config_builder = BrowserConfig::builder();
        // Sandboxed Chromium cannot start inside most containers.
        config_builder = config_builder.no_sandbox();
        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir()?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if opts.headless {
            tracing::info!("launching chromium in headless mode");
        } else {
            tracing::info!("launching chromium in headed mode");
            config_builder = config_builder.with_head();
        }

        for arg in &opts.args {
            config_builder = config_builder.arg(arg);
        }

        // Support a custom Chromium path via HALE_CHROME_BIN
        if let Ok(chrome_bin) = std::env::var("HALE_CHROME_BIN") {
            tracing::info!(path = chrome_bin, "using custom chromium binary");
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let config = config_builder
            .build()
            .map_err(|e| DriverError::Launch(format!("invalid browser config: {e}")))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::error!(error = %e, "browser handler error (ignoring)");
                }
            }
            tracing::debug!("browser handler task ended");
        });

        Ok(Self {
            browser,
            handler_task,
            user_data_dir,
            cleanup_user_data_dir,
        })
    }

    pub async fn new_page(&self) -> Result<Page, DriverError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Other(format!("failed to create page: {e}")))?;
        auto_accept_dialogs(&page).await?;
        Ok(page)
    }

    pub async fn close(mut self) -> Result<(), DriverError> {
        self.browser
            .close()
            .await
            .map_err(|e| DriverError::Other(format!("error closing browser: {e}")))?;
        self.handler_task
            .await
            .map_err(|e| DriverError::Other(format!("error awaiting handler: {e}")))?;

        if self.cleanup_user_data_dir {
            if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
                tracing::debug!(
                    dir = %self.user_data_dir.display(),
                    error = %e,
                    "failed to clean up user-data-dir"
                );
            }
        }
        Ok(())
    }
}

/// Dialogs (alert/confirm/prompt) block the JS thread and would stall
/// every evaluate call; accept them as they appear.
async fn auto_accept_dialogs(page: &Page) -> Result<(), DriverError> {
    let mut dialog_events = page
        .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening>()
        .await
        .map_err(|e| DriverError::Other(format!("failed to subscribe to dialog events: {e}")))?;

    let page_clone = page.clone();
    tokio::spawn(async move {
        while let Some(event) = dialog_events.next().await {
            tracing::info!(message = event.message, kind = ?event.r#type, "accepting javascript dialog");
            let cmd =
                chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams::new(true);
            if let Err(e) = page_clone.execute(cmd).await {
                tracing::error!(error = %e, "failed to accept dialog");
            }
        }
    });
    Ok(())
}

fn resolve_user_data_dir() -> Result<(PathBuf, bool), DriverError> {
    if let Ok(dir) = std::env::var("HALE_USER_DATA_DIR") {
        let path = PathBuf::from(dir);
        std::fs::create_dir_all(&path)?;
        tracing::info!(dir = %path.display(), "using user data dir from HALE_USER_DATA_DIR");
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| DriverError::Launch(format!("system clock error: {e}")))?
        .as_nanos();
    let unique = format!("hale-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::debug!(dir = %path.display(), "using isolated user data dir");
    Ok((path, true))
}
