//! Session video via the CDP screencast.
//!
//! Chromium pushes JPEG frames over the screencast channel; each frame
//! is acknowledged and appended to one MJPEG file. The file is
//! complete once the recorder stops, which happens when the session
//! context closes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    EventScreencastFrame, ScreencastFrameAckParams, StartScreencastFormat, StartScreencastParams,
    StopScreencastParams,
};
use futures::StreamExt;
use hale_engine::DriverError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

pub struct ScreencastRecorder {
    page: Page,
    path: PathBuf,
    writer_task: JoinHandle<()>,
}

impl ScreencastRecorder {
    pub async fn start(
        page: &Page,
        dir: &Path,
        width: u32,
        height: u32,
    ) -> Result<Self, DriverError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(recording_file_name());
        let mut file = std::fs::File::create(&path)?;

        let mut frames = page
            .event_listener::<EventScreencastFrame>()
            .await
            .map_err(|e| DriverError::Other(format!("failed to subscribe to screencast: {e}")))?;

        let ack_page = page.clone();
        let frame_path = path.clone();
        let writer_task = tokio::spawn(async move {
            while let Some(frame) = frames.next().await {
                // Unacknowledged frames stall the screencast.
                let ack = ScreencastFrameAckParams::new(frame.session_id);
                if let Err(e) = ack_page.execute(ack).await {
                    tracing::debug!(error = %e, "screencast frame ack failed");
                }
                match BASE64.decode(&frame.data) {
                    Ok(bytes) => {
                        if let Err(e) = file.write_all(&bytes) {
                            tracing::warn!(
                                error = %e,
                                path = %frame_path.display(),
                                "recording write failed, stopping"
                            );
                            break;
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "dropping undecodable frame"),
                }
            }
        });

        let mut params = StartScreencastParams::default();
        params.format = Some(StartScreencastFormat::Jpeg);
        params.quality = Some(60);
        params.max_width = Some(width as i64);
        params.max_height = Some(height as i64);
        params.every_nth_frame = Some(2);
        page.execute(params)
            .await
            .map_err(|e| DriverError::Other(format!("failed to start screencast: {e}")))?;

        tracing::debug!(path = %path.display(), "screencast recording started");
        Ok(Self {
            page: page.clone(),
            path,
            writer_task,
        })
    }

    /// Where the recording lands; valid from the moment the recorder
    /// starts.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn stop(self) -> Result<PathBuf, DriverError> {
        if let Err(e) = self.page.execute(StopScreencastParams::default()).await {
            tracing::debug!(error = %e, "failed to stop screencast cleanly");
        }
        // Give in-flight frames a moment to land before the writer stops.
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.writer_task.abort();
        tracing::debug!(path = %self.path.display(), "screencast recording finalized");
        Ok(self.path)
    }
}

fn recording_file_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("session_{}_{}.mjpeg", std::process::id(), nanos)
}
