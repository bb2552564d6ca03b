//! Evidence attachment sink.
//!
//! Artifacts captured during a scenario (screenshots, traces, videos)
//! are handed to a [`ReportSink`] instead of being written inline, so
//! the coordinator does not care where evidence ends up. The default
//! sink files everything into a per-scenario directory with a stable
//! ordering prefix.

use crate::trace::sanitize_filename;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait ReportSink: Send + Sync {
    /// Attach raw bytes under a human-readable label.
    fn attach_bytes(&self, label: &str, mime: &str, data: &[u8]) -> io::Result<()>;

    /// Attach an existing file by reading it into the sink.
    fn attach_file(&self, label: &str, mime: &str, path: &Path) -> io::Result<()> {
        let data = std::fs::read(path)?;
        self.attach_bytes(label, mime, &data)
    }
}

/// Files attachments as `NNN_label.ext` inside one directory, in
/// attachment order.
pub struct FsReportSink {
    dir: PathBuf,
    next_index: AtomicUsize,
}

impl FsReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_index: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for FsReportSink {
    fn attach_bytes(&self, label: &str, mime: &str, data: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let idx = self.next_index.fetch_add(1, Ordering::SeqCst);
        let name = format!(
            "{idx:03}_{}.{}",
            sanitize_filename(label),
            extension_for(mime)
        );
        std::fs::write(self.dir.join(name), data)
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "application/json" => "json",
        "video/webm" => "webm",
        "video/x-motion-jpeg" => "mjpeg",
        "text/plain" => "txt",
        _ => "bin",
    }
}
