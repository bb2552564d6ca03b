//! Structured interaction tracing.
//!
//! Every interaction attempt appends one event to the scenario's
//! tracer. On failure the whole log is written as a JSON archive next
//! to the other run artifacts, giving a step-by-step replay of what
//! the scenario did and which locators it burned through. On any other
//! outcome the events are discarded.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Milliseconds since the tracer started.
    pub at_ms: u64,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct TraceArchive<'a> {
    scenario: &'a str,
    events: &'a [TraceEvent],
}

#[derive(Debug)]
pub struct Tracer {
    started_at: Instant,
    events: Mutex<Vec<TraceEvent>>,
}

impl Tracer {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, action: &str, target: Option<&str>, outcome: &str, detail: Option<String>) {
        let event = TraceEvent {
            at_ms: self.started_at.elapsed().as_millis() as u64,
            action: action.to_string(),
            target: target.map(str::to_string),
            outcome: outcome.to_string(),
            detail,
        };
        self.lock().push(event);
    }

    pub fn event_count(&self) -> usize {
        self.lock().len()
    }

    /// Persist the trace for a failed scenario. The file name is the
    /// sanitized scenario name, so reruns overwrite rather than pile up.
    pub fn stop_and_write(&self, scenario: &str, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.trace.json", sanitize_filename(scenario)));
        let events = self.lock();
        let archive = TraceArchive {
            scenario,
            events: &events,
        };
        let json = serde_json::to_vec_pretty(&archive).map_err(io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Drop the recorded events without writing anything.
    pub fn stop_and_discard(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TraceEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Collapses every run of non-alphanumeric characters to a single
/// underscore, producing a name valid on any filesystem.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out
}
