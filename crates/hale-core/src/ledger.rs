//! Process-wide aggregation of locators that failed during a run.
//!
//! When an interaction cannot resolve a selector, the failure is
//! recorded here: which selector, which action was being performed,
//! and which scenarios were affected. At suite end the ledger is
//! flushed once to a timestamped JSON report so broken selectors can
//! be fixed without digging through logs.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One failed selector, with every scenario it impacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub locator: String,
    pub action: String,
    pub impacted_scenarios: Vec<String>,
}

/// Shared, thread-safe failure log. The only piece of state shared
/// across workers; everything else in a run is worker-local.
#[derive(Debug, Default)]
pub struct FailureLedger {
    records: Mutex<Vec<FailureRecord>>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one locator failure for the given scenario.
    ///
    /// Deduplication key is the locator string alone: the first failure
    /// of a locator creates a record, later failures append the scenario
    /// (idempotently) regardless of which action failed. If one selector
    /// string backs two different actions, the report keeps the
    /// first-recorded action while scenarios accumulate; the report
    /// answers "which selectors are broken", not "which calls failed".
    pub fn record(&self, action: &str, locator: &str, scenario: &str) {
        let mut records = self.lock();
        if let Some(existing) = records.iter_mut().find(|r| r.locator == locator) {
            if !existing.impacted_scenarios.iter().any(|s| s == scenario) {
                existing.impacted_scenarios.push(scenario.to_string());
            }
            return;
        }
        tracing::debug!(locator, action, "locator added to failure ledger");
        records.push(FailureRecord {
            locator: locator.to_string(),
            action: action.to_string(),
            impacted_scenarios: vec![scenario.to_string()],
        });
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of all records, in first-insertion order.
    pub fn snapshot(&self) -> Vec<FailureRecord> {
        self.lock().clone()
    }

    /// Writes the failure report to `dir` as a pretty-printed JSON array
    /// in a timestamped file. Returns `Ok(None)` without touching the
    /// filesystem when no failures were recorded. The in-memory ledger
    /// is not cleared; it lives for the rest of the process.
    pub fn flush_to(&self, dir: &Path) -> io::Result<Option<PathBuf>> {
        let records = self.snapshot();
        if records.is_empty() {
            return Ok(None);
        }
        std::fs::create_dir_all(dir)?;
        let stamp = Local::now().format("%d%m%Y_%H%M%S");
        let path = dir.join(format!("failed_locators_{stamp}.json"));
        let json = serde_json::to_vec_pretty(&records).map_err(io::Error::other)?;
        std::fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "locator failure report generated");
        Ok(Some(path))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FailureRecord>> {
        // A panic while holding the lock leaves valid data behind.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}
