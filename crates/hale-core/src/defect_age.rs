//! Offline defect-age aggregation.
//!
//! Every suite run appends one JSON record to the history directory.
//! This job scans that history and, for each scenario identity whose
//! most recent run failed, counts how many consecutive runs it has
//! been failing, so old defects float to the top of the report.
//!
//! Stateless per invocation, no concurrency involved; runs from the
//! CLI after (or independently of) a suite run.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// One suite run's results, keyed by scenario identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run start, unix milliseconds. Orders the history.
    pub started_ms: i64,
    pub results: HashMap<String, ScenarioResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// `passed`, `failed`, `broken`, or `skipped`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A scenario that is currently failing, with its streak.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectReport {
    pub identity: String,
    pub consecutive_failures: u32,
    pub first_failure: DateTime<Utc>,
    pub last_failure: DateTime<Utc>,
    pub age_days: i64,
    pub error: Option<String>,
}

fn is_defect(status: &str) -> bool {
    matches!(status.to_ascii_lowercase().as_str(), "failed" | "broken")
}

/// Appends one run record to the history directory. File name embeds
/// the run start so lexical order tracks chronology.
pub fn append_run(history_dir: &Path, record: &RunRecord) -> io::Result<PathBuf> {
    std::fs::create_dir_all(history_dir)?;
    let path = history_dir.join(format!("run_{:013}.json", record.started_ms));
    let json = serde_json::to_vec_pretty(record).map_err(io::Error::other)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Scans the history and reports every scenario whose latest run
/// failed, sorted oldest defect first.
pub fn scan_history(history_dir: &Path) -> io::Result<Vec<DefectReport>> {
    let mut histories: HashMap<String, Vec<(i64, ScenarioResult)>> = HashMap::new();

    for entry in std::fs::read_dir(history_dir)? {
        let path = entry?.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        let record: RunRecord = match serde_json::from_str(&content) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable history record");
                continue;
            }
        };
        for (identity, result) in record.results {
            histories
                .entry(identity)
                .or_default()
                .push((record.started_ms, result));
        }
    }

    let mut reports = Vec::new();
    for (identity, mut entries) in histories {
        entries.sort_by_key(|(started_ms, _)| *started_ms);

        // Walk backward from the most recent run; a non-failing entry
        // breaks the streak.
        let mut streak = 0u32;
        let mut error = None;
        for (_, result) in entries.iter().rev() {
            if !is_defect(&result.status) {
                break;
            }
            if streak == 0 {
                error = result.error.clone();
            }
            streak += 1;
        }
        if streak == 0 {
            continue;
        }

        let first_ms = entries[entries.len() - streak as usize].0;
        let last_ms = entries[entries.len() - 1].0;
        let first_failure = timestamp(first_ms)?;
        let last_failure = timestamp(last_ms)?;
        let age_days = (last_ms - first_ms) / (1000 * 60 * 60 * 24) + 1;

        reports.push(DefectReport {
            identity,
            consecutive_failures: streak,
            first_failure,
            last_failure,
            age_days,
            error,
        });
    }

    reports.sort_by(|a, b| {
        b.age_days
            .cmp(&a.age_days)
            .then_with(|| a.identity.cmp(&b.identity))
    });
    Ok(reports)
}

/// Writes the defect-age report as CSV, one row per failing identity.
pub fn write_csv(reports: &[DefectReport], path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::from("identity,consecutive_failures,age_days,first_failure,last_failure,error\n");
    for report in reports {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(&report.identity),
            report.consecutive_failures,
            report.age_days,
            report.first_failure.format("%Y-%m-%d %H:%M:%S"),
            report.last_failure.format("%Y-%m-%d %H:%M:%S"),
            csv_field(report.error.as_deref().unwrap_or("")),
        ));
    }
    std::fs::write(path, out)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn timestamp(ms: i64) -> io::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| io::Error::other(format!("timestamp out of range: {ms}")))
}
