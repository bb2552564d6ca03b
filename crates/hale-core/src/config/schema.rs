use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Resolved harness configuration.
///
/// Priority at load time: `HALE_*` environment overrides >
/// `hale.<env>.yaml` > `hale.yaml` > the built-in defaults below.
/// Everything except the browser variant has a usable default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Mandatory. One of `chromium`, `firefox`, `webkit`.
    pub browser: Option<String>,
    pub headless: bool,
    /// Application under test; consumed by page objects, not the core.
    pub base_url: Option<String>,
    pub driver: DriverKind,
    /// WebDriver endpoint for `driver: webdriver` (e.g. a chromedriver URL).
    pub webdriver_url: Option<String>,
    /// Parallel worker count; each worker runs one scenario to completion
    /// before taking another.
    pub workers: usize,
    /// Full re-executions of a failed scenario, on top of the first run.
    pub retry: u32,
    pub output_dir: PathBuf,
    pub timeouts: Timeouts,
    pub screenshots: ScreenshotPolicy,
    pub video: VideoConfig,
    pub trace: TraceConfig,
    /// YAML data tables for scenario test data.
    pub data_file: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            browser: None,
            headless: true,
            base_url: None,
            driver: DriverKind::default(),
            webdriver_url: None,
            workers: 1,
            retry: 0,
            output_dir: PathBuf::from("test-output"),
            timeouts: Timeouts::default(),
            screenshots: ScreenshotPolicy::default(),
            video: VideoConfig::default(),
            trace: TraceConfig::default(),
            data_file: None,
        }
    }
}

impl HarnessConfig {
    /// The configured browser variant. Missing or unrecognized values
    /// are fatal configuration errors; a scenario cannot run without a
    /// browser.
    pub fn browser_variant(&self) -> Result<BrowserVariant, ConfigError> {
        let name = self
            .browser
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingKey("browser"))?;
        name.parse()
    }

    /// Where per-run result records accumulate for the defect-age job.
    pub fn history_dir(&self) -> PathBuf {
        self.output_dir.join("history")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserVariant {
    Chromium,
    Firefox,
    Webkit,
}

impl FromStr for BrowserVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            "webkit" => Ok(Self::Webkit),
            other => Err(ConfigError::UnknownBrowser(other.to_string())),
        }
    }
}

impl std::fmt::Display for BrowserVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Chromium over CDP (chromiumoxide).
    #[default]
    Cdp,
    /// Any variant over a WebDriver endpoint (fantoccini).
    Webdriver,
}

/// The three timeout classes applied to every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// How long an assertion may wait for its condition.
    pub assertion_ms: u64,
    /// Budget for one full element resolution pass (shared across
    /// fallback attempts).
    pub global_wait_ms: u64,
    /// How long a page load may take.
    pub page_load_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            assertion_ms: 5_000,
            global_wait_ms: 10_000,
            page_load_ms: 30_000,
        }
    }
}

impl Timeouts {
    pub fn assertion(&self) -> Duration {
        Duration::from_millis(self.assertion_ms)
    }

    pub fn global_wait(&self) -> Duration {
        Duration::from_millis(self.global_wait_ms)
    }

    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }
}

/// Independent capture gates per scenario outcome and per step outcome.
/// Everything defaults to off; enable per environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotPolicy {
    pub on_scenario_failure: bool,
    pub on_scenario_success: bool,
    pub on_scenario_skipped: bool,
    pub on_step_failed: bool,
    pub on_step_passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("test-output/videos"),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub dir: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("test-output/traces"),
        }
    }
}
