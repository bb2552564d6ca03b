mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    BrowserVariant, DriverKind, HarnessConfig, ScreenshotPolicy, Timeouts, TraceConfig,
    VideoConfig,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(
        "missing mandatory setting '{0}': define it in hale.yaml, hale.<env>.yaml, or HALE_* environment"
    )]
    MissingKey(&'static str),
    #[error("unknown browser variant '{0}' (expected chromium, firefox, or webkit)")]
    UnknownBrowser(String),
}
