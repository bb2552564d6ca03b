//! Core building blocks for the hale test harness: configuration,
//! locator sets, the shared failure ledger, data tables, and the
//! offline defect-age aggregation job.
//!
//! Nothing in this crate touches a browser; the driver abstraction and
//! everything built on top of it live in `hale-engine`.

pub mod config;
pub mod data;
pub mod defect_age;
pub mod ledger;
pub mod locator;

pub use config::{BrowserVariant, ConfigError, ConfigLoader, DriverKind, HarnessConfig};
pub use ledger::{FailureLedger, FailureRecord};
pub use locator::LocatorSet;
