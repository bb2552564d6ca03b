//! The hale execution engine: the browser driver seam, the
//! self-healing element interaction engine, per-worker session
//! lifecycle, scenario coordination, and the parallel suite runner.
//!
//! Driver implementations live in their own crates (`hale-cdp`,
//! `hale-wd`); this crate only depends on the `Driver` trait.

pub mod context;
pub mod driver;
pub mod interact;
pub mod lifecycle;
pub mod report;
pub mod runner;
pub mod session;
pub mod trace;

pub use context::ScenarioContext;
pub use driver::{ContextOptions, Driver, DriverError, LaunchOptions};
pub use interact::{InteractError, Interactor};
pub use lifecycle::{ScenarioCoordinator, ScenarioStatus};
pub use report::{FsReportSink, ReportSink};
pub use runner::{
    DriverFactory, Scenario, ScenarioOutcome, StepError, StepFn, StepHandle, StepResult,
    SuiteReport, SuiteRunner,
};
pub use session::{Session, SessionError, SessionState};
