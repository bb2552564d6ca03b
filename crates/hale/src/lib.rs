//! Facade crate for test suites.
//!
//! Suites depend on this crate alone: it re-exports the pieces a suite
//! touches and wires the configured driver kind to a concrete driver
//! implementation.

use hale_core::config::{ConfigError, DriverKind, HarnessConfig};
use hale_core::data::DataError;
use hale_engine::{Driver, DriverFactory};
use std::sync::Arc;
use thiserror::Error;

pub use hale_cdp::CdpDriver;
pub use hale_core::config::{ConfigLoader, HarnessConfig as Config};
pub use hale_core::locator::LocatorSet;
pub use hale_engine::{
    InteractError, Interactor, Scenario, ScenarioStatus, StepError, StepHandle, StepResult,
    SuiteReport, SuiteRunner,
};
pub use hale_wd::WdDriver;

/// Everything that can go wrong before the first scenario runs.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Driver factory for the configured driver kind. The WebDriver kind
/// needs an endpoint URL; missing one is a configuration error.
pub fn driver_factory(config: &HarnessConfig) -> Result<DriverFactory, ConfigError> {
    match config.driver {
        DriverKind::Cdp => Ok(Arc::new(|| Box::new(CdpDriver::new()) as Box<dyn Driver>)),
        DriverKind::Webdriver => {
            let endpoint = config
                .webdriver_url
                .clone()
                .filter(|s| !s.trim().is_empty())
                .ok_or(ConfigError::MissingKey("webdriver_url"))?;
            Ok(Arc::new(move || {
                Box::new(WdDriver::new(endpoint.clone())) as Box<dyn Driver>
            }))
        }
    }
}

/// Build a runner from configuration: loads data tables and selects
/// the driver.
pub fn suite_runner(config: HarnessConfig) -> Result<Arc<SuiteRunner>, SetupError> {
    let factory = driver_factory(&config)?;
    let runner = SuiteRunner::new(Arc::new(config), factory)?;
    Ok(Arc::new(runner))
}
