//! Parallel suite runner.
//!
//! Scenarios go into one shared queue; each worker owns its session
//! and pulls scenarios to completion, so no two workers ever touch the
//! same browser. Retry happens at scenario granularity: a failed
//! scenario is re-executed from scratch, fresh session included, up to
//! the configured attempt count.

use crate::context::ScenarioContext;
use crate::driver::Driver;
use crate::interact::{InteractError, Interactor};
use crate::lifecycle::{ScenarioCoordinator, ScenarioStatus};
use crate::report::FsReportSink;
use crate::session::{Session, SessionError};
use crate::trace::sanitize_filename;
use chrono::Utc;
use futures::future::BoxFuture;
use hale_core::config::HarnessConfig;
use hale_core::data::{DataError, DataRecord, DataTables};
use hale_core::defect_age::{self, RunRecord, ScenarioResult};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Interaction(#[from] InteractError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("no data file configured")]
    NoDataFile,
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error("skipped: {0}")]
    Skipped(String),
}

pub type StepResult = Result<(), StepError>;

/// A step body. Borrows the worker's handle for the duration of the
/// step; the boxed future keeps step definitions object-safe.
pub type StepFn = Arc<dyn for<'a> Fn(&'a mut StepHandle) -> BoxFuture<'a, StepResult> + Send + Sync>;

/// Factory for per-attempt drivers. Every scenario attempt gets a
/// fresh driver, so a crashed browser never bleeds into the next run.
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn Driver> + Send + Sync>;

struct Step {
    label: String,
    run: StepFn,
}

/// A named scenario: an ordered list of labeled steps. The first step
/// error ends the attempt.
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step<F>(mut self, label: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut StepHandle) -> BoxFuture<'a, StepResult> + Send + Sync + 'static,
    {
        self.steps.push(Step {
            label: label.into(),
            run: Arc::new(f),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Everything a step body can reach: the live session, the scenario
/// binding, configuration and the shared data tables. Page objects are
/// built over [`StepHandle::ui`].
pub struct StepHandle {
    session: Session,
    ctx: ScenarioContext,
    config: Arc<HarnessConfig>,
    data: Option<Arc<DataTables>>,
}

impl StepHandle {
    /// The interaction engine bound to this worker's page.
    pub fn ui(&mut self) -> Interactor<'_> {
        Interactor::new(self.session.driver_mut(), &self.ctx, &self.config)
    }

    pub fn scenario_name(&self) -> &str {
        self.ctx.scenario_name()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// This scenario's row from the named table, keyed by the scenario
    /// name.
    pub fn test_data(&self, table: &str) -> Result<&DataRecord, StepError> {
        self.lookup(table, self.ctx.scenario_name())
    }

    pub fn lookup(&self, table: &str, key: &str) -> Result<&DataRecord, StepError> {
        let tables = self.data.as_deref().ok_or(StepError::NoDataFile)?;
        Ok(tables.lookup(table, key)?)
    }

    /// Fail the step with an assertion error unless `cond` holds.
    pub fn ensure(&self, cond: bool, message: impl Into<String>) -> StepResult {
        if cond {
            Ok(())
        } else {
            Err(StepError::Assertion(message.into()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    pub status: ScenarioStatus,
    /// Executions consumed, first run included.
    pub attempts: u32,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct SuiteReport {
    pub outcomes: Vec<ScenarioOutcome>,
    /// Failed-locator report, when any locator failed this run.
    pub ledger_report: Option<PathBuf>,
    /// This run's record in the defect-age history.
    pub history_record: Option<PathBuf>,
}

impl SuiteReport {
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == ScenarioStatus::Failed)
            .count()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status != ScenarioStatus::Failed)
    }
}

pub struct SuiteRunner {
    config: Arc<HarnessConfig>,
    coordinator: Arc<ScenarioCoordinator>,
    factory: DriverFactory,
    data: Option<Arc<DataTables>>,
}

impl SuiteRunner {
    /// Builds a runner, loading the data tables if the configuration
    /// names a data file.
    pub fn new(config: Arc<HarnessConfig>, factory: DriverFactory) -> Result<Self, DataError> {
        let data = match &config.data_file {
            Some(path) => Some(Arc::new(DataTables::load(path)?)),
            None => None,
        };
        Ok(Self {
            coordinator: Arc::new(ScenarioCoordinator::new(Arc::clone(&config))),
            config,
            factory,
            data,
        })
    }

    pub fn coordinator(&self) -> &Arc<ScenarioCoordinator> {
        &self.coordinator
    }

    /// Run every scenario to completion across the configured worker
    /// count, then flush the failure ledger and append this run to the
    /// defect-age history.
    pub async fn run(self: &Arc<Self>, scenarios: Vec<Scenario>) -> SuiteReport {
        let started_ms = Utc::now().timestamp_millis();
        let total = scenarios.len();
        let workers = self.config.workers.max(1).min(total.max(1));
        tracing::info!(scenarios = total, workers, "suite starting");

        let queue = Arc::new(Mutex::new(VecDeque::from(scenarios)));
        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let runner = Arc::clone(self);
            let queue = Arc::clone(&queue);
            let outcomes = Arc::clone(&outcomes);
            handles.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(scenario) = next else { break };
                    tracing::debug!(worker, scenario = scenario.name(), "scenario dequeued");
                    let outcome = runner.run_scenario(scenario).await;
                    outcomes.lock().await.push(outcome);
                }
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }

        let outcomes = Arc::try_unwrap(outcomes)
            .map(Mutex::into_inner)
            .unwrap_or_default();

        let ledger_report = self.coordinator.finish_suite();
        let history_record = self.append_history(started_ms, &outcomes);

        tracing::info!(
            total = outcomes.len(),
            failed = outcomes
                .iter()
                .filter(|o| o.status == ScenarioStatus::Failed)
                .count(),
            "suite finished"
        );
        SuiteReport {
            outcomes,
            ledger_report,
            history_record,
        }
    }

    async fn run_scenario(&self, scenario: Scenario) -> ScenarioOutcome {
        let max_attempts = self.config.retry + 1;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let (status, error) = self.run_attempt(&scenario).await;
            if status == ScenarioStatus::Failed && attempts < max_attempts {
                tracing::warn!(
                    scenario = scenario.name(),
                    attempt = attempts,
                    "scenario failed, retrying"
                );
                continue;
            }
            return ScenarioOutcome {
                name: scenario.name,
                status,
                attempts,
                error,
            };
        }
    }

    /// One full execution: fresh session, all steps in order, then the
    /// completion sequence. The coordinator's teardown runs whatever
    /// the steps did.
    async fn run_attempt(&self, scenario: &Scenario) -> (ScenarioStatus, Option<String>) {
        let ctx = self.coordinator.begin(&scenario.name);
        let mut session = Session::new((self.factory)(), Arc::clone(&self.config));
        let sink = FsReportSink::new(
            self.config
                .output_dir
                .join("artifacts")
                .join(sanitize_filename(&scenario.name)),
        );

        if let Err(e) = session.acquire().await {
            tracing::error!(scenario = scenario.name(), error = %e, "session acquisition failed");
            self.coordinator
                .finish(&mut session, ctx, ScenarioStatus::Failed, &sink)
                .await;
            return (ScenarioStatus::Failed, Some(e.to_string()));
        }

        let mut handle = StepHandle {
            session,
            ctx,
            config: Arc::clone(&self.config),
            data: self.data.clone(),
        };

        let mut status = ScenarioStatus::Passed;
        let mut error = None;
        for step in &scenario.steps {
            match (step.run)(&mut handle).await {
                Ok(()) => {
                    self.coordinator
                        .attach_step_artifacts(
                            &mut handle.session,
                            &handle.ctx,
                            &step.label,
                            false,
                            &sink,
                        )
                        .await;
                }
                Err(StepError::Skipped(reason)) => {
                    tracing::info!(
                        scenario = scenario.name(),
                        step = step.label,
                        reason,
                        "scenario skipped"
                    );
                    status = ScenarioStatus::Skipped;
                    error = Some(reason);
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        scenario = scenario.name(),
                        step = step.label,
                        error = %e,
                        "step failed"
                    );
                    self.coordinator
                        .attach_step_artifacts(
                            &mut handle.session,
                            &handle.ctx,
                            &step.label,
                            true,
                            &sink,
                        )
                        .await;
                    status = ScenarioStatus::Failed;
                    error = Some(format!("{}: {e}", step.label));
                    break;
                }
            }
        }

        let StepHandle {
            mut session, ctx, ..
        } = handle;
        self.coordinator.finish(&mut session, ctx, status, &sink).await;
        (status, error)
    }

    fn append_history(&self, started_ms: i64, outcomes: &[ScenarioOutcome]) -> Option<PathBuf> {
        let mut results = HashMap::with_capacity(outcomes.len());
        for outcome in outcomes {
            results.insert(
                outcome.name.clone(),
                ScenarioResult {
                    status: outcome.status.as_str().to_string(),
                    error: outcome.error.clone(),
                },
            );
        }
        let record = RunRecord {
            started_ms,
            results,
        };
        match defect_age::append_run(&self.config.history_dir(), &record) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "could not append run to defect-age history");
                None
            }
        }
    }
}
