use crate::trace::Tracer;
use hale_core::ledger::FailureLedger;
use std::sync::Arc;

/// Per-worker scenario binding.
///
/// Carries the current scenario name, the shared failure ledger, and
/// the scenario's tracer through the call chain, so interaction code
/// can attribute failures without the call site ever passing a
/// scenario name. One context exists per scenario attempt and is never
/// shared across workers.
#[derive(Debug)]
pub struct ScenarioContext {
    name: String,
    ledger: Arc<FailureLedger>,
    tracer: Tracer,
}

impl ScenarioContext {
    pub(crate) fn new(name: impl Into<String>, ledger: Arc<FailureLedger>) -> Self {
        Self {
            name: name.into(),
            ledger,
            tracer: Tracer::start(),
        }
    }

    pub fn scenario_name(&self) -> &str {
        &self.name
    }

    /// Attribute one locator failure to the current scenario.
    pub fn record_failure(&self, action: &str, locator: &str) {
        self.ledger.record(action, locator, &self.name);
    }

    pub fn trace(&self, action: &str, target: Option<&str>, outcome: &str, detail: Option<String>) {
        self.tracer.record(action, target, outcome, detail);
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}
