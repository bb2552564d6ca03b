//! Scenario lifecycle coordination.
//!
//! The coordinator brackets every scenario attempt: it binds the
//! scenario name to the worker before any step runs, and on completion
//! walks the fixed teardown order: final screenshot, trace, video,
//! session release. Artifact capture is best effort throughout;
//! evidence collection must never change a scenario's verdict.

use crate::context::ScenarioContext;
use crate::report::ReportSink;
use crate::session::Session;
use hale_core::config::HarnessConfig;
use hale_core::ledger::FailureLedger;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

pub struct ScenarioCoordinator {
    config: Arc<HarnessConfig>,
    ledger: Arc<FailureLedger>,
}

impl ScenarioCoordinator {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self {
            config,
            ledger: Arc::new(FailureLedger::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<FailureLedger> {
        &self.ledger
    }

    /// Bind a scenario to the calling worker. Must happen before the
    /// first step so every locator failure lands under the right name.
    pub fn begin(&self, name: &str) -> ScenarioContext {
        tracing::info!(scenario = name, "scenario starting");
        ScenarioContext::new(name, Arc::clone(&self.ledger))
    }

    /// Run the completion sequence for one scenario attempt, in order:
    /// final screenshot (policy-gated), trace, video, session release.
    ///
    /// The page is still open when the screenshot runs; the video step
    /// closes it. The session is always released, whatever the
    /// artifact steps did.
    pub async fn finish(
        &self,
        session: &mut Session,
        ctx: ScenarioContext,
        status: ScenarioStatus,
        sink: &dyn ReportSink,
    ) {
        tracing::info!(
            scenario = ctx.scenario_name(),
            status = status.as_str(),
            "scenario finished"
        );
        self.capture_final_screenshot(session, &ctx, status, sink)
            .await;
        self.finalize_trace(&ctx, status, sink);
        self.finalize_video(session, &ctx, status, sink).await;
        session.release().await;
    }

    /// Step-level evidence, gated by the step screenshot policy.
    pub async fn attach_step_artifacts(
        &self,
        session: &mut Session,
        ctx: &ScenarioContext,
        step_name: &str,
        failed: bool,
        sink: &dyn ReportSink,
    ) {
        let wanted = if failed {
            self.config.screenshots.on_step_failed
        } else {
            self.config.screenshots.on_step_passed
        };
        if !wanted || !session.is_page_open() {
            return;
        }
        match self.take_screenshot(session).await {
            Some(png) => {
                let label = format!("Step: {step_name}");
                if let Err(e) = sink.attach_bytes(&label, "image/png", &png) {
                    tracing::warn!(error = %e, step = step_name, "failed to attach step screenshot");
                }
            }
            None => {
                tracing::warn!(
                    scenario = ctx.scenario_name(),
                    step = step_name,
                    "step screenshot capture failed"
                );
            }
        }
    }

    /// Flush the failure ledger once per run. Called after the last
    /// scenario completes; a clean run produces no file.
    pub fn finish_suite(&self) -> Option<PathBuf> {
        match self.ledger.flush_to(&self.config.output_dir) {
            Ok(Some(path)) => {
                tracing::info!(path = %path.display(), "failed locator report written");
                Some(path)
            }
            Ok(None) => {
                tracing::debug!("no locator failures recorded, skipping report");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not write failed locator report");
                None
            }
        }
    }

    async fn capture_final_screenshot(
        &self,
        session: &mut Session,
        ctx: &ScenarioContext,
        status: ScenarioStatus,
        sink: &dyn ReportSink,
    ) {
        let wanted = match status {
            ScenarioStatus::Passed => self.config.screenshots.on_scenario_success,
            ScenarioStatus::Failed => self.config.screenshots.on_scenario_failure,
            ScenarioStatus::Skipped => self.config.screenshots.on_scenario_skipped,
        };
        if !wanted {
            return;
        }
        if !session.is_page_open() {
            tracing::warn!(
                scenario = ctx.scenario_name(),
                "page already closed, skipping final screenshot"
            );
            return;
        }
        match self.take_screenshot(session).await {
            Some(png) => {
                if let Err(e) = sink.attach_bytes("Final Screenshot", "image/png", &png) {
                    tracing::warn!(error = %e, "failed to attach final screenshot");
                }
            }
            None => {
                tracing::warn!(
                    scenario = ctx.scenario_name(),
                    "final screenshot capture failed"
                );
            }
        }
    }

    /// Full-page capture with a viewport fallback for pages whose
    /// layout breaks full-page rendering.
    async fn take_screenshot(&self, session: &mut Session) -> Option<Vec<u8>> {
        match session.driver_mut().screenshot(true).await {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::debug!(error = %e, "full-page screenshot failed, trying viewport");
                session.driver_mut().screenshot(false).await.ok()
            }
        }
    }

    fn finalize_trace(&self, ctx: &ScenarioContext, status: ScenarioStatus, sink: &dyn ReportSink) {
        if status != ScenarioStatus::Failed {
            ctx.tracer().stop_and_discard();
            return;
        }
        match ctx
            .tracer()
            .stop_and_write(ctx.scenario_name(), &self.config.trace.dir)
        {
            Ok(path) => {
                if let Err(e) = sink.attach_file("Execution Trace", "application/json", &path) {
                    tracing::warn!(error = %e, "failed to attach trace");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, scenario = ctx.scenario_name(), "failed to write trace");
            }
        }
    }

    /// Finalize the session recording. Failed scenarios keep their
    /// video as evidence; any other outcome deletes it to keep the
    /// artifact directory from filling with passing runs.
    async fn finalize_video(
        &self,
        session: &mut Session,
        ctx: &ScenarioContext,
        status: ScenarioStatus,
        sink: &dyn ReportSink,
    ) {
        let Some(path) = session.finalize_recording().await else {
            return;
        };
        if status == ScenarioStatus::Failed {
            if let Err(e) = sink.attach_file("Execution Video", video_mime(&path), &path) {
                tracing::warn!(error = %e, "failed to attach video");
            }
        } else if let Err(e) = std::fs::remove_file(&path) {
            tracing::debug!(
                error = %e,
                scenario = ctx.scenario_name(),
                path = %path.display(),
                "could not delete recording"
            );
        }
    }
}

fn video_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("webm") => "video/webm",
        Some("mjpeg") => "video/x-motion-jpeg",
        _ => "application/octet-stream",
    }
}
