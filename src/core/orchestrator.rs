//! Build orchestration around an external engine.
//!
//! Runs the addon lifecycle in a fixed order:
//! `preBuild` -> `build` -> engine -> `postBuild` -> result processing ->
//! `outputReady`. Any failure is reported to `buildError` hooks and then
//! returned to the caller unchanged.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{BuildResult, ResultAnnotation};

use super::addon::{implementors, HookCall};
use super::builder::{Builder, PassThrough, ResultProcessor};
use super::project::Project;

/// Label used for the instrumentation span around a build
pub const BUILD_LABEL: &str = "build";

/// Environment variable read by older tooling for instrumentation
pub const LEGACY_INSTRUMENTATION_ENV: &str = "KILN_LEGACY_INSTRUMENTATION";

static LEGACY_WARNING: Once = Once::new();

/// Where a build sequence currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    PreBuild,
    Building,
    PostBuild,
    ProcessingResult,
    OutputReady,
    BuildError,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Idle => "idle",
            BuildPhase::PreBuild => "preBuild",
            BuildPhase::Building => "building",
            BuildPhase::PostBuild => "postBuild",
            BuildPhase::ProcessingResult => "processingResult",
            BuildPhase::OutputReady => "outputReady",
            BuildPhase::BuildError => "buildError",
        };
        f.write_str(name)
    }
}

/// Drives addon hooks around a [`Builder`]
pub struct BuildOrchestrator {
    project: Arc<Project>,
    builder: Arc<dyn Builder>,
    processor: Arc<dyn ResultProcessor>,
    phase: Mutex<BuildPhase>,
    /// Held for the whole sequence so builds never overlap
    in_flight: tokio::sync::Mutex<()>,
}

impl BuildOrchestrator {
    /// Create an orchestrator with an identity result processor
    pub fn new(project: Arc<Project>, builder: Arc<dyn Builder>) -> Self {
        Self {
            project,
            builder,
            processor: Arc::new(PassThrough),
            phase: Mutex::new(BuildPhase::Idle),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the result processor
    pub fn with_processor(mut self, processor: Arc<dyn ResultProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Current phase of the in-flight build, or `Idle`
    pub fn phase(&self) -> BuildPhase {
        self.phase
            .lock()
            .map(|phase| *phase)
            .unwrap_or(BuildPhase::Idle)
    }

    fn set_phase(&self, phase: BuildPhase) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
    }

    /// Run one full build sequence
    ///
    /// Concurrent callers wait for the in-flight build to finish first.
    #[instrument(skip_all, fields(addons = self.project.addons().len()))]
    pub async fn build(
        &self,
        updated_files: Option<&[PathBuf]>,
        annotation: Option<ResultAnnotation>,
    ) -> Result<BuildResult> {
        let _slot = self.in_flight.lock().await;
        let _idle = ResetPhase(self);

        warn_legacy_instrumentation();

        let instrumentation = self.project.instrumentation();
        instrumentation.start(BUILD_LABEL);

        match self.run_sequence(updated_files, annotation.as_ref()).await {
            Ok(result) => {
                instrumentation.stop_and_report(BUILD_LABEL, &result, annotation.as_ref());
                info!(build_id = %result.id, files = result.output_files.len(), "Build completed");
                Ok(result)
            }
            Err(e) => {
                error!(phase = %self.phase(), error = %e, "Build failed");
                self.set_phase(BuildPhase::BuildError);
                self.report_build_error(&e).await;
                Err(e)
            }
        }
    }

    /// Release engine resources
    pub async fn cleanup(&self) -> Result<()> {
        debug!("Cleaning up build engine");
        self.builder.cleanup().await
    }

    async fn run_sequence(
        &self,
        updated_files: Option<&[PathBuf]>,
        annotation: Option<&ResultAnnotation>,
    ) -> Result<BuildResult> {
        self.set_phase(BuildPhase::PreBuild);
        self.run_hooks(HookCall::PreBuild(annotation)).await?;

        self.set_phase(BuildPhase::Building);
        self.run_hooks(HookCall::Build).await?;
        let result = self.builder.build(updated_files).await?;

        self.set_phase(BuildPhase::PostBuild);
        self.run_hooks(HookCall::PostBuild(&result)).await?;

        self.set_phase(BuildPhase::ProcessingResult);
        let result = self.processor.process(result)?;

        self.set_phase(BuildPhase::OutputReady);
        self.run_hooks(HookCall::OutputReady(&result)).await?;

        Ok(result)
    }

    /// Call a hook on each implementing addon; the first failure stops the phase
    async fn run_hooks(&self, call: HookCall<'_>) -> Result<()> {
        let hook = call.hook();

        for addon in implementors(self.project.addons(), hook) {
            debug!(addon = addon.name(), %hook, "Running addon hook");
            if let Err(e) = call.dispatch(addon.as_ref()).await {
                warn!(addon = addon.name(), %hook, error = %e, "Addon hook failed");
                return Err(e);
            }
        }

        Ok(())
    }

    /// Best-effort: every `buildError` hook runs even if an earlier one fails
    async fn report_build_error(&self, err: &anyhow::Error) {
        let call = HookCall::BuildError(err);

        for addon in implementors(self.project.addons(), call.hook()) {
            if let Err(hook_err) = call.dispatch(addon.as_ref()).await {
                warn!(
                    addon = addon.name(),
                    error = %hook_err,
                    "buildError hook failed"
                );
            }
        }
    }
}

/// Returns the orchestrator to `Idle` however the sequence ends
struct ResetPhase<'a>(&'a BuildOrchestrator);

impl Drop for ResetPhase<'_> {
    fn drop(&mut self) {
        self.0.set_phase(BuildPhase::Idle);
    }
}

fn warn_legacy_instrumentation() {
    if std::env::var_os(LEGACY_INSTRUMENTATION_ENV).is_some() {
        LEGACY_WARNING.call_once(|| {
            warn!(
                "{} is deprecated and ignored; set KILN_INSTRUMENTATION=1 instead",
                LEGACY_INSTRUMENTATION_ENV
            );
        });
    }
}
