//! Build instrumentation.
//!
//! An instrumentation sink brackets a labelled span: `start` before the
//! build, `stop_and_report` once the result has been processed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{BuildResult, ResultAnnotation};

/// Timing and reporting collaborator
pub trait Instrumentation: Send + Sync {
    fn start(&self, label: &str);

    fn stop_and_report(
        &self,
        label: &str,
        result: &BuildResult,
        annotation: Option<&ResultAnnotation>,
    );
}

/// Report written for each instrumented span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationReport {
    pub label: String,
    pub build_id: Uuid,
    pub duration_ms: u64,
    pub output_files: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<ResultAnnotation>,
    pub reported_at: DateTime<Utc>,
}

/// Sink that logs spans through `tracing` and optionally writes JSON reports
pub struct TracingInstrumentation {
    started: Mutex<HashMap<String, Instant>>,
    report_dir: Option<PathBuf>,
}

impl Default for TracingInstrumentation {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingInstrumentation {
    /// Log-only sink
    pub fn new() -> Self {
        Self {
            started: Mutex::new(HashMap::new()),
            report_dir: None,
        }
    }

    /// Sink that also writes `<dir>/<label>.<build_id>.json`
    pub fn with_report_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            started: Mutex::new(HashMap::new()),
            report_dir: Some(dir.into()),
        }
    }

    fn take_start(&self, label: &str) -> Option<Instant> {
        self.started
            .lock()
            .ok()
            .and_then(|mut started| started.remove(label))
    }

    fn write_report(dir: &Path, report: &InstrumentationReport) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create instrumentation directory: {}", dir.display()))?;

        let path = dir.join(format!("{}.{}.json", report.label, report.build_id));
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write instrumentation report: {}", path.display()))?;

        Ok(path)
    }
}

impl Instrumentation for TracingInstrumentation {
    fn start(&self, label: &str) {
        if let Ok(mut started) = self.started.lock() {
            started.insert(label.to_string(), Instant::now());
        }
    }

    fn stop_and_report(
        &self,
        label: &str,
        result: &BuildResult,
        annotation: Option<&ResultAnnotation>,
    ) {
        let Some(start) = self.take_start(label) else {
            warn!(label, "Instrumentation stopped without a matching start");
            return;
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            label,
            build_id = %result.id,
            duration_ms,
            output_files = result.output_files.len(),
            "Instrumented span finished"
        );

        if let Some(ref dir) = self.report_dir {
            let report = InstrumentationReport {
                label: label.to_string(),
                build_id: result.id,
                duration_ms,
                output_files: result.output_files.len(),
                annotation: annotation.cloned(),
                reported_at: Utc::now(),
            };
            if let Err(e) = Self::write_report(dir, &report) {
                warn!(error = %e, "Failed to write instrumentation report");
            }
        }
    }
}
