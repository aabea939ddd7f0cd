//! Core build and scaffolding logic.
//!
//! This module contains:
//! - Addon: Hook interface and dispatch
//! - Builder: External engine and result-processor contracts
//! - Instrumentation: Build span timing
//! - Project: Addon registry
//! - Orchestrator: Hook sequencing around a build
//! - Provisioner: Directory creation and working-directory scoping

pub mod addon;
pub mod builder;
pub mod instrumentation;
pub mod orchestrator;
pub mod project;
pub mod provisioner;

// Re-export commonly used types
pub use addon::{implementors, Addon, Hook, HookCall};
pub use builder::{Builder, PassThrough, ResultProcessor};
pub use instrumentation::{Instrumentation, InstrumentationReport, TracingInstrumentation};
pub use orchestrator::{BuildOrchestrator, BuildPhase, BUILD_LABEL};
pub use project::Project;
pub use provisioner::{DirectoryGuard, ProvisionError, Provisioned, WorkingDirectory};
