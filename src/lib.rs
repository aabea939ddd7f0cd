//! kiln - Project scaffolding and addon-hook build orchestrator
//!
//! Wraps an external build engine with a fixed addon lifecycle and
//! provisions fresh project directories.
//!
//! # Architecture
//!
//! A build runs the same sequence every time:
//! - `preBuild` and `build` hooks on every addon that has them
//! - The external engine
//! - `postBuild` hooks, result processing, then `outputReady` hooks
//! - On any failure, `buildError` hooks before the error is returned
//!
//! # Modules
//!
//! - `adapters`: Subprocess engine and config-declared addons
//! - `core`: Orchestration logic (Addon, Builder, Orchestrator, Provisioner)
//! - `domain`: Data structures (BuildResult, ResultAnnotation)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Scaffold a project directory
//! kiln new my-app
//!
//! # Build once
//! kiln build --environment production
//!
//! # Rebuild on change
//! kiln watch
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;

// Re-export main types at crate root for convenience
pub use crate::core::{Addon, BuildOrchestrator, Builder, Hook, Project, ResultProcessor};
pub use domain::{BuildResult, ResultAnnotation};
pub use errors::SilentError;
