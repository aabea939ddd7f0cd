//! Domain types for kiln.
//!
//! This module contains the data threaded through a build:
//! - BuildResult: Engine output handed to addons
//! - ResultAnnotation: Why a build happened

pub mod annotation;
pub mod build_result;

// Re-export commonly used types
pub use annotation::{BuildKind, ResultAnnotation};
pub use build_result::BuildResult;
