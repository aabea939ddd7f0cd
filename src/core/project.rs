//! The project a build runs for.
//!
//! Owns the ordered addon list and the instrumentation sink. The
//! orchestrator only reads from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::adapters::CommandAddon;
use crate::config::ResolvedConfig;

use super::addon::Addon;
use super::instrumentation::{Instrumentation, TracingInstrumentation};

/// A project with its registered addons
pub struct Project {
    root: PathBuf,
    addons: Vec<Arc<dyn Addon>>,
    instrumentation: Arc<dyn Instrumentation>,
}

impl Project {
    /// Create a project with no addons
    pub fn new(root: impl Into<PathBuf>, instrumentation: Arc<dyn Instrumentation>) -> Self {
        Self {
            root: root.into(),
            addons: Vec::new(),
            instrumentation,
        }
    }

    /// Build a project from resolved configuration
    ///
    /// Addons are registered in the order they appear in the config file.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let instrumentation: Arc<dyn Instrumentation> = if config.instrumentation.enabled {
            Arc::new(TracingInstrumentation::with_report_dir(
                &config.instrumentation.directory,
            ))
        } else {
            Arc::new(TracingInstrumentation::new())
        };

        let mut project = Self::new(&config.root, instrumentation);
        for addon in &config.addons {
            project.register(Arc::new(CommandAddon::from_config(addon, &config.root)?));
        }

        Ok(project)
    }

    /// Append an addon to the registration order
    pub fn register(&mut self, addon: Arc<dyn Addon>) {
        self.addons.push(addon);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_addon(mut self, addon: Arc<dyn Addon>) -> Self {
        self.register(addon);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn addons(&self) -> &[Arc<dyn Addon>] {
        &self.addons
    }

    pub fn instrumentation(&self) -> &Arc<dyn Instrumentation> {
        &self.instrumentation
    }
}
