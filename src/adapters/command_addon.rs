//! Addons declared in config, one command line per hook.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::config::AddonConfig;
use crate::core::{Addon, Hook};
use crate::domain::{BuildKind, BuildResult, ResultAnnotation};

use super::run_command;

/// Addon whose hooks are external commands run in the project root
#[derive(Debug, Clone)]
pub struct CommandAddon {
    name: String,
    root: PathBuf,
    hooks: BTreeMap<Hook, Vec<String>>,
}

impl CommandAddon {
    /// Create an addon with no hooks
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            hooks: BTreeMap::new(),
        }
    }

    /// Register a command for `hook`
    pub fn with_hook(mut self, hook: Hook, command: Vec<String>) -> Self {
        self.hooks.insert(hook, command);
        self
    }

    /// Validate a config entry and turn it into an addon
    pub fn from_config(config: &AddonConfig, root: &Path) -> Result<Self> {
        let mut addon = Self::new(config.name.clone(), root);

        for (hook_name, command) in &config.hooks {
            let hook = Hook::from_name(hook_name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Addon '{}' declares unknown hook '{}'",
                    config.name,
                    hook_name
                )
            })?;
            if command.is_empty() {
                anyhow::bail!(
                    "Addon '{}' has an empty command for hook '{}'",
                    config.name,
                    hook_name
                );
            }
            addon.hooks.insert(hook, command.clone());
        }

        Ok(addon)
    }

    async fn run_hook(&self, hook: Hook, mut envs: Vec<(&'static str, String)>) -> Result<()> {
        let Some(command) = self.hooks.get(&hook) else {
            return Ok(());
        };

        envs.push(("KILN_HOOK", hook.name().to_string()));
        envs.push(("KILN_ADDON", self.name.clone()));

        let stdout = run_command(command, &self.root, &envs).await?;
        debug!(addon = %self.name, %hook, output = %stdout.trim(), "Addon hook finished");

        Ok(())
    }
}

fn result_envs(result: &BuildResult) -> Vec<(&'static str, String)> {
    vec![
        ("KILN_OUTPUT_PATH", result.directory.to_string_lossy().into_owned()),
        ("KILN_BUILD_ID", result.id.to_string()),
    ]
}

#[async_trait]
impl Addon for CommandAddon {
    fn name(&self) -> &str {
        &self.name
    }

    fn implements(&self, hook: Hook) -> bool {
        self.hooks.contains_key(&hook)
    }

    async fn pre_build(&self, annotation: Option<&ResultAnnotation>) -> Result<()> {
        let kind = match annotation.map(|a| a.kind) {
            Some(BuildKind::Rebuild) => "rebuild",
            _ => "initial",
        };
        let changed = annotation
            .map(|a| {
                a.changed_files
                    .iter()
                    .map(|f| f.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        self.run_hook(
            Hook::PreBuild,
            vec![
                ("KILN_BUILD_TYPE", kind.to_string()),
                ("KILN_CHANGED_FILES", changed),
            ],
        )
        .await
    }

    async fn build(&self) -> Result<()> {
        self.run_hook(Hook::Build, Vec::new()).await
    }

    async fn post_build(&self, result: &BuildResult) -> Result<()> {
        self.run_hook(Hook::PostBuild, result_envs(result)).await
    }

    async fn output_ready(&self, result: &BuildResult) -> Result<()> {
        self.run_hook(Hook::OutputReady, result_envs(result)).await
    }

    async fn build_error(&self, error: &anyhow::Error) -> Result<()> {
        self.run_hook(Hook::BuildError, vec![("KILN_BUILD_ERROR", format!("{:#}", error))])
            .await
    }
}
