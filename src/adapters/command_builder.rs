//! Build engine driven as a subprocess.
//!
//! Runs the configured command line, then lists whatever it wrote into the
//! output directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use glob::Pattern;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::core::Builder;
use crate::domain::BuildResult;

use super::run_command;

/// Placeholder replaced with the output directory in command arguments
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// External engine invoked through a command line
pub struct CommandBuilder {
    command: Vec<String>,
    cleanup_command: Option<Vec<String>>,
    root: PathBuf,
    output_path: PathBuf,
    environment: String,
}

impl CommandBuilder {
    /// Create a builder running `command` in `root`
    pub fn new(command: Vec<String>, root: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            command,
            cleanup_command: None,
            root: root.into(),
            output_path: output_path.into(),
            environment: "development".to_string(),
        }
    }

    /// Create a builder from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let mut builder = Self::new(
            config.build_command.clone(),
            &config.root,
            &config.output_path,
        )
        .with_environment(config.environment.clone());
        builder.cleanup_command = config.cleanup_command.clone();
        builder
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_cleanup_command(mut self, command: Vec<String>) -> Self {
        self.cleanup_command = Some(command);
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn expanded_command(&self) -> Vec<String> {
        let output = self.output_path.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }

    /// Files under the output directory, relative to it, sorted
    fn collect_output_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/**/*",
            Pattern::escape(&self.output_path.to_string_lossy())
        );

        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("Invalid output pattern: {}", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                path.strip_prefix(&self.output_path)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect();
        files.sort();

        Ok(files)
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self, updated_files: Option<&[PathBuf]>) -> Result<BuildResult> {
        if self.command.is_empty() {
            anyhow::bail!("No build command configured; set build.command in .kiln/config.yaml");
        }

        tokio::fs::create_dir_all(&self.output_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create output directory: {}",
                    self.output_path.display()
                )
            })?;

        let started = BuildResult::new(&self.output_path);

        let mut envs = vec![
            ("KILN_ENV", self.environment.clone()),
            ("KILN_OUTPUT_PATH", self.output_path.to_string_lossy().into_owned()),
        ];
        if let Some(files) = updated_files {
            let joined = files
                .iter()
                .map(|f| f.to_string_lossy())
                .collect::<Vec<_>>()
                .join("\n");
            envs.push(("KILN_UPDATED_FILES", joined));
        }

        let stdout = run_command(&self.expanded_command(), &self.root, &envs).await?;
        if !stdout.trim().is_empty() {
            debug!(output = %stdout.trim(), "Build engine output");
        }

        let files = self.collect_output_files()?;
        info!(
            output = %self.output_path.display(),
            files = files.len(),
            "Build engine finished"
        );

        Ok(started
            .with_output_files(files)
            .with_metadata("environment", self.environment.clone().into())
            .finish())
    }

    async fn cleanup(&self) -> Result<()> {
        match self.cleanup_command {
            Some(ref command) => {
                run_command(command, &self.root, &[]).await?;
                debug!("Build engine cleanup finished");
            }
            None => debug!("No cleanup command configured"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_placeholder_expansion() {
        let builder = CommandBuilder::new(
            vec!["vite".into(), "build".into(), "--outDir={output}".into()],
            "/project",
            "/project/dist",
        );

        assert_eq!(
            builder.expanded_command(),
            vec!["vite", "build", "--outDir=/project/dist"]
        );
        assert_eq!(builder.output_path(), Path::new("/project/dist"));
    }

    #[tokio::test]
    async fn test_missing_command_fails() {
        let temp = TempDir::new().unwrap();
        let builder = CommandBuilder::new(Vec::new(), temp.path(), temp.path().join("dist"));

        let err = builder.build(None).await.unwrap_err();
        assert!(err.to_string().contains("No build command"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_collects_output_files() {
        let temp = TempDir::new().unwrap();
        let builder = CommandBuilder::new(
            vec![
                "sh".into(),
                "-c".into(),
                "mkdir -p \"$1/assets\" && echo app > \"$1/assets/app.js\" && echo \"$KILN_ENV\" > \"$1/index.html\"".into(),
                "sh".into(),
                "{output}".into(),
            ],
            temp.path(),
            temp.path().join("dist"),
        )
        .with_environment("production");

        let result = builder.build(None).await.unwrap();

        assert_eq!(
            result.output_files,
            vec![PathBuf::from("assets/app.js"), PathBuf::from("index.html")]
        );
        assert_eq!(result.metadata["environment"], "production");
        assert!(result.finished_at.is_some());
        let index = std::fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert_eq!(index.trim(), "production");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_updated_files_passed_to_engine() {
        let temp = TempDir::new().unwrap();
        let builder = CommandBuilder::new(
            vec![
                "sh".into(),
                "-c".into(),
                "printf '%s' \"$KILN_UPDATED_FILES\" > \"$KILN_OUTPUT_PATH/changed.txt\"".into(),
            ],
            temp.path(),
            temp.path().join("dist"),
        );

        let changed = vec![PathBuf::from("app/a.js"), PathBuf::from("app/b.js")];
        builder.build(Some(&changed)).await.unwrap();

        let written = std::fs::read_to_string(temp.path().join("dist/changed.txt")).unwrap();
        assert_eq!(written, "app/a.js\napp/b.js");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cleanup_runs_command() {
        let temp = TempDir::new().unwrap();
        let builder = CommandBuilder::new(vec!["true".into()], temp.path(), temp.path().join("dist"))
            .with_cleanup_command(vec!["touch".into(), "cleaned".into()]);

        builder.cleanup().await.unwrap();

        assert!(temp.path().join("cleaned").exists());
    }
}
