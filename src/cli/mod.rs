//! Command-line interface for kiln.
//!
//! Provides commands for scaffolding a project directory, building it
//! through the addon pipeline, watching for changes, and inspecting the
//! resolved configuration.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::adapters::CommandBuilder;
use crate::config::{self, ResolvedConfig};
use crate::core::provisioner::{self, Provisioned, WorkingDirectory};
use crate::core::{BuildOrchestrator, Project};
use crate::domain::{BuildResult, ResultAnnotation};
use crate::errors::SilentError;

pub mod watch;

/// kiln - Project scaffolding and addon-hook build orchestrator
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project directory
    New {
        /// Directory to create
        name: String,

        /// Only check that the directory can be used
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Write a default config into the current directory
    Init {
        /// Only check that no config exists yet
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Build the project once
    Build {
        /// Output directory (overrides config)
        #[arg(short, long)]
        output_path: Option<PathBuf>,

        /// Build environment (overrides config)
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Build, then rebuild on file changes
    Watch {
        /// Output directory (overrides config)
        #[arg(short, long)]
        output_path: Option<PathBuf>,

        /// Build environment (overrides config)
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::New { name, dry_run } => new_project(&name, dry_run),
            Commands::Init { dry_run } => init_project(dry_run),
            Commands::Build {
                output_path,
                environment,
            } => build_once(output_path, environment).await,
            Commands::Watch {
                output_path,
                environment,
            } => {
                let config = load_config(output_path, environment)?;
                watch::run(&config).await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Provision a directory and write the default config into it
fn new_project(name: &str, dry_run: bool) -> Result<()> {
    let cwd = WorkingDirectory::current().context("Failed to determine current directory")?;

    match provisioner::run(&cwd, Path::new(name), dry_run)? {
        Provisioned::Validated => {
            println!("✅ '{}' is available (dry run, nothing created)", name);
        }
        Provisioned::Entered(guard) => {
            let config_path = config::write_default_config(guard.working_directory().path())?;
            let previous = guard.persist();

            println!("✅ Created project in {}", name);
            println!("   Config: {}", config_path.display());
            println!("\n📌 Next steps:");
            println!("   cd {}", name);
            println!("   # edit .kiln/config.yaml, then");
            println!("   kiln build");
            tracing::debug!(previous = %previous.display(), "Left previous working directory");
        }
    }

    Ok(())
}

fn init_project(dry_run: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let existing = cwd.join(config::CONFIG_DIR).join(config::CONFIG_FILE);

    if dry_run {
        if existing.exists() {
            return Err(SilentError::new(format!(
                "Config already exists at {}",
                existing.display()
            ))
            .into());
        }
        println!("✅ No config yet in {} (dry run)", cwd.display());
        return Ok(());
    }

    let path = config::write_default_config(&cwd)?;
    println!("✅ Created config: {}", path.display());
    Ok(())
}

/// Load config and apply command-line overrides
fn load_config(output_path: Option<PathBuf>, environment: Option<String>) -> Result<ResolvedConfig> {
    Ok(config::config()?.clone().with_overrides(output_path, environment))
}

/// Wire a project, engine and orchestrator from config
pub fn orchestrator_for(config: &ResolvedConfig) -> Result<BuildOrchestrator> {
    let project = Project::from_config(config)?;
    let builder = CommandBuilder::from_config(config);
    Ok(BuildOrchestrator::new(Arc::new(project), Arc::new(builder)))
}

async fn build_once(output_path: Option<PathBuf>, environment: Option<String>) -> Result<()> {
    let config = load_config(output_path, environment)?;
    build_with_config(&config).await
}

/// Run one build and always clean up the engine afterwards
async fn build_with_config(config: &ResolvedConfig) -> Result<()> {
    let orchestrator = orchestrator_for(config)?;

    println!("🔨 Building ({})", config.environment);

    let outcome = until_interrupted(
        orchestrator.build(None, Some(ResultAnnotation::initial())),
        tokio::signal::ctrl_c(),
    )
    .await;
    let cleanup = orchestrator.cleanup().await;

    match outcome {
        Some(Ok(result)) => {
            cleanup?;
            print_summary(&result);
            Ok(())
        }
        Some(Err(e)) => {
            if let Err(cleanup_err) = cleanup {
                warn!(error = %cleanup_err, "Cleanup after failed build also failed");
            }
            Err(e)
        }
        None => {
            warn!("Interrupted, cleaning up");
            cleanup?;
            Err(SilentError::new("Build interrupted").into())
        }
    }
}

/// Drive `work` to completion unless `interrupt` resolves first
pub(crate) async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future,
) -> Option<T> {
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => None,
    }
}

pub(crate) fn print_summary(result: &BuildResult) {
    let duration = result
        .duration_ms()
        .map(|ms| format!(" in {}ms", ms))
        .unwrap_or_default();

    println!(
        "✅ Built {} file(s) into {}{}",
        result.output_files.len(),
        result.directory.display(),
        duration
    );
}

fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("Project root: {}", config.root.display());
    match config.config_file {
        Some(ref path) => println!("Config file:  {}", path.display()),
        None => println!("Config file:  (none, using defaults)"),
    }
    println!("Environment:  {}", config.environment);
    println!("Output path:  {}", config.output_path.display());
    if config.build_command.is_empty() {
        println!("Build:        (not configured)");
    } else {
        println!("Build:        {}", config.build_command.join(" "));
    }
    if let Some(ref cleanup) = config.cleanup_command {
        println!("Cleanup:      {}", cleanup.join(" "));
    }
    println!(
        "Instrument:   {} ({})",
        if config.instrumentation.enabled { "on" } else { "off" },
        config.instrumentation.directory.display()
    );

    if config.addons.is_empty() {
        println!("Addons:       (none)");
    } else {
        println!("Addons:");
        for addon in &config.addons {
            let hooks: Vec<&str> = addon.hooks.keys().map(String::as_str).collect();
            println!("  - {} [{}]", addon.name, hooks.join(", "));
        }
    }

    Ok(())
}
