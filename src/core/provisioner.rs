//! Directory provisioning for new projects.
//!
//! Ensures a target directory exists and is empty, then moves the process
//! into it. The process working directory is global state, so every change
//! goes through a [`DirectoryGuard`] that puts it back when dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from provisioning a directory
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Directory '{}' already exists.", path.display())]
    DirectoryExists { path: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProvisionError {
    /// Precondition failures print without a cause chain
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::DirectoryExists { .. })
    }
}

/// An explicit working-directory context
///
/// Relative paths are resolved against this value rather than whatever the
/// process happens to be in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    path: PathBuf,
}

impl WorkingDirectory {
    /// Capture the process working directory
    pub fn current() -> io::Result<Self> {
        Ok(Self {
            path: std::env::current_dir()?,
        })
    }

    /// Use an explicit directory as the context
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a path against this directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.path.join(path)
        }
    }

    /// Move the process into `dir`, returning a guard that moves it back
    pub fn enter(&self, dir: &Path) -> io::Result<DirectoryGuard> {
        let target = self.resolve(dir);
        let previous = std::env::current_dir()?;

        std::env::set_current_dir(&target)?;
        debug!(from = %previous.display(), to = %target.display(), "Changed working directory");

        Ok(DirectoryGuard {
            previous,
            current: WorkingDirectory::at(target),
            active: true,
        })
    }
}

/// Scoped working-directory change
///
/// Restores the previous directory on drop unless [`persist`](Self::persist)
/// was called.
#[derive(Debug)]
pub struct DirectoryGuard {
    previous: PathBuf,
    current: WorkingDirectory,
    active: bool,
}

impl DirectoryGuard {
    /// Directory the process was in before entering
    pub fn previous(&self) -> &Path {
        &self.previous
    }

    /// Context for the directory that was entered
    pub fn working_directory(&self) -> &WorkingDirectory {
        &self.current
    }

    /// Keep the process in the new directory; returns the prior one
    pub fn persist(mut self) -> PathBuf {
        self.active = false;
        std::mem::take(&mut self.previous)
    }

    /// Restore the previous directory now, reporting failures
    pub fn restore(mut self) -> io::Result<()> {
        self.active = false;
        std::env::set_current_dir(&self.previous)
    }
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!(
                previous = %self.previous.display(),
                error = %e,
                "Failed to restore working directory"
            );
        }
    }
}

/// Outcome of a provisioning run
#[derive(Debug)]
pub enum Provisioned {
    /// Dry run: preconditions hold, nothing was touched
    Validated,

    /// Directory is ready and the process is inside it
    Entered(DirectoryGuard),
}

/// Provision `directory` relative to `cwd`
///
/// In dry-run mode only the existence check runs. Otherwise the directory
/// is created (or an empty one reused) and entered.
pub fn run(
    cwd: &WorkingDirectory,
    directory: &Path,
    dry_run: bool,
) -> Result<Provisioned, ProvisionError> {
    let target = cwd.resolve(directory);

    if dry_run {
        if target.exists() && !is_empty_dir(&target)? {
            return Err(ProvisionError::DirectoryExists {
                path: directory.to_path_buf(),
            });
        }
        debug!(directory = %directory.display(), "Dry run: directory is available");
        return Ok(Provisioned::Validated);
    }

    match fs::create_dir(&target) {
        Ok(()) => info!(directory = %directory.display(), "Created directory"),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if !is_empty_dir(&target)? {
                return Err(ProvisionError::DirectoryExists {
                    path: directory.to_path_buf(),
                });
            }
            info!(directory = %directory.display(), "Reusing empty directory");
        }
        Err(e) => return Err(e.into()),
    }

    let guard = cwd.enter(&target)?;
    Ok(Provisioned::Entered(guard))
}

fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}
