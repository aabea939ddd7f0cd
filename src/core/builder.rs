//! Build engine and result-processing contracts.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::BuildResult;

/// External build engine
#[async_trait]
pub trait Builder: Send + Sync {
    /// Produce build output; `updated_files` lists changes for a rebuild
    async fn build(&self, updated_files: Option<&[PathBuf]>) -> Result<BuildResult>;

    /// Release anything the engine holds on to
    async fn cleanup(&self) -> Result<()>;
}

/// Transform applied between `postBuild` and `outputReady`
pub trait ResultProcessor: Send + Sync {
    fn process(&self, result: BuildResult) -> Result<BuildResult>;
}

/// Identity processor
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ResultProcessor for PassThrough {
    fn process(&self, result: BuildResult) -> Result<BuildResult> {
        Ok(result)
    }
}

impl<F> ResultProcessor for F
where
    F: Fn(BuildResult) -> Result<BuildResult> + Send + Sync,
{
    fn process(&self, result: BuildResult) -> Result<BuildResult> {
        self(result)
    }
}
