//! Results produced by the external build engine.
//!
//! The orchestrator threads a `BuildResult` through `postBuild`, result
//! processing and `outputReady` without looking inside it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output of a single build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    /// Unique identifier for this build
    pub id: Uuid,

    /// Directory the engine wrote into
    pub directory: PathBuf,

    /// Files found in the output directory, relative to it
    #[serde(default)]
    pub output_files: Vec<PathBuf>,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Engine- or processor-specific data
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl BuildResult {
    /// Create a result for a build that starts now
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            directory: directory.into(),
            output_files: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach the list of output files
    pub fn with_output_files(mut self, files: Vec<PathBuf>) -> Self {
        self.output_files = files;
        self
    }

    /// Mark the build as finished now
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Wall-clock duration in milliseconds, if finished
    pub fn duration_ms(&self) -> Option<u64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfinished_has_no_duration() {
        let result = BuildResult::new("dist");
        assert!(result.duration_ms().is_none());
        assert!(result.finish().duration_ms().is_some());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let result = BuildResult::new("dist").with_metadata("env", serde_json::json!("production"));

        let json = serde_json::to_string(&result).unwrap();
        let parsed: BuildResult = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, result.id);
        assert_eq!(parsed.metadata["env"], "production");
    }
}
