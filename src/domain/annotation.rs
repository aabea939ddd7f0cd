//! Annotations describing why a build was triggered.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Why a build happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildKind {
    /// First build of a session
    Initial,

    /// Follow-up build caused by a change
    Rebuild,
}

impl Default for BuildKind {
    fn default() -> Self {
        Self::Initial
    }
}

/// Annotation threaded through `preBuild` and the instrumentation report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAnnotation {
    #[serde(rename = "type")]
    pub kind: BuildKind,

    /// What triggered a rebuild (e.g. "watcher")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// First file in the change set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_files: Vec<PathBuf>,
}

impl ResultAnnotation {
    /// Annotation for the first build
    pub fn initial() -> Self {
        Self::default()
    }

    /// Annotation for a rebuild caused by file changes
    pub fn rebuild(reason: impl Into<String>, changed_files: Vec<PathBuf>) -> Self {
        Self {
            kind: BuildKind::Rebuild,
            reason: Some(reason.into()),
            primary_file: changed_files.first().cloned(),
            changed_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_sets_primary_file() {
        let annotation = ResultAnnotation::rebuild(
            "watcher",
            vec![PathBuf::from("app/a.js"), PathBuf::from("app/b.js")],
        );

        assert_eq!(annotation.kind, BuildKind::Rebuild);
        assert_eq!(annotation.primary_file, Some(PathBuf::from("app/a.js")));
        assert_eq!(annotation.changed_files.len(), 2);
    }

    #[test]
    fn test_initial_serializes_type_only() {
        let json = serde_json::to_value(ResultAnnotation::initial()).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "initial" }));
    }
}
