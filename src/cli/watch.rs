//! `kiln watch`: rebuild on file changes.
//!
//! Runs an initial build, then feeds debounced change batches back into the
//! orchestrator as rebuilds. Ctrl+C stops watching and cleans up the engine.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{ResolvedConfig, CONFIG_DIR};
use crate::domain::ResultAnnotation;

use super::{orchestrator_for, print_summary, until_interrupted};

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Directories under the project root that never trigger a rebuild
fn ignored_dirs(config: &ResolvedConfig) -> Vec<PathBuf> {
    vec![
        config.output_path.clone(),
        config.root.join(CONFIG_DIR),
        config.root.join(".git"),
        config.root.join("node_modules"),
    ]
}

/// Changed paths relative to `root`, minus ignored directories, deduplicated
fn relevant_changes(
    root: &Path,
    ignored: &[PathBuf],
    paths: impl IntoIterator<Item = PathBuf>,
) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| !ignored.iter().any(|dir| path.starts_with(dir)))
        .map(|path| {
            path.strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or(path)
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Watch the project until interrupted
pub async fn run(config: &ResolvedConfig) -> Result<()> {
    let orchestrator = orchestrator_for(config)?;
    let root = orchestrator.project().root().to_path_buf();

    let initial = until_interrupted(
        orchestrator.build(None, Some(ResultAnnotation::initial())),
        tokio::signal::ctrl_c(),
    )
    .await;
    match initial {
        Some(Ok(result)) => print_summary(&result),
        Some(Err(e)) => error!(error = %e, "Initial build failed; waiting for changes"),
        None => {
            info!("Interrupted during initial build");
            return orchestrator.cleanup().await;
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| {
        let _ = tx.send(res);
    })?;
    debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;

    let ignored = ignored_dirs(config);
    info!(root = %root.display(), "Watching for changes");
    println!("👀 Watching {} (Ctrl+C to stop)", root.display());

    loop {
        let batch = tokio::select! {
            batch = rx.recv() => batch,
            _ = tokio::signal::ctrl_c() => {
                info!("Watcher stopping...");
                break;
            }
        };
        let Some(batch) = batch else {
            warn!("Watcher channel closed");
            break;
        };
        let events = match batch {
            Ok(events) => events,
            Err(e) => {
                warn!(error = ?e, "Watcher error");
                continue;
            }
        };

        let changed = relevant_changes(
            &root,
            &ignored,
            events.into_iter().map(|event| event.path),
        );
        if changed.is_empty() {
            continue;
        }

        info!(files = changed.len(), "Change detected, rebuilding");
        let annotation = ResultAnnotation::rebuild("watcher", changed.clone());
        let rebuilt = until_interrupted(
            orchestrator.build(Some(&changed), Some(annotation)),
            tokio::signal::ctrl_c(),
        )
        .await;
        match rebuilt {
            Some(Ok(result)) => print_summary(&result),
            Some(Err(e)) => error!(error = %e, "Rebuild failed"),
            None => {
                info!("Interrupted during rebuild, watcher stopping...");
                break;
            }
        }
    }

    drop(debouncer);
    orchestrator.cleanup().await
}
