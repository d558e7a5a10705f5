//! Watch-mode builder wrapping the build command.
//!
//! Every batch of file changes triggers one full rebuild through
//! [`build_with_result`](crate::commands::build::build_with_result); failures
//! are reported and the loop keeps waiting for the next change.

use crate::commands::build;
use crate::dev::FileChange;
use crate::error::Result;
use crate::ui;
use bale_config::BuildConfig;
use std::time::Duration;
use tokio::sync::mpsc;

/// Rebuilds one config whenever its sources change.
pub struct DevBuilder {
    config: BuildConfig,
}

impl DevBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Rebuild after each batch of changes until the channel closes.
    ///
    /// Changes arriving within the debounce window of the first one are
    /// folded into the same rebuild.
    pub async fn rebuild_on_change(&self, mut changes: mpsc::Receiver<FileChange>) -> Result<()> {
        let window = Duration::from_millis(self.config.dev_server.debounce_ms);

        while let Some(first) = changes.recv().await {
            tokio::time::sleep(window).await;
            let batch = drain(first, &mut changes);

            match batch.as_slice() {
                [change] => ui::info(&format!("File changed: {}", change.path().display())),
                _ => ui::info(&format!("{} files changed", batch.len())),
            }
            tracing::debug!(changes = ?batch, "rebuilding");

            if let Err(err) = build::build_with_result(&self.config).await {
                build::report_error(err);
            }
        }

        Ok(())
    }
}

/// Collect everything already queued behind `first`, one entry per path.
fn drain(first: FileChange, changes: &mut mpsc::Receiver<FileChange>) -> Vec<FileChange> {
    let mut batch = vec![first];
    while let Ok(change) = changes.try_recv() {
        if !batch.iter().any(|seen| seen.path() == change.path()) {
            batch.push(change);
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn drain_folds_duplicate_paths() {
        let (tx, mut rx) = mpsc::channel(8);
        let a = PathBuf::from("/project/src/a.js");
        let b = PathBuf::from("/project/src/b.js");
        tx.send(FileChange::Modified(a.clone())).await.unwrap();
        tx.send(FileChange::Created(b.clone())).await.unwrap();
        tx.send(FileChange::Modified(b.clone())).await.unwrap();

        let batch = drain(FileChange::Modified(a.clone()), &mut rx);
        assert_eq!(
            batch,
            [FileChange::Modified(a), FileChange::Created(b)]
        );
    }

    #[tokio::test]
    async fn loop_ends_when_watcher_goes_away() {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        let builder = DevBuilder::new(BuildConfig::default());
        builder.rebuild_on_change(rx).await.unwrap();
    }
}
