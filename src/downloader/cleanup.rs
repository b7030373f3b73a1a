// Lifecycle of temporary paths created while serving one request

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::errors::CleanupWarning;

/// Registry of every path a request created. Paths are registered before
/// the stage that writes them runs, so partially written files are covered.
///
/// `finish` consumes the registry; if a request is dropped before that, the
/// `Drop` impl removes the paths synchronously.
#[derive(Debug, Default)]
pub struct CleanupManager {
    paths: Vec<PathBuf>,
    finished: bool,
}

impl CleanupManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove every tracked path, newest first. Already-absent paths are
    /// fine; other failures are logged and returned, never raised.
    pub async fn finish(mut self) -> Vec<CleanupWarning> {
        self.finished = true;
        let paths = std::mem::take(&mut self.paths);
        let mut warnings = Vec::new();

        for path in paths.iter().rev() {
            if let Err(error) = remove_path(path).await {
                let warning = CleanupWarning {
                    path: path.clone(),
                    error,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
        }

        debug!(removed = paths.len() - warnings.len(), "Cleanup finished");
        warnings
    }
}

impl Drop for CleanupManager {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        for path in self.paths.iter().rev() {
            if let Err(error) = remove_path_sync(path) {
                warn!(path = %path.display(), %error, "Cleanup on drop failed");
            }
        }
    }
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };
    ignore_missing(result)
}

fn remove_path_sync(path: &Path) -> std::io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    ignore_missing(result)
}

fn ignore_missing(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_removes_files_and_dirs() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("part.mp4");
        let dir = temp.path().join("batch");
        std::fs::write(&file, b"data").unwrap();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/item.mp4"), b"data").unwrap();

        let mut cleanup = CleanupManager::new();
        cleanup.track(&dir);
        cleanup.track(&file);
        let warnings = cleanup.finish().await;

        assert!(warnings.is_empty());
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_missing_paths_are_not_warnings() {
        let temp = TempDir::new().unwrap();
        let mut cleanup = CleanupManager::new();
        cleanup.track(temp.path().join("never-written.m4a"));
        cleanup.track(temp.path().join("never-written.m4a"));
        assert_eq!(cleanup.paths().len(), 1);
        assert!(cleanup.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_removal_is_reported_and_rest_continue() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("video.mp4");
        let last = temp.path().join("audio.m4a");
        std::fs::write(&first, b"data").unwrap();
        std::fs::write(&last, b"data").unwrap();
        // A regular file used as a directory component fails with
        // NotADirectory, not NotFound
        let blocked = first.join("child.mp4");

        let mut cleanup = CleanupManager::new();
        cleanup.track(&first);
        cleanup.track(&blocked);
        cleanup.track(&last);
        let warnings = cleanup.finish().await;

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, blocked);
        assert!(!first.exists());
        assert!(!last.exists());
    }

    #[test]
    fn test_drop_removes_unfinished() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("orphan.webm");
        std::fs::write(&file, b"data").unwrap();
        {
            let mut cleanup = CleanupManager::new();
            cleanup.track(&file);
        }
        assert!(!file.exists());
    }
}
