// Packaging stage - one archive for a playlist batch

use std::path::{Path, PathBuf};

use tracing::info;

use super::errors::PipelineError;
use super::models::{AcquiredArtifact, ArtifactKind, BatchItem};
use super::traits::ArchiveService;

/// Store every item under its display name in an archive at `archive_path`.
/// The archiver either produces the whole archive or nothing.
pub async fn package(
    archiver: &dyn ArchiveService,
    items: &[BatchItem],
    archive_path: &Path,
) -> Result<AcquiredArtifact, PipelineError> {
    if items.is_empty() {
        return Err(PipelineError::Packaging("no items to package".to_string()));
    }

    let entries: Vec<(PathBuf, String)> = items
        .iter()
        .map(|item| (item.artifact.path.clone(), item.display_name.clone()))
        .collect();

    info!(
        backend = archiver.name(),
        entries = entries.len(),
        path = %archive_path.display(),
        "Packaging"
    );

    archiver
        .create(&entries, archive_path)
        .await
        .map_err(|e| PipelineError::Packaging(e.to_string()))?;

    let meta = tokio::fs::metadata(archive_path).await.map_err(|e| {
        PipelineError::Packaging(format!(
            "no archive at {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    Ok(AcquiredArtifact {
        path: archive_path.to_path_buf(),
        size_bytes: meta.len(),
        kind: ArtifactKind::Archive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::FakeArchiver;
    use tempfile::TempDir;

    fn item(dir: &Path, name: &str) -> BatchItem {
        let path = dir.join(name);
        std::fs::write(&path, b"0123456789").unwrap();
        BatchItem {
            artifact: AcquiredArtifact {
                path,
                size_bytes: 10,
                kind: ArtifactKind::Merged,
            },
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_package_passes_display_names() {
        let temp = TempDir::new().unwrap();
        let items = vec![item(temp.path(), "one.mp4"), item(temp.path(), "two.mp4")];
        let archiver = FakeArchiver::new();
        let out = temp.path().join("list.zip");

        let archive = package(&archiver, &items, &out).await.unwrap();

        assert_eq!(archive.kind, ArtifactKind::Archive);
        assert_eq!(archive.size_bytes, 20);
        assert_eq!(
            archiver.last_names(),
            vec!["one.mp4".to_string(), "two.mp4".to_string()]
        );
    }

    #[tokio::test]
    async fn test_package_failure() {
        let temp = TempDir::new().unwrap();
        let items = vec![item(temp.path(), "one.mp4")];
        let out = temp.path().join("list.zip");

        let err = package(&FakeArchiver::failing(), &items, &out)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Packaging(_)));
        assert!(!out.exists());
    }
}
