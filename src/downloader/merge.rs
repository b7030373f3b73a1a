// Merge stage - remux separate video and audio parts into one file

use std::path::{Path, PathBuf};

use tracing::info;

use super::errors::PipelineError;
use super::models::{AcquiredArtifact, ArtifactKind};
use super::traits::RemuxService;
use super::utils::sanitize_filename;

/// Container of merged output
pub const MERGED_EXTENSION: &str = "mp4";

/// `<dest_dir>/<sanitized title>.mp4`
pub fn merged_path(dest_dir: &Path, title: &str) -> PathBuf {
    dest_dir.join(format!("{}.{}", sanitize_filename(title), MERGED_EXTENSION))
}

/// One atomic remux call. On failure nothing usable is left at
/// `output_path`; the caller still owns cleanup of inputs and output.
pub async fn merge(
    remuxer: &dyn RemuxService,
    video: &AcquiredArtifact,
    audio: &AcquiredArtifact,
    output_path: &Path,
) -> Result<AcquiredArtifact, PipelineError> {
    info!(
        backend = remuxer.name(),
        video = %video.path.display(),
        audio = %audio.path.display(),
        "Merging"
    );

    remuxer
        .combine(&video.path, &audio.path, output_path)
        .await
        .map_err(|e| PipelineError::Merge(e.to_string()))?;

    let meta = tokio::fs::metadata(output_path).await.map_err(|e| {
        PipelineError::Merge(format!(
            "no merged output at {}: {}",
            output_path.display(),
            e
        ))
    })?;

    Ok(AcquiredArtifact {
        path: output_path.to_path_buf(),
        size_bytes: meta.len(),
        kind: ArtifactKind::Merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::FakeRemuxer;
    use tempfile::TempDir;

    fn artifact(dir: &Path, name: &str, kind: ArtifactKind) -> AcquiredArtifact {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        AcquiredArtifact {
            path,
            size_bytes: 100,
            kind,
        }
    }

    #[tokio::test]
    async fn test_merge_reports_output_size() {
        let temp = TempDir::new().unwrap();
        let video = artifact(temp.path(), "v.mp4", ArtifactKind::Video);
        let audio = artifact(temp.path(), "a.m4a", ArtifactKind::Audio);
        let out = merged_path(temp.path(), "Clip");

        let merged = merge(&FakeRemuxer::new(), &video, &audio, &out).await.unwrap();

        assert_eq!(merged.kind, ArtifactKind::Merged);
        assert_eq!(merged.size_bytes, 200);
        assert_eq!(merged.path, temp.path().join("Clip.mp4"));
    }

    #[tokio::test]
    async fn test_merge_failure_carries_message() {
        let temp = TempDir::new().unwrap();
        let video = artifact(temp.path(), "v.mp4", ArtifactKind::Video);
        let audio = artifact(temp.path(), "a.m4a", ArtifactKind::Audio);
        let out = merged_path(temp.path(), "Clip");

        let err = merge(&FakeRemuxer::failing(), &video, &audio, &out)
            .await
            .unwrap_err();

        match err {
            PipelineError::Merge(msg) => assert!(msg.contains("remux exploded")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
