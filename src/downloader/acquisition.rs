// Acquisition - drives the download collaborator for a selection

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::cleanup::CleanupManager;
use super::errors::PipelineError;
use super::models::{AcquiredArtifact, ArtifactKind, FormatDescriptor, SelectionResult};
use super::traits::DownloadService;
use super::utils::sanitize_filename;

/// Files produced by one acquisition
#[derive(Debug)]
pub enum Acquired {
    Combined(AcquiredArtifact),
    Split {
        video: AcquiredArtifact,
        audio: AcquiredArtifact,
    },
}

/// `<dest_dir>/<sanitized title>_<format id>.<ext>`
pub fn part_path(dest_dir: &Path, title: &str, format: &FormatDescriptor) -> PathBuf {
    let id = sanitize_filename(&format.id);
    dest_dir.join(format!(
        "{}_{}.{}",
        sanitize_filename(title),
        id,
        format.container.extension()
    ))
}

/// Download the selected variant(s) into `dest_dir`, sequentially. Every
/// destination path is registered with `cleanup` before its download starts.
pub async fn acquire(
    downloader: &dyn DownloadService,
    source_ref: &str,
    selection: &SelectionResult,
    dest_dir: &Path,
    title: &str,
    cleanup: &mut CleanupManager,
) -> Result<Acquired, PipelineError> {
    match selection {
        SelectionResult::Combined(format) => {
            let artifact = fetch_one(
                downloader,
                source_ref,
                format,
                dest_dir,
                title,
                ArtifactKind::Merged,
                cleanup,
            )
            .await?;
            Ok(Acquired::Combined(artifact))
        }
        SelectionResult::SplitPair { video, audio } => {
            let video = fetch_one(
                downloader,
                source_ref,
                video,
                dest_dir,
                title,
                ArtifactKind::Video,
                cleanup,
            )
            .await?;

            let audio = match fetch_one(
                downloader,
                source_ref,
                audio,
                dest_dir,
                title,
                ArtifactKind::Audio,
                cleanup,
            )
            .await
            {
                Ok(audio) => audio,
                Err(e) => {
                    discard(&video.path).await;
                    return Err(e);
                }
            };

            Ok(Acquired::Split { video, audio })
        }
        SelectionResult::NoneFound(reason) => Err(PipelineError::Acquisition(format!(
            "nothing selected: {}",
            reason
        ))),
    }
}

async fn fetch_one(
    downloader: &dyn DownloadService,
    source_ref: &str,
    format: &FormatDescriptor,
    dest_dir: &Path,
    title: &str,
    kind: ArtifactKind,
    cleanup: &mut CleanupManager,
) -> Result<AcquiredArtifact, PipelineError> {
    let path = part_path(dest_dir, title, format);
    cleanup.track(&path);

    info!(
        backend = downloader.name(),
        format = %format.id,
        path = %path.display(),
        "Downloading"
    );

    if let Err(e) = downloader.fetch(source_ref, &format.id, &path).await {
        discard(&path).await;
        return Err(PipelineError::Acquisition(format!(
            "format {}: {}",
            format.id, e
        )));
    }

    let meta = tokio::fs::metadata(&path).await.map_err(|e| {
        PipelineError::Acquisition(format!(
            "format {} produced no file at {}: {}",
            format.id,
            path.display(),
            e
        ))
    })?;

    Ok(AcquiredArtifact {
        path,
        size_bytes: meta.len(),
        kind,
    })
}

// Early removal of a part that cannot be used; the cleanup manager still
// owns the path
async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to discard partial download");
        }
    }
}
