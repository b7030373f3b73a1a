// Pipeline - one request from catalog to delivery
//
// fetch -> select -> acquire -> merge -> size gate -> deliver, with the
// cleanup manager finishing on every exit path. Playlists run the item
// chain per entry, then package, gate and deliver the archive.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::acquisition::{acquire, Acquired};
use super::cleanup::CleanupManager;
use super::config::PipelineConfig;
use super::errors::{NotificationCategory, PipelineError};
use super::format_selector::FormatSelector;
use super::merge::{merge, merged_path};
use super::models::{
    AcquiredArtifact, BatchItem, BatchResult, Catalog, DeliveryReport, DownloadRequest,
    SelectionResult, SkippedItem,
};
use super::packaging::package;
use super::traits::{
    ArchiveService, DeliveryService, DownloadService, MetadataService, RemuxService,
};
use super::utils::sanitize_filename;

/// The collaborators a pipeline calls
#[derive(Clone)]
pub struct Services {
    pub metadata: Arc<dyn MetadataService>,
    pub downloader: Arc<dyn DownloadService>,
    pub remuxer: Arc<dyn RemuxService>,
    pub archiver: Arc<dyn ArchiveService>,
    pub delivery: Arc<dyn DeliveryService>,
}

/// Blocks delivery of an artifact above `limit`
pub fn size_gate(artifact: &AcquiredArtifact, limit: Option<u64>) -> Result<(), PipelineError> {
    match limit {
        Some(limit) if artifact.size_bytes > limit => Err(PipelineError::Oversize {
            size: artifact.size_bytes,
            limit,
        }),
        _ => Ok(()),
    }
}

/// Processes requests. Holds no per-request state, so one instance can
/// serve concurrent requests behind an `Arc`.
pub struct Pipeline {
    config: PipelineConfig,
    services: Services,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, services: Services) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Serve one request. Failures are reported to the client as a
    /// notification category and returned; temporary files are removed
    /// either way.
    pub async fn handle(&self, request: &DownloadRequest) -> Result<DeliveryReport, PipelineError> {
        let mut cleanup = CleanupManager::new();
        let result = self.run(request, &mut cleanup).await;

        if let Err(e) = &result {
            warn!(source = %request.source_ref, error = %e, "Request failed");
            self.notify(e.category()).await;
        }

        let warnings = cleanup.finish().await;
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "Some temporary files could not be removed");
        }

        result
    }

    async fn run(
        &self,
        request: &DownloadRequest,
        cleanup: &mut CleanupManager,
    ) -> Result<DeliveryReport, PipelineError> {
        info!(
            source = %request.source_ref,
            backend = self.services.metadata.name(),
            "Fetching catalog"
        );
        let catalog = self
            .services
            .metadata
            .fetch(&request.source_ref)
            .await
            .map_err(PipelineError::CatalogFetch)?;

        let request_dir = self.config.work_dir.join(Uuid::new_v4().to_string());
        cleanup.track(&request_dir);
        tokio::fs::create_dir_all(&request_dir).await.map_err(|e| {
            PipelineError::Acquisition(format!(
                "cannot create {}: {}",
                request_dir.display(),
                e
            ))
        })?;

        let target_height = request.target_height.unwrap_or(self.config.target_height);

        if catalog.is_batch() {
            self.run_batch(request, &catalog, target_height, &request_dir, cleanup)
                .await
        } else {
            self.run_single(request, &catalog, target_height, &request_dir, cleanup)
                .await
        }
    }

    async fn run_single(
        &self,
        request: &DownloadRequest,
        catalog: &Catalog,
        target_height: u32,
        request_dir: &Path,
        cleanup: &mut CleanupManager,
    ) -> Result<DeliveryReport, PipelineError> {
        let item = catalog.single_item();
        let source = item.source_ref.as_deref().unwrap_or(&request.source_ref);

        let artifact = self
            .process_item(item, source, target_height, request_dir, cleanup)
            .await?;
        size_gate(&artifact, self.config.max_file_size)?;

        let display_name = item.title.clone();
        let delivered = self.deliver(&artifact.path, &display_name).await;

        Ok(DeliveryReport {
            kind: artifact.kind,
            size_bytes: artifact.size_bytes,
            display_name,
            attempted: 1,
            skipped: Vec::new(),
            delivered,
        })
    }

    async fn run_batch(
        &self,
        request: &DownloadRequest,
        catalog: &Catalog,
        target_height: u32,
        request_dir: &Path,
        cleanup: &mut CleanupManager,
    ) -> Result<DeliveryReport, PipelineError> {
        let entries = catalog.entries.as_deref().unwrap_or_default();
        let limit = self.config.batch_limit;
        if entries.len() > limit {
            info!(total = entries.len(), limit, "Playlist truncated to batch limit");
        }

        let batch_dir = tempfile::Builder::new()
            .prefix("batch-")
            .tempdir_in(request_dir)
            .map_err(|e| PipelineError::Acquisition(format!("cannot create batch dir: {}", e)))?
            .keep();
        cleanup.track(&batch_dir);

        let mut batch = BatchResult::default();
        for (index, entry) in entries.iter().take(limit).enumerate() {
            batch.attempted += 1;
            let source = entry.source_ref.as_deref().unwrap_or(&request.source_ref);
            // Own directory per item, titles may repeat inside a playlist
            let item_dir = batch_dir.join(format!("{:03}", index + 1));

            let result = match tokio::fs::create_dir_all(&item_dir).await {
                Ok(()) => {
                    self.process_item(entry, source, target_height, &item_dir, cleanup)
                        .await
                }
                Err(e) => Err(PipelineError::Acquisition(format!(
                    "cannot create {}: {}",
                    item_dir.display(),
                    e
                ))),
            };

            match result {
                Ok(artifact) => {
                    let display_name = entry_name(&entry.title, &artifact.path);
                    batch.items.push(BatchItem {
                        artifact,
                        display_name,
                    });
                }
                Err(e) => {
                    warn!(index, title = %entry.title, error = %e, "Skipping playlist item");
                    batch.skipped.push(SkippedItem {
                        index,
                        title: entry.title.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if batch.items.is_empty() {
            return Err(PipelineError::EmptyBatch {
                attempted: batch.attempted,
            });
        }

        let archive_path = request_dir.join(format!("{}.zip", sanitize_filename(&catalog.title)));
        cleanup.track(&archive_path);
        let archive = package(self.services.archiver.as_ref(), &batch.items, &archive_path).await?;
        size_gate(&archive, self.config.max_file_size)?;

        let display_name = format!("{}.zip", sanitize_filename(&catalog.title));
        let delivered = self.deliver(&archive.path, &display_name).await;

        if delivered && !batch.skipped.is_empty() {
            let note = format!(
                "{} of {} playlist videos could not be downloaded.",
                batch.skipped.len(),
                batch.attempted
            );
            if let Err(e) = self.services.delivery.send_message(&note).await {
                error!(error = %e, "Failed to send message");
            }
        }

        Ok(DeliveryReport {
            kind: archive.kind,
            size_bytes: archive.size_bytes,
            display_name,
            attempted: batch.attempted,
            skipped: batch.skipped,
            delivered,
        })
    }

    /// select -> acquire -> merge for one media item, all inside `dest_dir`
    async fn process_item(
        &self,
        item: &Catalog,
        source_ref: &str,
        target_height: u32,
        dest_dir: &Path,
        cleanup: &mut CleanupManager,
    ) -> Result<AcquiredArtifact, PipelineError> {
        let selection = FormatSelector::select(item, target_height, self.config.max_file_size);
        match &selection {
            SelectionResult::NoneFound(reason) => {
                return Err(PipelineError::NoSuitableFormat(reason.clone()));
            }
            SelectionResult::Combined(f) => {
                info!(title = %item.title, format = %f.id, "Selected combined format");
            }
            SelectionResult::SplitPair { video, audio } => {
                info!(
                    title = %item.title,
                    video = %video.id,
                    audio = %audio.id,
                    "Selected split pair"
                );
            }
        }

        let acquired = acquire(
            self.services.downloader.as_ref(),
            source_ref,
            &selection,
            dest_dir,
            &item.title,
            cleanup,
        )
        .await?;

        match acquired {
            Acquired::Combined(artifact) => Ok(artifact),
            Acquired::Split { video, audio } => {
                let out = merged_path(dest_dir, &item.title);
                cleanup.track(&out);
                merge(self.services.remuxer.as_ref(), &video, &audio, &out).await
            }
        }
    }

    async fn deliver(&self, path: &Path, caption: &str) -> bool {
        match self.services.delivery.send_file(path, caption).await {
            Ok(()) => {
                info!(path = %path.display(), "Delivered");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Delivery failed");
                false
            }
        }
    }

    async fn notify(&self, category: NotificationCategory) {
        if let Err(e) = self
            .services
            .delivery
            .send_message(category.user_message())
            .await
        {
            error!(error = %e, "Failed to send message");
        }
    }
}

/// Archive entry name: sanitized title plus the artifact's extension
fn entry_name(title: &str, artifact_path: &Path) -> String {
    let ext = artifact_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    format!("{}.{}", sanitize_filename(title), ext)
}
