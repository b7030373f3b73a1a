// Collaborator traits the pipeline talks to

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::ServiceError;
use super::models::Catalog;

/// Turns a source URL into a catalog of available formats
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Name of the service (for logging)
    fn name(&self) -> &'static str;

    async fn fetch(&self, source_ref: &str) -> Result<Catalog, ServiceError>;
}

/// Transfers one format of a source to `dest_path`. One attempt per call.
#[async_trait]
pub trait DownloadService: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        source_ref: &str,
        format_id: &str,
        dest_path: &Path,
    ) -> Result<(), ServiceError>;
}

/// Combines a video-only and an audio-only file into one container
#[async_trait]
pub trait RemuxService: Send + Sync {
    fn name(&self) -> &'static str;

    async fn combine(
        &self,
        video_path: &Path,
        audio_path: &Path,
        out_path: &Path,
    ) -> Result<(), ServiceError>;
}

/// Writes `(file, entry name)` pairs into a single archive at `out_path`
#[async_trait]
pub trait ArchiveService: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create(
        &self,
        entries: &[(PathBuf, String)],
        out_path: &Path,
    ) -> Result<(), ServiceError>;
}

/// Transport back to the requesting client
#[async_trait]
pub trait DeliveryService: Send + Sync {
    async fn send_file(&self, path: &Path, caption: &str) -> Result<(), ServiceError>;

    async fn send_message(&self, text: &str) -> Result<(), ServiceError>;
}
