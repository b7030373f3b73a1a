// In-memory collaborators for tests. They write real files so cleanup can be
// checked on disk, and record what they were asked to do.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::errors::ServiceError;
use super::models::Catalog;
use super::traits::{
    ArchiveService, DeliveryService, DownloadService, MetadataService, RemuxService,
};

pub struct FakeMetadata {
    catalog: Option<Catalog>,
}

impl FakeMetadata {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    pub fn failing() -> Self {
        Self { catalog: None }
    }
}

#[async_trait]
impl MetadataService for FakeMetadata {
    fn name(&self) -> &'static str {
        "fake-metadata"
    }

    async fn fetch(&self, source_ref: &str) -> Result<Catalog, ServiceError> {
        self.catalog
            .clone()
            .ok_or_else(|| ServiceError::NotFound(source_ref.to_string()))
    }
}

pub struct FakeDownloader {
    sizes: HashMap<String, u64>,
    failing: HashSet<String>,
    write_output: bool,
    calls: Mutex<Vec<(String, String, PathBuf)>>,
}

impl FakeDownloader {
    pub const DEFAULT_SIZE: u64 = 64;

    pub fn new() -> Self {
        Self {
            sizes: HashMap::new(),
            failing: HashSet::new(),
            write_output: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_size(mut self, format_id: &str, size: u64) -> Self {
        self.sizes.insert(format_id.to_string(), size);
        self
    }

    pub fn failing_on(mut self, format_id: &str) -> Self {
        self.failing.insert(format_id.to_string());
        self
    }

    /// Report success without creating the file
    pub fn writing_nothing(mut self) -> Self {
        self.write_output = false;
        self
    }

    /// Format ids in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id, _)| id.clone())
            .collect()
    }

    pub fn sources(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(source, _, _)| source.clone())
            .collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, path)| path.clone())
            .collect()
    }
}

#[async_trait]
impl DownloadService for FakeDownloader {
    fn name(&self) -> &'static str {
        "fake-download"
    }

    async fn fetch(
        &self,
        source_ref: &str,
        format_id: &str,
        dest_path: &Path,
    ) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push((
            source_ref.to_string(),
            format_id.to_string(),
            dest_path.to_path_buf(),
        ));

        if self.failing.contains(format_id) {
            // Leave a partial file behind, like an interrupted transfer
            tokio::fs::write(dest_path, b"partial").await?;
            return Err(ServiceError::Network(format!("{} interrupted", format_id)));
        }
        if self.write_output {
            let size = self.sizes.get(format_id).copied().unwrap_or(Self::DEFAULT_SIZE);
            tokio::fs::write(dest_path, vec![0u8; size as usize]).await?;
        }
        Ok(())
    }
}

pub struct FakeRemuxer {
    fail: bool,
}

impl FakeRemuxer {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl RemuxService for FakeRemuxer {
    fn name(&self) -> &'static str {
        "fake-remux"
    }

    async fn combine(
        &self,
        video_path: &Path,
        audio_path: &Path,
        out_path: &Path,
    ) -> Result<(), ServiceError> {
        if self.fail {
            tokio::fs::write(out_path, b"half").await?;
            return Err(ServiceError::Execution("remux exploded".to_string()));
        }
        let mut data = tokio::fs::read(video_path).await?;
        data.extend(tokio::fs::read(audio_path).await?);
        tokio::fs::write(out_path, data).await?;
        Ok(())
    }
}

pub struct FakeArchiver {
    fail: bool,
    names: Mutex<Vec<String>>,
}

impl FakeArchiver {
    pub fn new() -> Self {
        Self {
            fail: false,
            names: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            names: Mutex::new(Vec::new()),
        }
    }

    pub fn last_names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveService for FakeArchiver {
    fn name(&self) -> &'static str {
        "fake-archive"
    }

    async fn create(
        &self,
        entries: &[(PathBuf, String)],
        out_path: &Path,
    ) -> Result<(), ServiceError> {
        *self.names.lock().unwrap() = entries.iter().map(|(_, name)| name.clone()).collect();
        if self.fail {
            return Err(ServiceError::Execution("disk full".to_string()));
        }
        let mut data = Vec::new();
        for (path, _) in entries {
            data.extend(tokio::fs::read(path).await?);
        }
        tokio::fs::write(out_path, data).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDelivery {
    files: Mutex<Vec<(PathBuf, String, u64)>>,
    messages: Mutex<Vec<String>>,
}

impl FakeDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// (path, caption, size at send time)
    pub fn files(&self) -> Vec<(PathBuf, String, u64)> {
        self.files.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryService for FakeDelivery {
    async fn send_file(&self, path: &Path, caption: &str) -> Result<(), ServiceError> {
        let size = tokio::fs::metadata(path).await?.len();
        self.files
            .lock()
            .unwrap()
            .push((path.to_path_buf(), caption.to_string(), size));
        Ok(())
    }

    async fn send_message(&self, text: &str) -> Result<(), ServiceError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
