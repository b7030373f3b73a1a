// Local delivery backend - copies finished files into an outbox directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::downloader::errors::ServiceError;
use crate::downloader::traits::DeliveryService;

/// Delivers by copying into `dir`; messages go to stdout.
pub struct OutboxDelivery {
    dir: PathBuf,
}

impl OutboxDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// First free `name`, `name (1)`, `name (2)`, ...
    async fn free_target(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file_name, None),
        };
        let mut n = 1;
        loop {
            let name = match ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let candidate = self.dir.join(name);
            if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[async_trait]
impl DeliveryService for OutboxDelivery {
    async fn send_file(&self, path: &Path, caption: &str) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ServiceError::Execution(format!("Not a file: {}", path.display())))?;
        let target = self.free_target(&file_name).await;

        let bytes = tokio::fs::copy(path, &target).await?;
        info!(path = %target.display(), bytes, caption, "Delivered");
        println!("{} -> {}", caption, target.display());
        Ok(())
    }

    async fn send_message(&self, text: &str) -> Result<(), ServiceError> {
        info!(text, "Notification");
        println!("{}", text);
        Ok(())
    }
}
