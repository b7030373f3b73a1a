// Zip archive backend for playlist batches

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::downloader::errors::ServiceError;
use crate::downloader::traits::ArchiveService;

/// Writes archives next to their final location (`<name>.part`) and renames
/// them into place, so a failed run never leaves a readable archive behind.
pub struct ZipArchiver {
    /// `None` stores entries uncompressed
    compression_level: Option<i64>,
}

impl ZipArchiver {
    /// Media is already compressed, so entries are stored by default
    pub fn new() -> Self {
        Self {
            compression_level: None,
        }
    }

    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = Some(level.clamp(0, 9));
        self
    }

    fn options(&self) -> SimpleFileOptions {
        let options = match self.compression_level {
            None | Some(0) => {
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
            }
            Some(level) => SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(level)),
        };
        // zip64 records for entries over 4 GiB
        options.large_file(true)
    }
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

/// Zip rejects duplicate names; the later entry wins.
fn dedupe_entries(entries: &[(PathBuf, String)]) -> Vec<(PathBuf, String)> {
    let mut last_index: HashMap<&str, usize> = HashMap::new();
    for (index, (_, name)) in entries.iter().enumerate() {
        if last_index.insert(name.as_str(), index).is_some() {
            warn!(name = %name, "Duplicate archive entry name, keeping the later file");
        }
    }

    entries
        .iter()
        .enumerate()
        .filter(|(index, (_, name))| last_index.get(name.as_str()) == Some(index))
        .map(|(_, entry)| entry.clone())
        .collect()
}

fn write_zip(
    entries: &[(PathBuf, String)],
    part_path: &Path,
    options: SimpleFileOptions,
) -> Result<(), ServiceError> {
    let file = File::create(part_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for (path, name) in entries {
        debug!(path = %path.display(), name = %name, "Adding to archive");
        let mut input = File::open(path)?;
        zip.start_file(name.as_str(), options).map_err(|e| {
            ServiceError::Execution(format!("Failed to start zip entry {}: {}", name, e))
        })?;
        io::copy(&mut input, &mut zip)?;
    }

    zip.finish()
        .map_err(|e| ServiceError::Execution(format!("Failed to finalize zip: {}", e)))?
        .into_inner()
        .map_err(|e| ServiceError::Io(e.into_error()))?
        .sync_all()?;
    Ok(())
}

#[async_trait]
impl ArchiveService for ZipArchiver {
    fn name(&self) -> &'static str {
        "zip"
    }

    async fn create(
        &self,
        entries: &[(PathBuf, String)],
        out_path: &Path,
    ) -> Result<(), ServiceError> {
        let entries = dedupe_entries(entries);
        let out_path = out_path.to_path_buf();
        let mut part_name = out_path.as_os_str().to_owned();
        part_name.push(".part");
        let part_path = PathBuf::from(part_name);
        let options = self.options();

        tokio::task::spawn_blocking(move || {
            let result = write_zip(&entries, &part_path, options).and_then(|()| {
                std::fs::rename(&part_path, &out_path).map_err(ServiceError::from)
            });
            if result.is_err() {
                let _ = std::fs::remove_file(&part_path);
            }
            result
        })
        .await
        .map_err(|e| ServiceError::Execution(format!("zip task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_zip(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (entry.name().to_string(), data)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_archive() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.mp4");
        let b = temp.path().join("b.mp4");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"second").unwrap();
        let out = temp.path().join("list.zip");

        ZipArchiver::new()
            .create(
                &[(a, "One.mp4".to_string()), (b, "Two.mp4".to_string())],
                &out,
            )
            .await
            .unwrap();

        let entries = read_zip(&out);
        assert_eq!(
            entries,
            vec![
                ("One.mp4".to_string(), b"first".to_vec()),
                ("Two.mp4".to_string(), b"second".to_vec()),
            ]
        );
        assert!(!temp.path().join("list.zip.part").exists());
    }

    #[tokio::test]
    async fn test_duplicate_names_keep_later_file() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.mp4");
        let b = temp.path().join("b.mp4");
        std::fs::write(&a, b"old").unwrap();
        std::fs::write(&b, b"new").unwrap();
        let out = temp.path().join("list.zip");

        ZipArchiver::new()
            .with_compression_level(6)
            .create(
                &[(a, "Same.mp4".to_string()), (b, "Same.mp4".to_string())],
                &out,
            )
            .await
            .unwrap();

        assert_eq!(read_zip(&out), vec![("Same.mp4".to_string(), b"new".to_vec())]);
    }

    #[tokio::test]
    async fn test_missing_input_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("list.zip");

        let result = ZipArchiver::new()
            .create(
                &[(temp.path().join("gone.mp4"), "Gone.mp4".to_string())],
                &out,
            )
            .await;

        assert!(result.is_err());
        assert!(!out.exists());
        assert!(!temp.path().join("list.zip.part").exists());
    }
}
