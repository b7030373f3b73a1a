// CLI metadata extractor - uses the native `yt-dlp` binary
//
// `--dump-single-json` yields one JSON document: a video with a `formats`
// array, or a playlist whose `entries` are videos (null for unavailable
// ones).

use async_trait::async_trait;
use tracing::{debug, info};

use crate::downloader::config::ToolConfig;
use crate::downloader::errors::ServiceError;
use crate::downloader::models::{Catalog, Container, FormatDescriptor};
use crate::downloader::traits::MetadataService;
use crate::downloader::utils::{get_network_args, run_output_with_timeout, stderr_tail};

/// Metadata service backed by `yt-dlp --dump-single-json`
pub struct YtDlpMetadata {
    config: ToolConfig,
    playlist_end: Option<usize>,
}

impl YtDlpMetadata {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            playlist_end: None,
        }
    }

    /// Only resolve the first `count` playlist entries
    pub fn with_playlist_end(mut self, count: usize) -> Self {
        self.playlist_end = Some(count);
        self
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--yes-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.timeout_seconds.to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];

        if let Some(end) = self.playlist_end {
            args.push("--playlist-end".to_string());
            args.push(end.to_string());
        }

        args.extend(get_network_args(&self.config));

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Parse JSON output into a catalog
    pub fn parse_json(stdout: &[u8]) -> Result<Catalog, ServiceError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| ServiceError::Parse(format!("Invalid JSON: {}", e)))?;

        Self::parse_item(&json)
    }

    fn parse_item(json: &serde_json::Value) -> Result<Catalog, ServiceError> {
        let title = json["title"].as_str().unwrap_or("Unknown").to_string();
        let source_ref = json["webpage_url"]
            .as_str()
            .or_else(|| json["original_url"].as_str())
            .or_else(|| json["url"].as_str())
            .map(|s| s.to_string());

        if let Some(entries) = json["entries"].as_array() {
            let entries = entries
                .iter()
                .filter(|e| !e.is_null())
                .map(Self::parse_item)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Catalog {
                title,
                source_ref,
                formats: Vec::new(),
                entries: Some(entries),
            });
        }

        Ok(Catalog {
            title,
            source_ref,
            formats: Self::parse_formats(json)?,
            entries: None,
        })
    }

    fn parse_formats(json: &serde_json::Value) -> Result<Vec<FormatDescriptor>, ServiceError> {
        match json["formats"].as_array() {
            Some(formats) => Ok(formats.iter().filter_map(Self::parse_format).collect()),
            // Some extractors only describe a single format at top level
            None if json["format_id"].is_string() => {
                Ok(Self::parse_format(json).into_iter().collect())
            }
            None => Err(ServiceError::Parse("No formats array in JSON".to_string())),
        }
    }

    fn parse_format(f: &serde_json::Value) -> Option<FormatDescriptor> {
        let id = f["format_id"].as_str()?.to_string();
        let height = f["height"].as_u64().and_then(|h| u32::try_from(h).ok());
        let vcodec = f["vcodec"].as_str();
        let acodec = f["acodec"].as_str();

        // Missing codec info: trust the height for video and assume audio
        // is muxed in
        let has_video = vcodec.map_or(height.is_some(), |v| v != "none");
        let has_audio = acodec.map_or(true, |a| a != "none");

        let file_size =
            Self::as_bytes(&f["filesize"]).or_else(|| Self::as_bytes(&f["filesize_approx"]));
        let bitrate = f["abr"].as_f64().map(|abr| abr.round() as u32);

        Some(FormatDescriptor {
            id,
            container: Container::from_ext(f["ext"].as_str().unwrap_or("")),
            height,
            has_audio,
            has_video,
            file_size,
            bitrate,
        })
    }

    // filesize_approx is sometimes emitted as a float
    fn as_bytes(value: &serde_json::Value) -> Option<u64> {
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
    }
}

#[async_trait]
impl MetadataService for YtDlpMetadata {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn fetch(&self, source_ref: &str) -> Result<Catalog, ServiceError> {
        let args = self.build_args(source_ref);
        let output = run_output_with_timeout(
            &self.config.ytdlp_path,
            args,
            Some(self.config.timeout_seconds as u64),
        )
        .await?;

        if !output.status.success() {
            let stderr = stderr_tail(&output.stderr);
            debug!(stderr = %stderr, "yt-dlp metadata failed");
            return Err(ServiceError::from(stderr));
        }

        let catalog = Self::parse_json(&output.stdout)?;
        info!(
            title = %catalog.title,
            formats = catalog.formats.len(),
            entries = catalog.entries.as_ref().map_or(0, |e| e.len()),
            "Catalog fetched"
        );
        Ok(catalog)
    }
}
