// Common data models for the acquisition pipeline

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Container of an encoded variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
    M4a,
    /// Anything else, keeps the raw extension
    Other(String),
}

impl Container {
    pub fn from_ext(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Self::Mp4,
            "webm" => Self::Webm,
            "m4a" => Self::M4a,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::M4a => "m4a",
            Self::Other(ext) if !ext.is_empty() => ext,
            Self::Other(_) => "bin",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which streams a descriptor carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Combined,
    VideoOnly,
    AudioOnly,
}

/// One encoded variant of a media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Format ID (e.g., "18", "137", "140")
    pub id: String,
    pub container: Container,
    /// Height in pixels, absent for audio-only
    pub height: Option<u32>,
    pub has_audio: bool,
    pub has_video: bool,
    /// Exact or approximate size in bytes
    pub file_size: Option<u64>,
    /// Audio bitrate in kbps
    pub bitrate: Option<u32>,
}

impl FormatDescriptor {
    /// `None` for a descriptor with neither stream; such a descriptor is
    /// never selectable.
    pub fn stream_kind(&self) -> Option<StreamKind> {
        match (self.has_video, self.has_audio) {
            (true, true) => Some(StreamKind::Combined),
            (true, false) => Some(StreamKind::VideoOnly),
            (false, true) => Some(StreamKind::AudioOnly),
            (false, false) => None,
        }
    }

    /// Whether the size is known and within `max_size`. Without a cap every
    /// size (including unknown) fits.
    pub fn fits(&self, max_size: Option<u64>) -> bool {
        match max_size {
            None => true,
            Some(cap) => self.file_size.is_some_and(|size| size <= cap),
        }
    }
}

/// Available variants of one media item, or a playlist of items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub title: String,
    /// Page URL of this item, used instead of the request URL for playlist
    /// entries
    pub source_ref: Option<String>,
    pub formats: Vec<FormatDescriptor>,
    pub entries: Option<Vec<Catalog>>,
}

impl Catalog {
    /// Batch mode iff there are more than one playlist entries
    pub fn is_batch(&self) -> bool {
        self.entries.as_ref().is_some_and(|e| e.len() > 1)
    }

    /// The catalog to treat as a single item: a one-entry playlist collapses
    /// to its entry.
    pub fn single_item(&self) -> &Catalog {
        match self.entries.as_deref() {
            Some([only]) => only,
            _ => self,
        }
    }
}

/// Outcome of variant selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Combined(FormatDescriptor),
    SplitPair {
        video: FormatDescriptor,
        audio: FormatDescriptor,
    },
    NoneFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Video,
    Audio,
    Merged,
    Archive,
}

/// A file produced by a pipeline stage
#[derive(Debug, PartialEq, Eq)]
pub struct AcquiredArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub kind: ArtifactKind,
}

/// One successfully processed playlist item
#[derive(Debug)]
pub struct BatchItem {
    pub artifact: AcquiredArtifact,
    pub display_name: String,
}

/// A playlist item that was dropped, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub index: usize,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
    pub skipped: Vec<SkippedItem>,
    pub attempted: usize,
}

/// A single request routed through the pipeline
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub source_ref: String,
    /// Overrides the configured target height
    pub target_height: Option<u32>,
}

impl DownloadRequest {
    pub fn new(source_ref: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            target_height: None,
        }
    }

    pub fn with_target_height(mut self, height: u32) -> Self {
        self.target_height = Some(height);
        self
    }
}

/// What was handed to the delivery collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub kind: ArtifactKind,
    pub size_bytes: u64,
    pub display_name: String,
    /// Playlist items attempted (1 for a single item)
    pub attempted: usize,
    pub skipped: Vec<SkippedItem>,
    /// False when the transport rejected the file
    pub delivered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_kind() {
        let mut f = FormatDescriptor {
            id: "x".to_string(),
            container: Container::Mp4,
            height: None,
            has_audio: false,
            has_video: false,
            file_size: None,
            bitrate: None,
        };
        assert_eq!(f.stream_kind(), None);
        f.has_audio = true;
        assert_eq!(f.stream_kind(), Some(StreamKind::AudioOnly));
        f.has_video = true;
        assert_eq!(f.stream_kind(), Some(StreamKind::Combined));
    }

    #[test]
    fn test_unknown_size_only_fails_enforced_cap() {
        let f = FormatDescriptor {
            id: "x".to_string(),
            container: Container::Webm,
            height: Some(720),
            has_audio: true,
            has_video: true,
            file_size: None,
            bitrate: None,
        };
        assert!(f.fits(None));
        assert!(!f.fits(Some(1_000)));
    }

    #[test]
    fn test_single_entry_playlist_is_not_batch() {
        let entry = Catalog {
            title: "only".to_string(),
            ..Default::default()
        };
        let catalog = Catalog {
            title: "list".to_string(),
            entries: Some(vec![entry]),
            ..Default::default()
        };
        assert!(!catalog.is_batch());
        assert_eq!(catalog.single_item().title, "only");
    }

    #[test]
    fn test_container_extension() {
        assert_eq!(Container::from_ext("MP4"), Container::Mp4);
        assert_eq!(Container::from_ext("mkv").extension(), "mkv");
        assert_eq!(Container::Other(String::new()).extension(), "bin");
    }
}
