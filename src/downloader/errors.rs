// Error types for collaborators and the acquisition pipeline

use std::fmt;

use thiserror::Error;

/// Failure reported by an external collaborator (extractor, downloader,
/// remuxer, archiver, transport).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Source does not exist or is not available
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure or timeout while talking to the source
    #[error("Network error: {0}")]
    Network(String),

    /// yt-dlp, ffmpeg or another tool missing from the system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse tool output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Tool ran but exited with failure
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Classifies raw tool stderr into a ServiceError
impl From<String> for ServiceError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::Network(s);
        }

        if lower.contains("unable to download")
            || lower.contains("connection")
            || lower.contains("429")
        {
            return Self::Network(s);
        }

        if lower.contains("video unavailable")
            || lower.contains("404")
            || lower.contains("does not exist")
            || lower.contains("unsupported url")
        {
            return Self::NotFound(s);
        }

        if lower.contains("command not found") || lower.contains("no such file") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("json") || lower.contains("parse") {
            return Self::Parse(s);
        }

        Self::Execution(s)
    }
}

/// Errors that abort one item's pipeline (or the whole request).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch catalog: {0}")]
    CatalogFetch(#[source] ServiceError),

    #[error("no suitable format: {0}")]
    NoSuitableFormat(String),

    #[error("acquisition failed: {0}")]
    Acquisition(String),

    #[error("merge failed: {0}")]
    Merge(String),

    #[error("packaging failed: {0}")]
    Packaging(String),

    /// The artifact exists, only delivery is blocked.
    #[error("artifact is {size} bytes, limit is {limit} bytes")]
    Oversize { size: u64, limit: u64 },

    #[error("none of the {attempted} playlist items could be downloaded")]
    EmptyBatch { attempted: usize },
}

impl PipelineError {
    pub fn category(&self) -> NotificationCategory {
        match self {
            Self::CatalogFetch(_) => NotificationCategory::FetchFailed,
            Self::NoSuitableFormat(_) => NotificationCategory::NoSuitableFormat,
            Self::Acquisition(_) => NotificationCategory::DownloadFailed,
            Self::Merge(_) => NotificationCategory::MergeFailed,
            Self::Packaging(_) => NotificationCategory::PackagingFailed,
            Self::Oversize { .. } => NotificationCategory::SizeExceeded,
            Self::EmptyBatch { .. } => NotificationCategory::EmptyBatch,
        }
    }
}

/// What the user is told when a request fails. Collaborator messages never
/// leak into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    FetchFailed,
    NoSuitableFormat,
    DownloadFailed,
    SizeExceeded,
    MergeFailed,
    PackagingFailed,
    EmptyBatch,
}

impl NotificationCategory {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::FetchFailed => "Could not read video information from this link.",
            Self::NoSuitableFormat => "No suitable format found for this video.",
            Self::DownloadFailed => "Downloading the video failed.",
            Self::SizeExceeded => "The file is too large to send.",
            Self::MergeFailed => "Combining video and audio failed.",
            Self::PackagingFailed => "Packing the playlist into an archive failed.",
            Self::EmptyBatch => "None of the playlist videos could be downloaded.",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

/// Non-fatal failure to remove a temporary path.
#[derive(Debug)]
pub struct CleanupWarning {
    pub path: std::path::PathBuf,
    pub error: std::io::Error,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to remove {}: {}", self.path.display(), self.error)
    }
}
