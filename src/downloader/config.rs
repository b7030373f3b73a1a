// Pipeline and tool configuration
//
// Defaults, then environment overrides, then whatever the caller layers on
// with the `with_*` builders.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

/// Default cap on a deliverable file (50 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_TARGET_HEIGHT: u32 = 720;
pub const DEFAULT_BATCH_LIMIT: usize = 10;

/// Settings of the acquisition pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Exact height a video variant must have
    pub target_height: u32,
    /// Size cap for selection and delivery; `None` disables both checks
    pub max_file_size: Option<u64>,
    /// Playlist items beyond this are never attempted
    pub batch_limit: usize,
    /// Parent of the per-request directories
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_height: DEFAULT_TARGET_HEIGHT,
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
            batch_limit: DEFAULT_BATCH_LIMIT,
            work_dir: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("vidgrab"),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `VIDGRAB_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(height) = env_parse("VIDGRAB_TARGET_HEIGHT") {
            config.target_height = height;
        }
        if let Ok(raw) = std::env::var("VIDGRAB_MAX_FILE_SIZE") {
            // 0 or "none" disables the cap
            config.max_file_size = match raw.trim() {
                "none" | "0" => None,
                value => match value.parse() {
                    Ok(size) => Some(size),
                    Err(_) => {
                        warn!(value, "Ignoring invalid VIDGRAB_MAX_FILE_SIZE");
                        config.max_file_size
                    }
                },
            };
        }
        if let Some(limit) = env_parse("VIDGRAB_BATCH_LIMIT") {
            config.batch_limit = limit;
        }
        if let Ok(dir) = std::env::var("VIDGRAB_WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_target_height(mut self, height: u32) -> Self {
        self.target_height = height;
        self
    }

    pub fn with_max_file_size(mut self, size: Option<u64>) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }
}

/// Settings of the yt-dlp / ffmpeg adapters
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<String>,
    /// Timeout for metadata extraction, in seconds
    pub timeout_seconds: u32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            proxy: None,
            cookies_path: None,
            timeout_seconds: 60,
        }
    }
}

impl ToolConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("VIDGRAB_YTDLP") {
            config.ytdlp_path = path;
        }
        if let Ok(path) = std::env::var("VIDGRAB_FFMPEG") {
            config.ffmpeg_path = path;
        }
        if let Ok(proxy) = std::env::var("VIDGRAB_PROXY") {
            config.proxy = Some(proxy);
        }
        if let Ok(cookies) = std::env::var("VIDGRAB_COOKIES") {
            config.cookies_path = Some(cookies);
        }
        if let Some(timeout) = env_parse("VIDGRAB_TIMEOUT") {
            config.timeout_seconds = timeout;
        }

        config
    }

    pub fn with_ytdlp_path(mut self, path: impl Into<String>) -> Self {
        self.ytdlp_path = path.into();
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<String>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_height, 720);
        assert_eq!(config.max_file_size, Some(50 * 1024 * 1024));
        assert_eq!(config.batch_limit, 10);
        assert!(config.work_dir.ends_with("vidgrab"));
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::default()
            .with_target_height(360)
            .with_max_file_size(None)
            .with_batch_limit(3)
            .with_work_dir("/tmp/x");
        assert_eq!(config.target_height, 360);
        assert_eq!(config.max_file_size, None);
        assert_eq!(config.batch_limit, 3);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/x"));

        let tools = ToolConfig::default()
            .with_proxy(Some("socks5://127.0.0.1:1080".to_string()))
            .with_timeout(5);
        assert_eq!(tools.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(tools.timeout_seconds, 5);
    }
}
