// yt-dlp download backend - fetches one exact format to a fixed path

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::downloader::config::ToolConfig;
use crate::downloader::errors::ServiceError;
use crate::downloader::traits::DownloadService;
use crate::downloader::utils::{get_network_args, spawn_error, stderr_tail};

lazy_static::lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\d+\.?\d*\s*\w+/s))?(?:\s+ETA\s+(\S+))?"
    ).unwrap();
}

/// One parsed progress line
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub percent: f32,
    pub total: String,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

pub fn parse_progress(line: &str) -> Option<Progress> {
    let caps = PROGRESS_RE.captures(line)?;
    Some(Progress {
        percent: caps.get(1)?.as_str().parse().ok()?,
        total: caps.get(2)?.as_str().to_string(),
        speed: caps.get(3).map(|m| m.as_str().to_string()),
        eta: caps.get(4).map(|m| m.as_str().to_string()),
    })
}

pub struct YtDlpDownloader {
    config: ToolConfig,
}

impl YtDlpDownloader {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, source_ref: &str, format_id: &str, dest_path: &Path) -> Vec<String> {
        // yt-dlp treats `%` in -o as a template marker
        let output = dest_path.to_string_lossy().replace('%', "%%");

        let mut args = vec![
            "-f".to_string(),
            format_id.to_string(),
            "-o".to_string(),
            output,
            "--no-playlist".to_string(),
            "--no-part".to_string(),
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.timeout_seconds.to_string(),
        ];
        args.extend(get_network_args(&self.config));
        args.push("--".to_string());
        args.push(source_ref.to_string());
        args
    }
}

#[async_trait]
impl DownloadService for YtDlpDownloader {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(
        &self,
        source_ref: &str,
        format_id: &str,
        dest_path: &Path,
    ) -> Result<(), ServiceError> {
        let program = self.config.ytdlp_path.as_str();
        let args = self.build_args(source_ref, format_id, dest_path);
        debug!(program, args = %args.join(" "), "Starting download");

        let mut child = TokioCommand::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            ServiceError::Execution("Failed to capture yt-dlp stdout".to_string())
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            ServiceError::Execution("Failed to capture yt-dlp stderr".to_string())
        })?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        // Output is only logged; the exit status decides success
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let mut last_logged = -10.0f32;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(format_id, error = %e, "Stopped reading yt-dlp output");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            if let Some(progress) = parse_progress(&line) {
                // One log line per ~10%
                if progress.percent - last_logged >= 10.0 || progress.percent >= 100.0 {
                    last_logged = progress.percent;
                    debug!(
                        format_id,
                        percent = progress.percent,
                        total = %progress.total,
                        speed = progress.speed.as_deref().unwrap_or("?"),
                        eta = progress.eta.as_deref().unwrap_or("?"),
                        "Download progress"
                    );
                }
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        let tail = stderr_tail(&stderr);
        warn!(format_id, code = ?status.code(), stderr = %tail, "yt-dlp download failed");
        Err(ServiceError::from(tail))
    }
}
