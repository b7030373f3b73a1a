// ffmpeg remux backend

use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use crate::downloader::errors::ServiceError;
use crate::downloader::traits::RemuxService;
use crate::downloader::utils::{run_output_with_timeout, stderr_tail};

/// Combines a video-only and an audio-only file. The video stream is copied
/// as is, audio is re-encoded to AAC so webm/opus sources fit into mp4.
pub struct FfmpegRemuxer {
    ffmpeg_path: String,
}

impl FfmpegRemuxer {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn build_args(video_path: &Path, audio_path: &Path, out_path: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            video_path.to_string_lossy().into_owned(),
            "-i".to_string(),
            audio_path.to_string_lossy().into_owned(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            out_path.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl RemuxService for FfmpegRemuxer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn combine(
        &self,
        video_path: &Path,
        audio_path: &Path,
        out_path: &Path,
    ) -> Result<(), ServiceError> {
        let args = Self::build_args(video_path, audio_path, out_path);
        let output = run_output_with_timeout(&self.ffmpeg_path, args, None).await?;

        if output.status.success() {
            return Ok(());
        }

        let tail = stderr_tail(&output.stderr);
        warn!(code = ?output.status.code(), stderr = %tail, "ffmpeg failed");
        Err(ServiceError::Execution(format!("ffmpeg: {}", tail)))
    }
}
