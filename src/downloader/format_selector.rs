// FormatSelector - picks which variant(s) of a media item to download
//
// Priority:
// 1. Combined (audio+video) mp4/webm at the exact target height
// 2. Video-only mp4/webm at the exact target height, paired with
// 3. the highest-bitrate mp4/webm/m4a audio-only variant
//
// Height must match exactly; there is no nearest-resolution fallback.

use super::models::{Catalog, Container, FormatDescriptor, SelectionResult, StreamKind};

pub const NO_VIDEO_REASON: &str = "no suitable video variant";
pub const NO_AUDIO_REASON: &str = "no suitable audio variant";

/// Stateless selector over a catalog's formats
pub struct FormatSelector;

impl FormatSelector {
    pub fn select(catalog: &Catalog, target_height: u32, max_size: Option<u64>) -> SelectionResult {
        let formats = &catalog.formats;

        if let Some(combined) =
            Self::find_video(formats, StreamKind::Combined, target_height, max_size)
        {
            return SelectionResult::Combined(combined.clone());
        }

        let Some(video) = Self::find_video(formats, StreamKind::VideoOnly, target_height, max_size)
        else {
            return SelectionResult::NoneFound(NO_VIDEO_REASON.to_string());
        };

        match Self::find_best_audio(formats, max_size) {
            Some(audio) => SelectionResult::SplitPair {
                video: video.clone(),
                audio: audio.clone(),
            },
            None => SelectionResult::NoneFound(NO_AUDIO_REASON.to_string()),
        }
    }

    /// First descriptor of `kind` in catalog order at `target_height`
    fn find_video<'a>(
        formats: &'a [FormatDescriptor],
        kind: StreamKind,
        target_height: u32,
        max_size: Option<u64>,
    ) -> Option<&'a FormatDescriptor> {
        formats.iter().find(|f| {
            f.stream_kind() == Some(kind)
                && Self::is_video_container(&f.container)
                && f.height == Some(target_height)
                && f.fits(max_size)
        })
    }

    /// Highest bitrate audio-only descriptor; earlier entries win ties
    fn find_best_audio(
        formats: &[FormatDescriptor],
        max_size: Option<u64>,
    ) -> Option<&FormatDescriptor> {
        formats
            .iter()
            .filter(|f| {
                f.stream_kind() == Some(StreamKind::AudioOnly)
                    && Self::is_audio_container(&f.container)
                    && f.fits(max_size)
            })
            // max_by_key keeps the last maximum, so compare on reversed order
            .rev()
            .max_by_key(|f| f.bitrate.unwrap_or(0))
    }

    fn is_video_container(container: &Container) -> bool {
        matches!(container, Container::Mp4 | Container::Webm)
    }

    fn is_audio_container(container: &Container) -> bool {
        matches!(container, Container::Mp4 | Container::Webm | Container::M4a)
    }
}
