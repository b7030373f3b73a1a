// Concrete collaborators behind the pipeline traits

pub mod ffmpeg;
pub mod outbox;
pub mod ytdlp;
pub mod zip_archive;

pub use ffmpeg::FfmpegRemuxer;
pub use outbox::OutboxDelivery;
pub use ytdlp::YtDlpDownloader;
pub use zip_archive::ZipArchiver;
