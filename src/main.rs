use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidgrab::downloader::backends::{FfmpegRemuxer, OutboxDelivery, YtDlpDownloader, ZipArchiver};
use vidgrab::downloader::extractors::YtDlpMetadata;
use vidgrab::downloader::tools::ToolManager;
use vidgrab::{DownloadRequest, Pipeline, PipelineConfig, Services, ToolConfig};

/// Download a video (or a playlist as a zip) at a fixed height and size cap
#[derive(Parser, Debug)]
#[command(name = "vidgrab", version, about)]
struct Args {
    /// Video or playlist URL
    #[arg(required_unless_present = "check_tools")]
    url: Option<String>,

    /// Exact video height to select
    #[arg(long)]
    height: Option<u32>,

    /// Size cap in bytes; 0 disables it
    #[arg(long)]
    max_size: Option<u64>,

    /// Maximum playlist entries to attempt
    #[arg(long)]
    batch_limit: Option<usize>,

    /// Directory for in-flight files
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Where delivered files are copied
    #[arg(long, default_value = ".")]
    outbox: PathBuf,

    /// Proxy URL passed to yt-dlp
    #[arg(long)]
    proxy: Option<String>,

    /// cookies.txt passed to yt-dlp
    #[arg(long)]
    cookies: Option<String>,

    /// Only report whether yt-dlp and ffmpeg are available
    #[arg(long)]
    check_tools: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidgrab=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut tools = ToolConfig::from_env();
    if args.proxy.is_some() {
        tools = tools.with_proxy(args.proxy);
    }
    if args.cookies.is_some() {
        tools = tools.with_cookies_path(args.cookies);
    }

    if args.check_tools {
        let mut all_present = true;
        for tool in ToolManager::new(tools).get_all_tools().await {
            all_present &= tool.is_available;
            println!(
                "{:<8} {}",
                tool.name,
                match (&tool.path, &tool.version) {
                    (Some(path), Some(version)) => format!("{} ({})", path, version),
                    (Some(path), None) => path.clone(),
                    _ => "not found".to_string(),
                }
            );
        }
        return Ok(if all_present { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let url = args.url.context("no URL given")?;

    let mut config = PipelineConfig::from_env();
    if let Some(height) = args.height {
        config = config.with_target_height(height);
    }
    if let Some(size) = args.max_size {
        config = config.with_max_file_size((size > 0).then_some(size));
    }
    if let Some(limit) = args.batch_limit {
        config = config.with_batch_limit(limit);
    }
    if let Some(dir) = args.work_dir {
        config = config.with_work_dir(dir);
    }
    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("cannot create work dir {}", config.work_dir.display()))?;

    let services = Services {
        metadata: Arc::new(
            YtDlpMetadata::new(tools.clone()).with_playlist_end(config.batch_limit),
        ),
        downloader: Arc::new(YtDlpDownloader::new(tools.clone())),
        remuxer: Arc::new(FfmpegRemuxer::new(tools.ffmpeg_path.clone())),
        archiver: Arc::new(ZipArchiver::new()),
        delivery: Arc::new(OutboxDelivery::new(args.outbox)),
    };
    let pipeline = Pipeline::new(config, services);

    match pipeline.handle(&DownloadRequest::new(url)).await {
        Ok(report) if report.delivered => {
            info!(
                name = %report.display_name,
                size = report.size_bytes,
                skipped = report.skipped.len(),
                "Done"
            );
            Ok(ExitCode::SUCCESS)
        }
        Ok(report) => {
            warn!(name = %report.display_name, "Delivery failed");
            Ok(ExitCode::FAILURE)
        }
        // Already logged and reported through the delivery collaborator
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
