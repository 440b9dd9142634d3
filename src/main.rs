#![forbid(unsafe_code)]

//! Command-line entry point: verify ffmpeg, route direct video URLs to the
//! single-download path, otherwise enumerate the channel and run one batched
//! download. Exit codes: 0 on success or a clean operator stop, 1 when
//! ffmpeg is unavailable or a single-video download fails.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tubegrab::classify::{self, ShortSignals};
use tubegrab::download::{DownloadConfig, DownloadOutcome, download_all, download_single};
use tubegrab::enumerate::{ContentTypeFilter, VideoEntry, enumerate, is_video_url};
use tubegrab::ffmpeg::check_ffmpeg;

#[derive(Debug, Parser)]
#[command(
    name = "tubegrab",
    version,
    about = "Download YouTube videos from a channel or specific video URL"
)]
struct Cli {
    /// YouTube channel URL or video URL
    url: String,

    /// Output directory for downloaded videos
    #[arg(short, long, default_value = "downloads")]
    output: PathBuf,

    /// Content type to download (for channel URLs only)
    #[arg(short = 't', long = "type", value_enum, default_value = "all")]
    content_type: ContentTypeFilter,

    /// Number of retries for failed downloads
    #[arg(short, long, default_value_t = 3)]
    retries: u32,

    /// Disable geo-restriction bypassing
    #[arg(long = "no-geo-bypass", action = clap::ArgAction::SetFalse, default_value_t = true)]
    geo_bypass: bool,

    /// Limit the number of videos to download (for channel URLs only)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Cookies file passed through to yt-dlp for authenticated downloads
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Print the short-detection signals for every discovered entry
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            output_dir: self.output.clone(),
            retries: self.retries,
            geo_bypass: self.geo_bypass,
            cookies: self.cookies.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("\nAn error occurred: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match check_ffmpeg() {
        Ok(version) => println!("FFmpeg is installed: {}", version),
        Err(err) => {
            eprintln!("{:#}", err);
            eprintln!("\nPlease install FFmpeg before continuing.");
            return Ok(ExitCode::FAILURE);
        }
    }

    let config = cli.download_config();

    if is_video_url(&cli.url) {
        return download_one(&cli.url, &config).await;
    }

    let Some(entries) = enumerate_with_interrupt(&cli).await? else {
        println!("\n\nProcess interrupted by user.");
        return Ok(ExitCode::SUCCESS);
    };

    if entries.is_empty() {
        println!("\nNo videos found to download.");
        return Ok(ExitCode::SUCCESS);
    }

    report_discovery(&entries, cli.debug);

    println!("\nPress Ctrl+C at any time to stop the download process.");
    println!("Downloads completed so far will be saved.\n");

    match download_all(&entries, &config).await? {
        DownloadOutcome::Complete => println!("\nAll downloads completed!"),
        DownloadOutcome::Partial => println!("\nSome downloads may have failed."),
        DownloadOutcome::Interrupted { completed, total } => {
            println!("\n\nDownload interrupted by user. Progress saved.");
            println!("Successfully downloaded {} out of {} videos.", completed, total);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Single-URL path: exit 1 on failure, 0 on success or a clean stop.
async fn download_one(url: &str, config: &DownloadConfig) -> Result<ExitCode> {
    println!("\nStarting download of video: {}", url);
    println!("Downloading video...");

    match download_single(url, config).await? {
        DownloadOutcome::Complete => {
            println!("\nVideo downloaded successfully!");
            Ok(ExitCode::SUCCESS)
        }
        DownloadOutcome::Interrupted { .. } => {
            println!("\n\nDownload interrupted by user.");
            Ok(ExitCode::SUCCESS)
        }
        DownloadOutcome::Partial => {
            eprintln!("\nFailed to download video.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Runs the blocking enumeration off the async runtime so Ctrl-C stays
/// responsive during discovery. Returns `None` when the operator interrupted.
async fn enumerate_with_interrupt(cli: &Cli) -> Result<Option<Vec<VideoEntry>>> {
    let url = cli.url.clone();
    let filter = cli.content_type;
    let limit = cli.limit;

    let discovery = tokio::task::spawn_blocking(move || enumerate(&url, filter, limit));

    tokio::select! {
        entries = discovery => Ok(Some(entries.context("channel discovery task")?)),
        _ = tokio::signal::ctrl_c() => Ok(None),
    }
}

/// Prints the post-enumeration summary, with per-entry classifier signals in
/// debug mode.
fn report_discovery(entries: &[VideoEntry], debug: bool) {
    let shorts = entries.iter().filter(|entry| classify::is_short(entry)).count();
    println!(
        "\nFound {} videos to process ({} shorts, {} regular)",
        entries.len(),
        shorts,
        entries.len() - shorts,
    );

    if debug {
        for entry in entries {
            let signals = ShortSignals::evaluate(entry);
            println!(
                "  {}: short={} (playlist={} url={} original_url={} title={})",
                entry.id,
                signals.is_short(),
                signals.playlist_check,
                signals.url_check,
                signals.original_url_check,
                signals.title_check,
            );
        }
    }
}
