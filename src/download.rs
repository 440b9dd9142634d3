//! Batched download orchestration around a single yt-dlp invocation.
//!
//! One run builds one fully-configured yt-dlp command over every enumerated
//! entry URL, streams its progress lines into a [`ProgressAggregator`], and
//! classifies how the run ended. Ctrl-C is raced against the output stream;
//! on interrupt the child is killed and everything already on disk stays.

use crate::enumerate::VideoEntry;
use crate::progress::{PROGRESS_TEMPLATE, ProgressAggregator, parse_progress_line};
use crate::ytdlp::{USER_AGENT, yt_dlp_async_command};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Format preference with three fallback tiers of decreasing strictness:
/// mp4 video + m4a audio mux, best premuxed mp4, then best of anything.
const CHANNEL_FORMAT: &str = "bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]/bv*+ba/b";

/// Single-URL variant of [`CHANNEL_FORMAT`] capped at 1080p.
const SINGLE_FORMAT: &str = "bv*[height<=1080][ext=mp4]+ba[ext=m4a]/b[height<=1080][ext=mp4]/bv*[height<=1080]+ba/b[height<=1080]";

const SOCKET_TIMEOUT_SECS: u32 = 30;
const GEO_BYPASS_COUNTRY: &str = "US";

/// Settings shared by every download in one run; built once from CLI input
/// and passed by value.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
    pub retries: u32,
    pub geo_bypass: bool,
    pub cookies: Option<PathBuf>,
}

/// How a batched run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// yt-dlp exited cleanly with zero failures.
    Complete,
    /// Some entries failed after exhausting retries; the rest are on disk.
    Partial,
    /// Operator pressed Ctrl-C. Files finished so far are left intact.
    Interrupted { completed: usize, total: usize },
}

/// Downloads every enumerated entry in one batched yt-dlp call, reporting
/// progress to stdout.
pub async fn download_all(
    entries: &[VideoEntry],
    config: &DownloadConfig,
) -> Result<DownloadOutcome> {
    ensure_output_dir(config)?;
    let mut aggregator = ProgressAggregator::new(entries.len(), io::stdout());
    let command = build_download_command(CHANNEL_FORMAT, config);
    run_download(command, entries.iter().map(|entry| entry.url.as_str()), &mut aggregator).await
}

/// Downloads one direct video URL with the resolution-capped format
/// preference.
pub async fn download_single(url: &str, config: &DownloadConfig) -> Result<DownloadOutcome> {
    ensure_output_dir(config)?;
    let mut aggregator = ProgressAggregator::new(1, io::stdout());
    let command = build_download_command(SINGLE_FORMAT, config);
    run_download(command, std::iter::once(url), &mut aggregator).await
}

fn ensure_output_dir(config: &DownloadConfig) -> Result<()> {
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir.display()))
}

/// Assembles the per-run yt-dlp configuration: format tiers, output template,
/// uniform retry counts, forced-MP4 post-processing, and the progress
/// template wired to the aggregator.
fn build_download_command(format: &str, config: &DownloadConfig) -> tokio::process::Command {
    let output_template = config.output_dir.join("%(title)s.%(ext)s");
    let retries = config.retries.to_string();

    let mut command = yt_dlp_async_command();
    command
        .arg("--format")
        .arg(format)
        .arg("--output")
        .arg(output_template)
        .arg("--merge-output-format")
        .arg("mp4")
        .arg("--recode-video")
        .arg("mp4")
        .arg("--retries")
        .arg(&retries)
        .arg("--fragment-retries")
        .arg(&retries)
        .arg("--extractor-retries")
        .arg(&retries)
        .arg("--file-access-retries")
        .arg(&retries)
        .arg("--skip-unavailable-fragments")
        .arg("--socket-timeout")
        .arg(SOCKET_TIMEOUT_SECS.to_string())
        .arg("--no-check-certificate")
        .arg("--user-agent")
        .arg(USER_AGENT)
        .arg("--ignore-errors")
        .arg("--no-warnings")
        .arg("--newline")
        .arg("--progress-template")
        .arg(PROGRESS_TEMPLATE);

    if config.geo_bypass {
        command
            .arg("--geo-bypass")
            .arg("--geo-bypass-country")
            .arg(GEO_BYPASS_COUNTRY);
    } else {
        command.arg("--no-geo-bypass");
    }

    if let Some(cookies) = &config.cookies {
        command.arg("--cookies").arg(cookies);
    }

    command
}

/// Spawns the prepared command over the given URLs and pumps its stdout into
/// the aggregator until the stream closes or the operator interrupts.
async fn run_download<'a, W: Write>(
    mut command: tokio::process::Command,
    urls: impl Iterator<Item = &'a str>,
    aggregator: &mut ProgressAggregator<W>,
) -> Result<DownloadOutcome> {
    for url in urls {
        command.arg(url);
    }
    command.stdout(Stdio::piped()).stderr(Stdio::null());

    let mut child = command.spawn().context("spawning yt-dlp")?;
    let stdout = child.stdout.take().context("capturing yt-dlp stdout")?;
    let mut lines = BufReader::new(stdout).lines();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("reading yt-dlp output")? {
                    Some(line) => {
                        if let Some(event) = parse_progress_line(&line) {
                            aggregator.on_event(&event);
                        }
                    }
                    None => break,
                }
            }
            _ = &mut ctrl_c => {
                interrupted = true;
                let _ = child.start_kill();
                break;
            }
        }
    }

    let status = child.wait().await.context("waiting for yt-dlp")?;

    if interrupted {
        return Ok(DownloadOutcome::Interrupted {
            completed: aggregator.session().completed(),
            total: aggregator.session().total(),
        });
    }

    if status.success() {
        Ok(DownloadOutcome::Complete)
    } else {
        Ok(DownloadOutcome::Partial)
    }
}
