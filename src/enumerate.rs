//! Channel enumeration: ask yt-dlp for the entry list of one or more
//! collection URLs in metadata-only mode, merge the results, and apply the
//! optional result-count limit.

use crate::spinner::Spinner;
use crate::ytdlp::yt_dlp_command;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;

/// Which channel tab(s) to enumerate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ContentTypeFilter {
    Shorts,
    Videos,
    All,
}

/// One discovered video prior to download. Built from yt-dlp's flat-playlist
/// output and immutable afterwards; missing metadata fields are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub original_url: String,
    /// The collection URL this entry was discovered through
    /// (`…/videos` or `…/shorts`).
    pub collection_url: String,
}

/// Raw record as printed by `yt-dlp --flat-playlist --dump-json`, one JSON
/// object per line. Entries without an id are unusable and get dropped.
#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    original_url: Option<String>,
}

/// True for direct video URLs, which skip enumeration and go straight to the
/// single-download path.
pub fn is_video_url(url: &str) -> bool {
    url.contains("/watch?") || url.contains("/shorts/")
}

/// Normalizes a channel URL so we don't double-append `/videos` or `/shorts`,
/// preserving any query string or fragment.
pub fn collection_url(channel_url: &str, filter: ContentTypeFilter) -> String {
    let suffix = match filter {
        ContentTypeFilter::Videos => "/videos",
        ContentTypeFilter::Shorts => "/shorts",
        // `All` has no single tab; callers query both variants instead.
        ContentTypeFilter::All => "",
    };

    let (without_fragment, fragment) = match channel_url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (channel_url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (without_fragment, None),
    };

    let base = base.trim_end_matches('/');
    let mut result = if suffix.is_empty() || base.ends_with(suffix) {
        base.to_string()
    } else {
        format!("{base}{suffix}")
    };

    if let Some(query) = query {
        result.push('?');
        result.push_str(query);
    }
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }

    result
}

/// Enumerates a channel according to the content-type filter.
///
/// `Videos`/`Shorts` query a single derived tab URL; `All` queries both and
/// merges videos-first, keeping the first occurrence of each id so a short
/// listed in both tabs is attributed to the tab it was merged from first.
/// The optional `limit` truncates the merged list; callers report the
/// post-truncation length as the run total.
///
/// A failed query degrades to an empty list for that URL (with a printed
/// warning) so `All` can still succeed on the surviving tab.
pub fn enumerate(
    channel_url: &str,
    filter: ContentTypeFilter,
    limit: Option<usize>,
) -> Vec<VideoEntry> {
    let mut entries = match filter {
        ContentTypeFilter::Videos | ContentTypeFilter::Shorts => {
            query_collection_or_warn(&collection_url(channel_url, filter), limit)
        }
        ContentTypeFilter::All => {
            println!("Scanning regular videos...");
            let videos =
                query_collection_or_warn(&collection_url(channel_url, ContentTypeFilter::Videos), limit);
            println!("Scanning shorts...");
            let shorts =
                query_collection_or_warn(&collection_url(channel_url, ContentTypeFilter::Shorts), limit);

            let mut seen = HashSet::new();
            videos
                .into_iter()
                .chain(shorts)
                .filter(|entry| seen.insert(entry.id.clone()))
                .collect()
        }
    };

    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

/// Wraps [`query_collection`] with the discovery spinner and the local
/// error-recovery contract: a failed tab is an empty result, never an abort.
fn query_collection_or_warn(list_url: &str, limit: Option<usize>) -> Vec<VideoEntry> {
    let spinner = Spinner::start("Discovering videos");
    let result = query_collection(list_url, limit);
    spinner.stop();

    match result {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("Error processing {}: {:#}", list_url, err);
            Vec::new()
        }
    }
}

/// Runs one metadata-only yt-dlp query and parses its line-delimited JSON.
fn query_collection(list_url: &str, limit: Option<usize>) -> Result<Vec<VideoEntry>> {
    let mut command = yt_dlp_command();
    command
        .arg("--flat-playlist")
        .arg("--dump-json")
        .arg("--ignore-errors")
        .arg("--no-warnings");

    if let Some(limit) = limit {
        command.arg("--playlist-end").arg(limit.to_string());
    }

    command.arg(list_url);

    let output = command
        .output()
        .with_context(|| format!("listing entries for {}", list_url))?;

    if !output.status.success() {
        bail!(
            "failed to list entries for {} (status: {})",
            list_url,
            output.status
        );
    }

    let content = String::from_utf8_lossy(&output.stdout);
    let mut entries = Vec::new();
    for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let raw: RawEntry = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(err) => {
                eprintln!("  Warning: could not parse playlist entry: {}", err);
                continue;
            }
        };

        let Some(id) = raw.id.filter(|id| !id.is_empty()) else {
            continue;
        };

        entries.push(VideoEntry {
            id,
            title: raw.title.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            original_url: raw.original_url.unwrap_or_default(),
            collection_url: list_url.to_owned(),
        });
    }

    Ok(entries)
}
