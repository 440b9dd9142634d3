//! Progress event parsing and the per-run session state that renders the
//! single-line download status.
//!
//! yt-dlp is asked for machine-readable progress via `--progress-template`;
//! each tick arrives as one stdout line which we parse into a
//! [`ProgressEvent`] and feed to the [`ProgressAggregator`]. The aggregator
//! owns all counters for the run, so no process-wide state is involved.

use std::collections::HashSet;
use std::io::Write;

/// Template handed to `yt-dlp --progress-template`. Produces one parseable
/// line per progress tick; yt-dlp substitutes `NA` for values it doesn't
/// know yet.
pub const PROGRESS_TEMPLATE: &str = "download:PRG|%(info.id)s|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.elapsed)s|%(progress.speed)s";

const PROGRESS_PREFIX: &str = "PRG|";
const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    Finished,
}

/// One progress tick for one entry, keyed by the entry id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub id: String,
    pub status: ProgressStatus,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub elapsed: Option<f64>,
    pub speed: Option<f64>,
}

/// Parses one stdout line from the download child. Returns `None` for
/// anything that isn't a progress-template line — yt-dlp still prints its own
/// informational output around them.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split('|');

    let id = fields.next()?.to_owned();
    if id.is_empty() || id == "NA" {
        return None;
    }

    let status = match fields.next()? {
        "downloading" => ProgressStatus::Downloading,
        "finished" => ProgressStatus::Finished,
        _ => return None,
    };

    // `NA` fails the numeric parse and becomes None.
    let downloaded_bytes = numeric_field(fields.next());
    let total_bytes = numeric_field(fields.next());
    let elapsed = numeric_field(fields.next());
    let speed = numeric_field(fields.next());

    Some(ProgressEvent {
        id,
        status,
        downloaded_bytes,
        total_bytes,
        elapsed,
        speed,
    })
}

fn numeric_field(field: Option<&str>) -> Option<f64> {
    field.and_then(|value| value.trim().parse::<f64>().ok())
}

/// Counters owned by exactly one orchestration run and discarded with it.
///
/// `total` is fixed once enumeration completes; `completed` never exceeds it
/// and each id is counted at most once no matter how many `finished` events
/// the service re-emits during fragment retries.
#[derive(Debug)]
pub struct DownloadSession {
    finished: HashSet<String>,
    completed: usize,
    total: usize,
}

impl DownloadSession {
    pub fn new(total: usize) -> Self {
        Self {
            finished: HashSet::new(),
            completed: 0,
            total,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn is_finished(&self, id: &str) -> bool {
        self.finished.contains(id)
    }

    /// Records the first `finished` transition for an id. Returns false when
    /// the id was already counted.
    fn mark_finished(&mut self, id: &str) -> bool {
        if !self.finished.insert(id.to_owned()) {
            return false;
        }
        self.completed = (self.completed + 1).min(self.total);
        true
    }
}

/// Consumes progress events and renders the one-line status display.
///
/// Rendering uses carriage-return plus line-clear so each active download
/// occupies a single terminal line; a completion line is the only place a
/// newline is emitted. The writer is injected so tests can capture output.
pub struct ProgressAggregator<W: Write> {
    session: DownloadSession,
    out: W,
}

impl<W: Write> ProgressAggregator<W> {
    pub fn new(total: usize, out: W) -> Self {
        Self {
            session: DownloadSession::new(total),
            out,
        }
    }

    pub fn session(&self) -> &DownloadSession {
        &self.session
    }

    /// Handles one event. Idempotent per id for the `finished` transition;
    /// every event for an already-finished id is a no-op.
    pub fn on_event(&mut self, event: &ProgressEvent) {
        if self.session.is_finished(&event.id) {
            return;
        }

        match event.status {
            ProgressStatus::Downloading => self.render_downloading(event),
            ProgressStatus::Finished => {
                if self.session.mark_finished(&event.id) {
                    self.render_finished(event);
                }
            }
        }
    }

    fn render_downloading(&mut self, event: &ProgressEvent) {
        let (Some(downloaded), Some(total)) = (event.downloaded_bytes, event.total_bytes) else {
            return;
        };
        if total <= 0.0 {
            return;
        }

        let percent = (downloaded / total * 100.0) as u32;
        let _ = write!(
            self.out,
            "\rVideo {}: {}% ({:.1}MB/{:.1}MB)",
            self.session.completed + 1,
            percent,
            downloaded / MIB,
            total / MIB,
        );
        let _ = self.out.flush();
    }

    fn render_finished(&mut self, event: &ProgressEvent) {
        let current = self.session.completed;
        match (event.speed, event.elapsed) {
            (Some(speed), Some(elapsed)) if speed > 0.0 => {
                let size = event.total_bytes.unwrap_or(0.0);
                let _ = writeln!(
                    self.out,
                    "\rVideo {}: Download completed - {:.2} MiB/s in {:.1}s ({:.1} MiB) \u{2713}\x1b[K",
                    current,
                    speed / MIB,
                    elapsed,
                    size / MIB,
                );
            }
            _ => {
                let _ = writeln!(
                    self.out,
                    "\rVideo {}: Download completed \u{2713}\x1b[K",
                    current
                );
            }
        }
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, status: ProgressStatus) -> ProgressEvent {
        ProgressEvent {
            id: id.into(),
            status,
            downloaded_bytes: None,
            total_bytes: None,
            elapsed: None,
            speed: None,
        }
    }

    #[test]
    fn parses_downloading_line_with_missing_totals() {
        let parsed = parse_progress_line("PRG|abc|downloading|524288|NA|NA|NA").unwrap();
        assert_eq!(parsed.id, "abc");
        assert_eq!(parsed.status, ProgressStatus::Downloading);
        assert_eq!(parsed.downloaded_bytes, Some(524288.0));
        assert_eq!(parsed.total_bytes, None);
    }

    #[test]
    fn parses_finished_line_with_timing() {
        let parsed =
            parse_progress_line("PRG|abc|finished|1048576|1048576|2.5|524288.0").unwrap();
        assert_eq!(parsed.status, ProgressStatus::Finished);
        assert_eq!(parsed.elapsed, Some(2.5));
        assert_eq!(parsed.speed, Some(524288.0));
    }

    #[test]
    fn ignores_unrelated_output_lines() {
        assert!(parse_progress_line("[download] Destination: clip.mp4").is_none());
        assert!(parse_progress_line("").is_none());
        assert!(parse_progress_line("PRG|NA|downloading|1|2|3|4").is_none());
        assert!(parse_progress_line("PRG|abc|postprocessing|1|2|3|4").is_none());
    }

    #[test]
    fn duplicate_finished_events_count_once() {
        let mut aggregator = ProgressAggregator::new(3, Vec::new());
        aggregator.on_event(&event("a", ProgressStatus::Finished));
        aggregator.on_event(&event("a", ProgressStatus::Finished));
        aggregator.on_event(&event("a", ProgressStatus::Downloading));
        assert_eq!(aggregator.session().completed(), 1);

        aggregator.on_event(&event("b", ProgressStatus::Finished));
        assert_eq!(aggregator.session().completed(), 2);
        assert_eq!(aggregator.session().total(), 3);
    }

    #[test]
    fn completed_never_exceeds_total() {
        let mut aggregator = ProgressAggregator::new(1, Vec::new());
        for id in ["a", "b", "c"] {
            aggregator.on_event(&event(id, ProgressStatus::Finished));
        }
        assert!(aggregator.session().completed() <= aggregator.session().total());
        assert_eq!(aggregator.session().completed(), 1);
    }

    #[test]
    fn downloading_rewrites_the_status_line_in_place() {
        let mut aggregator = ProgressAggregator::new(1, Vec::new());
        let mut tick = event("a", ProgressStatus::Downloading);
        tick.downloaded_bytes = Some(MIB / 2.0);
        tick.total_bytes = Some(MIB);
        aggregator.on_event(&tick);

        let output = String::from_utf8(aggregator.out.clone()).unwrap();
        assert_eq!(output, "\rVideo 1: 50% (0.5MB/1.0MB)");
    }

    #[test]
    fn finished_with_timing_reports_throughput() {
        let mut aggregator = ProgressAggregator::new(1, Vec::new());
        let mut done = event("a", ProgressStatus::Finished);
        done.total_bytes = Some(2.0 * MIB);
        done.elapsed = Some(4.0);
        done.speed = Some(MIB / 2.0);
        aggregator.on_event(&done);

        let output = String::from_utf8(aggregator.out.clone()).unwrap();
        assert!(output.contains("Video 1: Download completed - 0.50 MiB/s in 4.0s (2.0 MiB) \u{2713}"));
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn finished_without_timing_prints_bare_checkmark() {
        let mut aggregator = ProgressAggregator::new(1, Vec::new());
        aggregator.on_event(&event("a", ProgressStatus::Finished));

        let output = String::from_utf8(aggregator.out.clone()).unwrap();
        assert!(output.contains("Video 1: Download completed \u{2713}"));
        assert!(!output.contains("MiB/s"));
    }
}
