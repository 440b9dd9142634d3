//! Heuristic classification of discovered entries as Shorts vs regular
//! uploads. The signal set mirrors what the channel pages themselves expose:
//! the tab the entry was listed under, the URL shapes, and creator-applied
//! title hashtags.

use crate::enumerate::VideoEntry;

/// Title hashtags that creators attach to short-form uploads. `#fyp` and its
/// variants come from cross-posted TikTok content.
const SHORT_TITLE_TAGS: [&str; 5] = ["#shorts", "#short", "#fyp", "#foryou", "#foryoupage"];

/// The four independent signals behind [`is_short`], kept separate so the
/// `--debug` mode can show why an entry was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortSignals {
    /// The collection URL the entry was discovered through contains `/shorts`.
    pub playlist_check: bool,
    /// The canonical URL contains `/shorts/` (or its percent-encoded form).
    pub url_check: bool,
    /// The original/source URL contains `/shorts/`.
    pub original_url_check: bool,
    /// The title carries one of [`SHORT_TITLE_TAGS`].
    pub title_check: bool,
}

impl ShortSignals {
    /// Evaluates every signal over lower-cased fields. Entries with absent
    /// fields carry empty strings, which simply never match.
    pub fn evaluate(entry: &VideoEntry) -> Self {
        let url = entry.url.to_lowercase();
        let original_url = entry.original_url.to_lowercase();
        let collection_url = entry.collection_url.to_lowercase();
        let title = entry.title.to_lowercase();

        Self {
            playlist_check: collection_url.contains("/shorts"),
            url_check: url.contains("/shorts/") || url.contains("shorts%2f"),
            original_url_check: original_url.contains("/shorts/"),
            title_check: SHORT_TITLE_TAGS.iter().any(|tag| title.contains(tag)),
        }
    }

    /// OR of the four signals.
    pub fn is_short(self) -> bool {
        self.playlist_check || self.url_check || self.original_url_check || self.title_check
    }
}

/// Returns true when any of the four signals fires.
pub fn is_short(entry: &VideoEntry) -> bool {
    ShortSignals::evaluate(entry).is_short()
}
