use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// One audio file's identity plus extracted metadata.
///
/// Identity is the absolute file path, compared case-insensitively. The
/// record is owned by the [`super::TrackLibrary`]; playlists and the visible
/// list refer to tracks by path only.
#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Release year as text, or `"Unknown Year"`.
    pub year: String,
    pub track_number: u32,
    pub duration: Duration,
    /// `duration` preformatted as `m:ss` for display.
    pub duration_display: String,
    /// Raw bytes of the embedded cover art, if any. `None` means the UI
    /// shows its default cover.
    pub cover: Option<Arc<[u8]>>,
    /// When the track entered the library (UTC), for "added" sorting.
    pub date_added: DateTime<Utc>,
    /// Transient highlight flag for the currently playing track.
    pub is_current: bool,
}

impl Track {
    /// Whether `other` refers to the same file (case-insensitive path).
    pub fn same_path(&self, other: &Track) -> bool {
        super::path_key(&self.path) == super::path_key(&other.path)
    }
}

/// Format a duration as `m:ss` (minutes unpadded, seconds zero-padded).
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}
