//! Track fixtures shared by tests across the crate.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use super::Track;

pub(crate) fn track(path: &str, title: &str) -> Track {
    track_with(path, title, "Unknown Artist", "Unknown Album", 0)
}

pub(crate) fn track_with(
    path: &str,
    title: &str,
    artist: &str,
    album: &str,
    duration_secs: u64,
) -> Track {
    Track {
        path: PathBuf::from(path),
        title: title.into(),
        artist: artist.into(),
        album: album.into(),
        genre: "Unknown Genre".into(),
        year: "Unknown Year".into(),
        track_number: 0,
        duration: Duration::from_secs(duration_secs),
        duration_display: super::format_duration(Duration::from_secs(duration_secs)),
        cover: None,
        date_added: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        is_current: false,
    }
}
