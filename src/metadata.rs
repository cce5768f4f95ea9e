//! Tag extraction behind a small seam.
//!
//! [`LoftyReader`] is the production implementation; [`track_from_path`]
//! turns whatever the reader produced into a [`Track`], degrading to a
//! minimal fallback record when extraction fails so one broken file never
//! aborts a batch.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lofty::prelude::*;
use log::debug;

use crate::Result;
use crate::library::{Track, canonicalize_path, format_duration};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";
pub const UNKNOWN_YEAR: &str = "Unknown Year";

/// Raw tag fields as read from a file, before fallback substitution.
#[derive(Debug, Clone, Default)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub duration: Duration,
    pub cover: Option<Arc<[u8]>>,
}

/// Extraction seam so the import pipeline can be exercised without real
/// audio files.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TrackTags>;
}

/// Tag reader backed by `lofty`.
#[derive(Debug, Default)]
pub struct LoftyReader;

impl TagReader for LoftyReader {
    fn read_tags(&self, path: &Path) -> Result<TrackTags> {
        let tagged = lofty::read_from_path(path)?;

        let mut tags = TrackTags {
            duration: tagged.properties().duration(),
            ..TrackTags::default()
        };

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            tags.title = non_empty(tag.title().as_deref());
            tags.artist = non_empty(tag.artist().as_deref());
            tags.album = non_empty(tag.album().as_deref());
            tags.genre = non_empty(tag.genre().as_deref());
            tags.year = tag.year().filter(|y| *y != 0);
            tags.track_number = tag.track();
            if let Some(picture) = tag.pictures().first() {
                tags.cover = Some(Arc::from(picture.data()));
            }
        }

        Ok(tags)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string()
}

/// Build a [`Track`] for `path`, substituting the fallback record when the
/// reader fails (recoverable: the batch continues).
pub fn track_from_path(reader: &dyn TagReader, path: &Path) -> Track {
    let path = canonicalize_path(path);

    match reader.read_tags(&path) {
        Ok(tags) => Track {
            title: tags.title.unwrap_or_else(|| file_stem(&path)),
            artist: tags.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: tags.album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            genre: tags.genre.unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
            year: tags
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
            track_number: tags.track_number.unwrap_or(0),
            duration: tags.duration,
            duration_display: format_duration(tags.duration),
            cover: tags.cover,
            date_added: Utc::now(),
            is_current: false,
            path,
        },
        Err(err) => {
            debug!("tag extraction failed for {}: {err}", path.display());
            Track {
                title: file_stem(&path),
                artist: UNKNOWN_ARTIST.to_string(),
                album: UNKNOWN_ALBUM.to_string(),
                genre: UNKNOWN_GENRE.to_string(),
                year: UNKNOWN_YEAR.to_string(),
                track_number: 0,
                duration: Duration::ZERO,
                duration_display: "0:00".to_string(),
                cover: None,
                date_added: Utc::now(),
                is_current: false,
                path,
            }
        }
    }
}
