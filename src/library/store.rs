use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::model::Track;

/// Resolve a path to an absolute canonical form.
///
/// Falls back to plain absolutization when the file does not exist (useful
/// for restored state pointing at unplugged media) and to the input as a
/// last resort.
pub fn canonicalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Case-insensitive lookup key for an already-canonicalized path.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

#[derive(Default)]
struct LibraryInner {
    tracks: HashMap<String, Track>,
    added_at: HashMap<String, DateTime<Utc>>,
}

/// Thread-safe mapping from canonical path to [`Track`], plus insertion
/// timestamps for "added" sorting.
///
/// Both maps live under one mutex so that multi-key reads (snapshots) are
/// internally consistent. The lock is scoped tightly around map access and
/// is never held while event callbacks run.
#[derive(Default)]
pub struct TrackLibrary {
    inner: Mutex<LibraryInner>,
}

impl TrackLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a track unless its path is already known.
    ///
    /// Idempotent: re-adding an existing path is a no-op that returns the
    /// existing record. `track.path` is expected to be canonical already
    /// (metadata extraction canonicalizes before building the record).
    pub fn upsert(&self, track: Track) -> Track {
        let key = path_key(&track.path);
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.tracks.get(&key) {
            return existing.clone();
        }
        inner.added_at.insert(key.clone(), track.date_added);
        inner.tracks.insert(key, track.clone());
        track
    }

    pub fn get(&self, path: &Path) -> Option<Track> {
        let key = path_key(&canonicalize_path(path));
        self.inner.lock().unwrap().tracks.get(&key).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        let key = path_key(&canonicalize_path(path));
        self.inner.lock().unwrap().tracks.contains_key(&key)
    }

    pub fn added_at(&self, path: &Path) -> Option<DateTime<Utc>> {
        let key = path_key(&canonicalize_path(path));
        self.inner.lock().unwrap().added_at.get(&key).copied()
    }

    /// Clone of every track, in arbitrary order.
    pub fn snapshot(&self) -> Vec<Track> {
        self.inner.lock().unwrap().tracks.values().cloned().collect()
    }

    /// Every track paired with its insertion timestamp, taken under a
    /// single lock so the pairs are consistent.
    pub fn entries(&self) -> Vec<(Track, Option<DateTime<Utc>>)> {
        let inner = self.inner.lock().unwrap();
        inner
            .tracks
            .iter()
            .map(|(key, track)| (track.clone(), inner.added_at.get(key).copied()))
            .collect()
    }

    /// Paths of every known track, in arbitrary order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.inner
            .lock()
            .unwrap()
            .tracks
            .values()
            .map(|t| t.path.clone())
            .collect()
    }

    /// Mark `path` as the currently playing track, clearing the flag on
    /// every other record. `None` clears all flags.
    pub fn set_current(&self, path: Option<&Path>) {
        let target = path.map(|p| path_key(&canonicalize_path(p)));
        let mut inner = self.inner.lock().unwrap();
        for (key, track) in inner.tracks.iter_mut() {
            track.is_current = target.as_deref() == Some(key.as_str());
        }
    }

    /// Remove every track and timestamp (full-state reload only).
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.tracks.clear();
        inner.added_at.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
