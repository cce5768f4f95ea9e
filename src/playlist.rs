//! Named, ordered sets of track paths.
//!
//! Playlists have a lifecycle independent of the library: they hold paths,
//! never track records, and paths that no longer resolve are skipped by the
//! view projection rather than treated as errors. Names are unique,
//! compared case-insensitively. A reserved "Favorites" playlist is created
//! implicitly on first use.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::library::{canonicalize_path, path_key};

/// Name of the implicitly created favorites playlist.
pub const FAVORITES: &str = "Favorites";

/// One named, ordered list of track paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub tracks: Vec<PathBuf>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    /// Whether `path` is a member (case-insensitive path comparison).
    pub fn contains(&self, path: &Path) -> bool {
        let key = path_key(&canonicalize_path(path));
        self.tracks.iter().any(|p| path_key(p) == key)
    }
}

/// Registry of all user playlists.
#[derive(Default)]
pub struct PlaylistRegistry {
    inner: Mutex<Vec<Playlist>>,
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid("playlist name must not be blank"));
    }
    Ok(())
}

fn position(playlists: &[Playlist], name: &str) -> Option<usize> {
    playlists
        .iter()
        .position(|p| p.name.eq_ignore_ascii_case(name))
}

impl PlaylistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a playlist, or return the existing one with that name.
    /// Blank names are rejected.
    pub fn create(&self, name: &str) -> Result<Playlist> {
        check_name(name)?;
        let mut playlists = self.inner.lock().unwrap();
        if let Some(i) = position(&playlists, name) {
            return Ok(playlists[i].clone());
        }
        let playlist = Playlist::new(name);
        playlists.push(playlist.clone());
        Ok(playlist)
    }

    /// Rename a playlist. Renaming a missing playlist is a no-op; a blank
    /// name or a name already in use by another playlist is rejected.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        check_name(old_name)?;
        check_name(new_name)?;
        let mut playlists = self.inner.lock().unwrap();
        let Some(i) = position(&playlists, old_name) else {
            return Ok(());
        };
        if let Some(other) = position(&playlists, new_name) {
            if other != i {
                return Err(Error::invalid(format!(
                    "playlist name already in use: {new_name}"
                )));
            }
        }
        playlists[i].name = new_name.to_string();
        Ok(())
    }

    /// Delete a playlist. Returns whether it existed.
    pub fn delete(&self, name: &str) -> bool {
        let mut playlists = self.inner.lock().unwrap();
        match position(&playlists, name) {
            Some(i) => {
                playlists.remove(i);
                true
            }
            None => false,
        }
    }

    /// Append `path` to the named playlist, creating the playlist if
    /// needed. Duplicate members are suppressed.
    pub fn add_track(&self, name: &str, path: &Path) -> Result<()> {
        check_name(name)?;
        if path.as_os_str().is_empty() {
            return Err(Error::invalid("track path must not be blank"));
        }
        let canonical = canonicalize_path(path);
        let key = path_key(&canonical);

        let mut playlists = self.inner.lock().unwrap();
        let i = match position(&playlists, name) {
            Some(i) => i,
            None => {
                playlists.push(Playlist::new(name));
                playlists.len() - 1
            }
        };
        if !playlists[i].tracks.iter().any(|p| path_key(p) == key) {
            playlists[i].tracks.push(canonical);
        }
        Ok(())
    }

    /// Remove every occurrence of `path` from the named playlist.
    pub fn remove_track(&self, name: &str, path: &Path) {
        let key = path_key(&canonicalize_path(path));
        let mut playlists = self.inner.lock().unwrap();
        if let Some(i) = position(&playlists, name) {
            playlists[i].tracks.retain(|p| path_key(p) != key);
        }
    }

    pub fn get(&self, name: &str) -> Option<Playlist> {
        let playlists = self.inner.lock().unwrap();
        position(&playlists, name).map(|i| playlists[i].clone())
    }

    pub fn snapshot(&self) -> Vec<Playlist> {
        self.inner.lock().unwrap().clone()
    }

    /// Replace every playlist (full-state reload only).
    pub fn replace_all(&self, playlists: Vec<Playlist>) {
        *self.inner.lock().unwrap() = playlists;
    }

    pub fn add_to_favorites(&self, path: &Path) -> Result<()> {
        self.add_track(FAVORITES, path)
    }

    pub fn remove_from_favorites(&self, path: &Path) {
        self.remove_track(FAVORITES, path);
    }

    pub fn is_favorite(&self, path: &Path) -> bool {
        self.get(FAVORITES)
            .map(|favorites| favorites.contains(path))
            .unwrap_or(false)
    }
}
