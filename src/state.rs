//! Serializable snapshots of player and playlist state.
//!
//! The core produces and consumes these shapes; reading and writing them
//! to storage is the embedding application's job. On load, tracks are
//! re-resolved against freshly imported metadata, so only paths are
//! persisted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::RepeatMode;
use crate::playlist::Playlist;

/// Persisted transport and library-order state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    /// Every known track path, visible-list order first.
    pub tracks: Vec<PathBuf>,
    /// Index of the current track within `tracks`; an index past the end
    /// is treated as "no selection" on load.
    pub current_index: Option<usize>,
    /// Mid-track position to resume from, in seconds.
    pub position_seconds: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub is_shuffle: bool,
    pub repeat_mode: RepeatMode,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            current_index: None,
            position_seconds: 0.0,
            volume: 0.7,
            is_muted: false,
            is_shuffle: false,
            repeat_mode: RepeatMode::Off,
        }
    }
}

/// Persisted shape of one playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistState {
    pub name: String,
    pub track_paths: Vec<PathBuf>,
}

impl From<&Playlist> for PlaylistState {
    fn from(playlist: &Playlist) -> Self {
        Self {
            name: playlist.name.clone(),
            track_paths: playlist.tracks.clone(),
        }
    }
}

impl From<PlaylistState> for Playlist {
    fn from(state: PlaylistState) -> Self {
        Self {
            name: state.name,
            tracks: state.track_paths,
        }
    }
}
