//! Playback-related small types and handles.
//!
//! This module defines the repeat mode, the engine command set, the shared
//! transport snapshot and the seams behind which the actual audio output
//! lives.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::library::Track;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatMode {
    /// Stop at the end of the current sequence.
    #[default]
    Off,
    /// Wrap around to the start/end of the current sequence.
    All,
    /// Reload the current track when it ends.
    One,
}

impl RepeatMode {
    /// Cycle off -> all -> one -> off.
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Transport values applied in one shot after a state reload.
#[derive(Debug, Clone)]
pub struct TransportRestore {
    pub volume: f64,
    pub muted: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    /// Mid-track position to restore on the next load, in seconds.
    pub position_seconds: f64,
}

#[derive(Debug)]
pub enum EngineCmd {
    /// Load and play the track at the given index of the visible list.
    PlayVisible(usize),
    /// Make the track at the given visible index current without playing.
    SelectVisible(usize),
    /// Play `tracks[index]` from an ephemeral sequence snapshot that later
    /// visible-list changes will not perturb.
    PlayEphemeral { tracks: Vec<Track>, index: usize },
    /// Toggle pause/resume; loads the first visible track when idle.
    TogglePlayPause,
    /// Skip to the next track in the active sequence.
    Next,
    /// Go to the previous track in the active sequence.
    Prev,
    /// Tear down the player handle and spectrum sampler.
    Stop,
    /// Toggle shuffle mode.
    ToggleShuffle,
    /// Cycle the repeat mode.
    CycleRepeat,
    /// Set the repeat mode directly.
    SetRepeat(RepeatMode),
    /// Seek to `fraction * duration` of the current track.
    SeekRelative(f64),
    /// Set the output volume in `[0, 1]`.
    SetVolume(f64),
    /// Mute/unmute through a zero-volume excursion.
    ToggleMute,
    /// Replace the engine's visible-list snapshot after a view recompute.
    SyncView(Vec<Track>),
    /// Apply persisted transport state after a reload.
    RestoreTransport(TransportRestore),
    /// Shut the engine thread down.
    Quit,
}

/// Runtime transport information shared with the embedding layer.
#[derive(Debug, Clone)]
pub struct TransportInfo {
    /// The selected track, if any (kept across stop so playback can resume).
    pub current: Option<Track>,
    /// Index of the selected track within the visible list, when present.
    pub index: Option<usize>,
    pub playing: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub muted: bool,
    /// Last user-facing volume; survives mute.
    pub volume: f64,
    pub position: Duration,
    pub duration: Duration,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            current: None,
            index: None,
            playing: false,
            shuffle: false,
            repeat: RepeatMode::Off,
            muted: false,
            volume: 0.7,
            position: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }
}

pub type TransportHandle = Arc<Mutex<TransportInfo>>;

/// One loaded track's playback capability.
///
/// Handles are created and owned by the engine thread; exactly one exists
/// at a time, enforced by disposing the previous one before opening the
/// next.
pub trait PlayerHandle {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Seek to an absolute position. Returns whether the seek was accepted.
    fn seek(&mut self, position: Duration) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    /// Total duration as reported by the decoder, when known.
    fn duration(&self) -> Option<Duration>;
    /// Whether playback of the appended source has ended.
    fn finished(&self) -> bool;
}

/// Factory for player handles, one per loaded track.
pub trait PlayerBackend {
    fn open(&mut self, path: &Path) -> crate::Result<Box<dyn PlayerHandle>>;
}

/// Deferred backend construction: the closure runs on the engine thread,
/// so backends holding thread-bound resources (the output stream) never
/// cross threads.
pub type BackendFactory = Box<dyn FnOnce() -> Box<dyn PlayerBackend> + Send>;
