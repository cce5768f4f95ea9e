//! The playback state machine, run on its own thread.
//!
//! The thread owns the player handle outright, so the "exactly one
//! handle/stream pair" invariant holds by construction: every load disposes
//! the previous handle before opening the next. The command receive timeout
//! doubles as the progress tick, which also drives near-end auto-advance.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::RngExt;

use crate::config::{PlaybackSettings, SpectrumSettings};
use crate::events::{EventHub, Progress, VolumeState};
use crate::library::{Track, TrackLibrary};
use crate::spectrum::SpectrumSampler;

use super::types::{
    BackendFactory, EngineCmd, PlayerBackend, PlayerHandle, RepeatMode, TransportHandle,
    TransportRestore,
};

pub(super) fn spawn_engine_thread(
    rx: Receiver<EngineCmd>,
    factory: BackendFactory,
    library: Arc<TrackLibrary>,
    events: Arc<EventHub>,
    transport: TransportHandle,
    playback: PlaybackSettings,
    spectrum: SpectrumSettings,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let backend = factory();
        let tick = Duration::from_millis(playback.progress_tick_ms.max(1));
        let mut runtime =
            EngineRuntime::new(backend, library, events, transport, playback, spectrum);

        loop {
            match rx.recv_timeout(tick) {
                Ok(EngineCmd::Quit) => {
                    runtime.shutdown();
                    break;
                }
                Ok(cmd) => runtime.handle(cmd),
                Err(RecvTimeoutError::Timeout) => runtime.tick(),
                Err(RecvTimeoutError::Disconnected) => {
                    runtime.shutdown();
                    break;
                }
            }
        }
    })
}

/// The active playback sequence: an index into the visible list, or an
/// ephemeral snapshot that visible-list changes do not perturb.
enum Selection {
    None,
    Visible(usize),
    Ephemeral { tracks: Vec<Track>, index: usize },
}

struct ActivePlayer {
    handle: Box<dyn PlayerHandle>,
    track: Track,
    duration: Duration,
}

pub(super) struct EngineRuntime {
    backend: Box<dyn PlayerBackend>,
    library: Arc<TrackLibrary>,
    events: Arc<EventHub>,
    transport: TransportHandle,
    playback: PlaybackSettings,
    spectrum: SpectrumSettings,

    visible: Vec<Track>,
    selection: Selection,
    active: Option<ActivePlayer>,
    sampler: Option<SpectrumSampler>,

    playing: bool,
    shuffle: bool,
    repeat: RepeatMode,
    muted: bool,
    last_volume: f64,
    volume_internal_change: bool,
    saved_position: Option<f64>,
    seek_started: Option<Instant>,

    // Auto-advance fires at most once per loaded track, so the near-end
    // tick and the sink-drained notification cannot double-advance.
    load_generation: u64,
    advanced_generation: u64,
    load_failures: usize,
}

impl EngineRuntime {
    pub(super) fn new(
        backend: Box<dyn PlayerBackend>,
        library: Arc<TrackLibrary>,
        events: Arc<EventHub>,
        transport: TransportHandle,
        playback: PlaybackSettings,
        spectrum: SpectrumSettings,
    ) -> Self {
        Self {
            last_volume: playback.volume.clamp(0.0, 1.0),
            shuffle: playback.shuffle,
            repeat: playback.repeat.into(),
            backend,
            library,
            events,
            transport,
            playback,
            spectrum,
            visible: Vec::new(),
            selection: Selection::None,
            active: None,
            sampler: None,
            playing: false,
            muted: false,
            volume_internal_change: false,
            saved_position: None,
            seek_started: None,
            load_generation: 0,
            advanced_generation: 0,
            load_failures: 0,
        }
    }

    pub(super) fn handle(&mut self, cmd: EngineCmd) {
        match cmd {
            EngineCmd::PlayVisible(index) => {
                if index < self.visible.len() {
                    self.selection = Selection::Visible(index);
                    self.play_current();
                }
            }
            EngineCmd::SelectVisible(index) => self.select_visible(index),
            EngineCmd::PlayEphemeral { tracks, index } => {
                if index < tracks.len() {
                    self.selection = Selection::Ephemeral { tracks, index };
                    self.play_current();
                }
            }
            EngineCmd::TogglePlayPause => self.toggle_play_pause(),
            EngineCmd::Next => self.advance(true),
            EngineCmd::Prev => self.advance(false),
            EngineCmd::Stop => self.stop(),
            EngineCmd::ToggleShuffle => {
                self.shuffle = !self.shuffle;
                self.sync_transport();
            }
            EngineCmd::CycleRepeat => {
                self.repeat = self.repeat.cycle();
                self.sync_transport();
            }
            EngineCmd::SetRepeat(mode) => {
                self.repeat = mode;
                self.sync_transport();
            }
            EngineCmd::SeekRelative(fraction) => self.seek_relative(fraction),
            EngineCmd::SetVolume(value) => self.set_volume(value),
            EngineCmd::ToggleMute => self.toggle_mute(),
            EngineCmd::SyncView(tracks) => self.sync_view(tracks),
            EngineCmd::RestoreTransport(restore) => self.restore_transport(restore),
            // handled by the thread loop
            EngineCmd::Quit => {}
        }
    }

    /// Periodic progress tick; also the timer half of auto-advance.
    pub(super) fn tick(&mut self) {
        if let Some(started) = self.seek_started {
            // do not race a seek still in flight
            if started.elapsed() < Duration::from_millis(self.playback.seek_grace_ms) {
                return;
            }
            self.seek_started = None;
        }

        let Some(active) = self.active.as_ref() else {
            return;
        };
        if !self.playing {
            return;
        }

        let position = active.handle.position();
        let duration = active.duration;
        let finished = active.handle.finished();

        if duration > Duration::ZERO {
            let fraction = (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
            self.events.progress_changed.emit(&Progress {
                position,
                duration,
                fraction,
            });
            if let Ok(mut info) = self.transport.lock() {
                info.position = position;
                info.duration = duration;
            }

            let near_end = duration.saturating_sub(position)
                < Duration::from_millis(self.playback.near_end_threshold_ms);
            if near_end || finished {
                self.auto_advance();
            }
        } else if finished {
            self.auto_advance();
        }
    }

    /// End-of-track transition shared by the tick and the drained-sink
    /// notification; honored at most once per loaded track.
    pub(super) fn auto_advance(&mut self) {
        if self.advanced_generation == self.load_generation {
            return;
        }
        self.advanced_generation = self.load_generation;

        if self.repeat == RepeatMode::One {
            self.play_current();
        } else {
            self.advance(true);
        }
    }

    fn current_track(&self) -> Option<Track> {
        match &self.selection {
            Selection::None => None,
            Selection::Visible(index) => self.visible.get(*index).cloned(),
            Selection::Ephemeral { tracks, index } => tracks.get(*index).cloned(),
        }
    }

    fn sequence_state(&self) -> (usize, Option<usize>) {
        match &self.selection {
            Selection::None => (self.visible.len(), None),
            Selection::Visible(index) => (self.visible.len(), Some(*index)),
            Selection::Ephemeral { tracks, index } => (tracks.len(), Some(*index)),
        }
    }

    fn set_index(&mut self, index: usize) {
        match &mut self.selection {
            Selection::Ephemeral { index: current, .. } => *current = index,
            _ => self.selection = Selection::Visible(index),
        }
    }

    fn step(&mut self, len: usize, current: Option<usize>, forward: bool) -> Option<usize> {
        if self.shuffle {
            return Some(rand::rng().random_range(0..len));
        }
        if forward {
            let next = current.map_or(0, |i| i + 1);
            if next >= len {
                (self.repeat == RepeatMode::All).then_some(0)
            } else {
                Some(next)
            }
        } else {
            match current {
                None => Some(0),
                Some(0) => (self.repeat == RepeatMode::All).then_some(len - 1),
                Some(i) => Some(i - 1),
            }
        }
    }

    /// Move to the neighboring track of the active sequence; end of
    /// sequence stops unless repeat-all wraps.
    fn advance(&mut self, forward: bool) {
        let (len, current) = self.sequence_state();
        if len == 0 {
            return;
        }
        match self.step(len, current, forward) {
            Some(index) => {
                self.set_index(index);
                self.play_current();
            }
            None => self.stop(),
        }
    }

    /// Load and start the selected track, disposing the previous
    /// handle/sampler pair first. A failed load is skipped like the
    /// original "unplayable file" path: advance and try the next one.
    fn play_current(&mut self) {
        let Some(track) = self.current_track() else {
            return;
        };

        if let Some(mut previous) = self.active.take() {
            debug!("disposing player for {}", previous.track.path.display());
            previous.handle.stop();
        }

        match self.backend.open(&track.path) {
            Err(err) => {
                warn!("skipping unplayable track: {err}");
                self.load_failures += 1;
                if self.load_failures >= self.sequence_state().0.max(1) {
                    // every candidate failed; do not walk the sequence forever
                    self.load_failures = 0;
                    self.stop();
                } else {
                    self.advance(true);
                }
            }
            Ok(mut handle) => {
                self.load_failures = 0;
                self.load_generation += 1;

                let volume = if self.muted { 0.0 } else { self.last_volume };
                handle.set_volume(volume as f32);
                let duration = handle.duration().unwrap_or(track.duration);

                debug!("created player for {}", track.path.display());
                self.sampler = Some(SpectrumSampler::start(
                    track.path.clone(),
                    self.events.clone(),
                    self.spectrum.clone(),
                ));

                // restore a persisted mid-track position exactly once
                if let Some(seconds) = self.saved_position.take() {
                    if duration > Duration::ZERO {
                        let ceiling = duration.saturating_sub(Duration::from_millis(500));
                        let target = Duration::from_secs_f64(seconds.max(0.0)).min(ceiling);
                        if target > Duration::ZERO && !handle.seek(target) {
                            warn!("could not restore position for {}", track.path.display());
                        }
                    }
                }

                handle.play();
                self.active = Some(ActivePlayer {
                    handle,
                    track: track.clone(),
                    duration,
                });
                self.playing = true;

                self.library.set_current(Some(&track.path));
                self.sync_transport();
                self.events.play_state_changed.emit(&true);
                let mut announced = track;
                announced.is_current = true;
                self.events.track_changed.emit(&announced);
            }
        }
    }

    /// Make a visible track current without starting playback.
    fn select_visible(&mut self, index: usize) {
        let Some(track) = self.visible.get(index).cloned() else {
            return;
        };
        self.selection = Selection::Visible(index);
        self.library.set_current(Some(&track.path));
        self.sync_transport();
        let mut announced = track;
        announced.is_current = true;
        self.events.track_changed.emit(&announced);
    }

    fn toggle_play_pause(&mut self) {
        if self.active.is_none() {
            if matches!(self.selection, Selection::None) {
                if self.visible.is_empty() {
                    return;
                }
                self.selection = Selection::Visible(0);
            }
            self.play_current();
            return;
        }

        if let Some(active) = self.active.as_mut() {
            if self.playing {
                active.handle.pause();
                self.playing = false;
            } else {
                active.handle.play();
                self.playing = true;
            }
        }
        if let Some(sampler) = &self.sampler {
            sampler.pause(!self.playing);
        }
        self.sync_transport();
        self.events.play_state_changed.emit(&self.playing);
    }

    fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!("stopping player for {}", active.track.path.display());
            active.handle.stop();
        }
        self.sampler = None;
        self.playing = false;
        self.seek_started = None;
        self.library.set_current(None);
        self.sync_transport();
        self.events.play_state_changed.emit(&false);
    }

    fn seek_relative(&mut self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.duration <= Duration::ZERO {
            return;
        }

        let target = active.duration.mul_f64(fraction.clamp(0.0, 1.0));
        self.seek_started = Some(Instant::now());
        if !active.handle.seek(target) {
            warn!("seek failed for {}", active.track.path.display());
        }
        if let Ok(mut info) = self.transport.lock() {
            info.position = target;
        }
    }

    fn set_volume(&mut self, value: f64) {
        // mute/unmute transitions apply volume themselves and must not
        // re-enter user-facing volume semantics
        if self.volume_internal_change {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        if self.muted && value > 0.0 {
            self.muted = false;
        }
        self.last_volume = value;
        if let Some(active) = self.active.as_mut() {
            active.handle.set_volume(value as f32);
        }
        self.sync_transport();
        self.events.volume_state_changed.emit(&VolumeState {
            volume: value,
            muted: self.muted,
        });
    }

    fn toggle_mute(&mut self) {
        if !self.muted {
            self.muted = true;
            self.volume_internal_change = true;
            if let Some(active) = self.active.as_mut() {
                active.handle.set_volume(0.0);
            }
            self.sync_transport();
            self.events.volume_state_changed.emit(&VolumeState {
                volume: 0.0,
                muted: true,
            });
            self.volume_internal_change = false;
        } else {
            self.muted = false;
            let restore = if self.last_volume <= 0.0 {
                self.playback.unmute_fallback_volume
            } else {
                self.last_volume
            };
            self.last_volume = restore;
            self.volume_internal_change = true;
            if let Some(active) = self.active.as_mut() {
                active.handle.set_volume(restore as f32);
            }
            self.sync_transport();
            self.events.volume_state_changed.emit(&VolumeState {
                volume: restore,
                muted: false,
            });
            self.volume_internal_change = false;
        }
    }

    /// Take a fresh visible-list snapshot and re-locate the current track
    /// by path. An ephemeral playlist selection is left untouched.
    fn sync_view(&mut self, tracks: Vec<Track>) {
        let previous = match &self.selection {
            Selection::Visible(index) => self.visible.get(*index).cloned(),
            _ => None,
        };
        self.visible = tracks;

        if matches!(self.selection, Selection::Ephemeral { .. }) {
            self.sync_transport();
            return;
        }

        self.selection = match previous {
            Some(track) => match self.visible.iter().position(|t| t.same_path(&track)) {
                Some(index) => Selection::Visible(index),
                None => Selection::None,
            },
            None => Selection::None,
        };
        self.sync_transport();
    }

    fn restore_transport(&mut self, restore: TransportRestore) {
        self.last_volume = restore.volume.clamp(0.0, 1.0);
        self.muted = restore.muted;
        self.shuffle = restore.shuffle;
        self.repeat = restore.repeat;
        self.saved_position = (restore.position_seconds > 0.0).then_some(restore.position_seconds);
        self.sync_transport();
    }

    fn sync_transport(&self) {
        let current = self.current_track();
        if let Ok(mut info) = self.transport.lock() {
            info.index = current
                .as_ref()
                .and_then(|t| self.visible.iter().position(|v| v.same_path(t)));
            info.current = current.map(|mut t| {
                t.is_current = true;
                t
            });
            info.playing = self.playing;
            info.shuffle = self.shuffle;
            info.repeat = self.repeat;
            info.muted = self.muted;
            info.volume = self.last_volume;
            info.position = self
                .active
                .as_ref()
                .map(|a| a.handle.position())
                .unwrap_or_default();
            info.duration = self.active.as_ref().map(|a| a.duration).unwrap_or_default();
        }
    }

    pub(super) fn shutdown(&mut self) {
        self.sampler = None;
        if let Some(mut active) = self.active.take() {
            active.handle.stop();
        }
        self.playing = false;
        self.sync_transport();
    }
}
