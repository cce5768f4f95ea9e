//! The single top-level context object.
//!
//! A [`Controller`] owns the track library, the playlist registry, the
//! event hub, the import pipeline and the playback engine, and exposes
//! every inbound command of the core. It is constructed once and passed by
//! reference to whatever drives it; there are no ambient statics.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::audio::{
    BackendFactory, EngineCmd, PlaybackEngine, TransportHandle, TransportInfo, TransportRestore,
};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::EventHub;
use crate::import::ImportPipeline;
use crate::library::{Track, TrackLibrary, canonicalize_path, path_key, scan};
use crate::metadata::{LoftyReader, TagReader, track_from_path};
use crate::playlist::{Playlist, PlaylistRegistry};
use crate::state::{PlayerState, PlaylistState};
use crate::view::{self, FilterSortState, SortMode};

/// Everything the controller's background callbacks need to reach.
struct Shared {
    library: Arc<TrackLibrary>,
    playlists: Arc<PlaylistRegistry>,
    events: Arc<EventHub>,
    reader: Arc<dyn TagReader>,
    filter: Mutex<FilterSortState>,
    visible: Mutex<Vec<Track>>,
    engine_tx: Sender<EngineCmd>,
    transport: TransportHandle,
}

/// Recompute the visible list and hand the engine a fresh snapshot so it
/// can re-locate the current track by path.
fn refresh_view(shared: &Shared) {
    let list = {
        let filter = shared.filter.lock().unwrap();
        view::recompute(&shared.library, &shared.playlists, &filter)
    };
    *shared.visible.lock().unwrap() = list.clone();
    let _ = shared.engine_tx.send(EngineCmd::SyncView(list));
}

/// If no track is current yet, make the first visible one current without
/// starting playback.
fn ensure_default_current(shared: &Shared) {
    if shared.transport.lock().unwrap().current.is_some() {
        return;
    }
    if !shared.visible.lock().unwrap().is_empty() {
        let _ = shared.engine_tx.send(EngineCmd::SelectVisible(0));
    }
}

pub struct Controller {
    settings: Settings,
    shared: Arc<Shared>,
    engine: PlaybackEngine,
    import: ImportPipeline,
}

impl Controller {
    /// Controller wired to the default audio output and the lofty tag
    /// reader.
    pub fn new(settings: Settings) -> Self {
        let library = Arc::new(TrackLibrary::new());
        let events = Arc::new(EventHub::new());
        let engine = PlaybackEngine::with_default_output(
            library.clone(),
            events.clone(),
            settings.playback.clone(),
            settings.spectrum.clone(),
        );
        Self::assemble(settings, library, events, engine, Arc::new(LoftyReader))
    }

    /// Controller with explicit playback and metadata seams (tests, other
    /// outputs).
    pub fn with_parts(settings: Settings, factory: BackendFactory, reader: Arc<dyn TagReader>) -> Self {
        let library = Arc::new(TrackLibrary::new());
        let events = Arc::new(EventHub::new());
        let engine = PlaybackEngine::new(
            factory,
            library.clone(),
            events.clone(),
            settings.playback.clone(),
            settings.spectrum.clone(),
        );
        Self::assemble(settings, library, events, engine, reader)
    }

    fn assemble(
        settings: Settings,
        library: Arc<TrackLibrary>,
        events: Arc<EventHub>,
        engine: PlaybackEngine,
        reader: Arc<dyn TagReader>,
    ) -> Self {
        let shared = Arc::new(Shared {
            library: library.clone(),
            playlists: Arc::new(PlaylistRegistry::new()),
            events,
            reader: reader.clone(),
            filter: Mutex::new(FilterSortState {
                sort: SortMode::Title,
                ..FilterSortState::default()
            }),
            visible: Mutex::new(Vec::new()),
            engine_tx: engine.sender(),
            transport: engine.transport(),
        });
        let import = ImportPipeline::new(library, reader, settings.import.max_workers);
        Self {
            settings,
            shared,
            engine,
            import,
        }
    }

    // ---- observation --------------------------------------------------

    /// Event hub the embedding layer subscribes to.
    pub fn events(&self) -> Arc<EventHub> {
        self.shared.events.clone()
    }

    /// Snapshot of the current transport state.
    pub fn transport(&self) -> TransportInfo {
        self.shared.transport.lock().unwrap().clone()
    }

    /// The filtered/sorted track list currently visible.
    pub fn visible_tracks(&self) -> Vec<Track> {
        self.shared.visible.lock().unwrap().clone()
    }

    /// Every known track, in arbitrary order.
    pub fn all_tracks(&self) -> Vec<Track> {
        self.shared.library.snapshot()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.shared.transport.lock().unwrap().current.clone()
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        self.shared.playlists.snapshot()
    }

    // ---- library and import -------------------------------------------

    /// Add a single track synchronously. Re-adding a known path returns the
    /// existing record.
    pub fn add_track(&self, path: &Path) -> Result<Track> {
        if path.as_os_str().is_empty() {
            return Err(Error::invalid("track path must not be blank"));
        }
        if let Some(existing) = self.shared.library.get(path) {
            return Ok(existing);
        }

        let track = track_from_path(self.shared.reader.as_ref(), path);
        let track = self.shared.library.upsert(track);
        refresh_view(&self.shared);
        ensure_default_current(&self.shared);
        Ok(track)
    }

    /// Import a batch of candidate paths in the background, superseding any
    /// import still in flight. The view refreshes once when the batch
    /// completes.
    pub fn add_tracks(&self, paths: Vec<PathBuf>) {
        let shared = self.shared.clone();
        self.import.start(paths, move |_outcome| {
            refresh_view(&shared);
            ensure_default_current(&shared);
        });
    }

    /// Cancel the in-flight import, keeping whatever already landed.
    pub fn cancel_import(&self) {
        self.import.cancel();
    }

    /// Scan a directory for audio files and import them.
    pub fn import_directory(&self, dir: &Path) {
        self.add_tracks(scan(dir, &self.settings.library));
    }

    // ---- playback -----------------------------------------------------

    /// Play a track out of the visible list. A track not currently visible
    /// is ignored.
    pub fn play_track(&self, track: &Track) {
        let index = {
            let visible = self.shared.visible.lock().unwrap();
            visible.iter().position(|t| t.same_path(track))
        };
        if let Some(index) = index {
            self.engine.send(EngineCmd::PlayVisible(index));
        }
    }

    /// Play `track` within an ephemeral snapshot of `tracks`, so later
    /// filtering does not perturb the running sequence.
    pub fn play_from_playlist(&self, track: &Track, tracks: &[Track]) {
        let Some(index) = tracks.iter().position(|t| t.same_path(track)) else {
            return;
        };
        self.engine.send(EngineCmd::PlayEphemeral {
            tracks: tracks.to_vec(),
            index,
        });
    }

    /// Play an ephemeral sequence from its beginning.
    pub fn play_playlist(&self, tracks: &[Track]) {
        if tracks.is_empty() {
            return;
        }
        self.engine.send(EngineCmd::PlayEphemeral {
            tracks: tracks.to_vec(),
            index: 0,
        });
    }

    /// Resolve a named playlist against the library and play it.
    pub fn play_named_playlist(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::invalid("playlist name must not be blank"));
        }
        let Some(playlist) = self.shared.playlists.get(name) else {
            return Ok(());
        };
        let tracks: Vec<Track> = playlist
            .tracks
            .iter()
            .filter_map(|path| self.shared.library.get(path))
            .collect();
        self.play_playlist(&tracks);
        Ok(())
    }

    pub fn toggle_play_pause(&self) {
        self.engine.send(EngineCmd::TogglePlayPause);
    }

    pub fn next(&self) {
        self.engine.send(EngineCmd::Next);
    }

    pub fn prev(&self) {
        self.engine.send(EngineCmd::Prev);
    }

    pub fn stop(&self) {
        self.engine.send(EngineCmd::Stop);
    }

    pub fn toggle_shuffle(&self) {
        self.engine.send(EngineCmd::ToggleShuffle);
    }

    pub fn cycle_repeat_mode(&self) {
        self.engine.send(EngineCmd::CycleRepeat);
    }

    /// Seek to `fraction` of the current track's duration; values outside
    /// `[0, 1]` are clamped.
    pub fn seek_relative(&self, fraction: f64) {
        self.engine.send(EngineCmd::SeekRelative(fraction));
    }

    pub fn set_volume(&self, value: f64) {
        self.engine.send(EngineCmd::SetVolume(value));
    }

    pub fn toggle_mute(&self) {
        self.engine.send(EngineCmd::ToggleMute);
    }

    // ---- filtering and sorting ----------------------------------------

    pub fn set_filter(&self, query: &str) {
        self.shared.filter.lock().unwrap().query = query.trim().to_string();
        refresh_view(&self.shared);
    }

    /// Exact artist filter; `None` or a blank value clears it.
    pub fn set_artist_filter(&self, artist: Option<&str>) {
        self.shared.filter.lock().unwrap().artist = artist
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        refresh_view(&self.shared);
    }

    /// Exact album filter; `None` or a blank value clears it.
    pub fn set_album_filter(&self, album: Option<&str>) {
        self.shared.filter.lock().unwrap().album = album
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        refresh_view(&self.shared);
    }

    pub fn set_sort_mode(&self, sort: SortMode) {
        self.shared.filter.lock().unwrap().sort = sort;
        refresh_view(&self.shared);
    }

    /// Scope the visible list to a playlist; `None` or a blank name clears
    /// the scope.
    pub fn set_active_playlist(&self, name: Option<&str>) {
        self.shared.filter.lock().unwrap().active_playlist = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        refresh_view(&self.shared);
    }

    pub fn active_playlist(&self) -> Option<String> {
        self.shared.filter.lock().unwrap().active_playlist.clone()
    }

    // ---- playlists ----------------------------------------------------

    pub fn create_playlist(&self, name: &str) -> Result<Playlist> {
        self.shared.playlists.create(name)
    }

    pub fn rename_playlist(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.shared.playlists.rename(old_name, new_name)?;
        let mut filter = self.shared.filter.lock().unwrap();
        let follows = filter
            .active_playlist
            .as_deref()
            .is_some_and(|active| active.eq_ignore_ascii_case(old_name));
        if follows {
            filter.active_playlist = Some(new_name.to_string());
        }
        drop(filter);
        if follows {
            refresh_view(&self.shared);
        }
        Ok(())
    }

    /// Delete a playlist. Deleting the active playlist clears the
    /// active-playlist scope.
    pub fn delete_playlist(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::invalid("playlist name must not be blank"));
        }
        if !self.shared.playlists.delete(name) {
            return Ok(());
        }
        let mut filter = self.shared.filter.lock().unwrap();
        if filter
            .active_playlist
            .as_deref()
            .is_some_and(|active| active.eq_ignore_ascii_case(name))
        {
            filter.active_playlist = None;
        }
        drop(filter);
        refresh_view(&self.shared);
        Ok(())
    }

    pub fn add_track_to_playlist(&self, name: &str, track: &Track) -> Result<()> {
        self.shared.playlists.add_track(name, &track.path)?;
        self.refresh_if_active(name);
        Ok(())
    }

    pub fn remove_track_from_playlist(&self, name: &str, track: &Track) {
        self.shared.playlists.remove_track(name, &track.path);
        self.refresh_if_active(name);
    }

    pub fn add_to_favorites(&self, track: &Track) -> Result<()> {
        self.shared.playlists.add_to_favorites(&track.path)?;
        self.refresh_if_active(crate::playlist::FAVORITES);
        Ok(())
    }

    pub fn remove_from_favorites(&self, track: &Track) {
        self.shared.playlists.remove_from_favorites(&track.path);
        self.refresh_if_active(crate::playlist::FAVORITES);
    }

    pub fn is_favorite(&self, track: &Track) -> bool {
        self.shared.playlists.is_favorite(&track.path)
    }

    fn refresh_if_active(&self, name: &str) {
        let active = self
            .shared
            .filter
            .lock()
            .unwrap()
            .active_playlist
            .as_deref()
            .is_some_and(|active| active.eq_ignore_ascii_case(name));
        if active {
            refresh_view(&self.shared);
        }
    }

    // ---- persistence snapshots ----------------------------------------

    /// Snapshot of the player state: visible-list order first, then the
    /// rest of the library.
    pub fn capture_state(&self) -> PlayerState {
        let visible = self.shared.visible.lock().unwrap().clone();
        let transport = self.shared.transport.lock().unwrap().clone();

        let mut paths: Vec<PathBuf> = visible.iter().map(|t| t.path.clone()).collect();
        let mut seen: HashSet<String> = paths.iter().map(|p| path_key(p)).collect();
        for path in self.shared.library.paths() {
            if seen.insert(path_key(&path)) {
                paths.push(path);
            }
        }

        PlayerState {
            current_index: transport.index.filter(|i| *i < paths.len()),
            position_seconds: transport.position.as_secs_f64(),
            volume: transport.volume,
            is_muted: transport.muted,
            is_shuffle: transport.shuffle,
            repeat_mode: transport.repeat,
            tracks: paths,
        }
    }

    pub fn capture_playlists(&self) -> Vec<PlaylistState> {
        self.shared
            .playlists
            .snapshot()
            .iter()
            .map(PlaylistState::from)
            .collect()
    }

    /// Replace the in-memory state with persisted snapshots. Metadata is
    /// re-read for every path before the current selection and saved
    /// position are re-applied.
    pub fn restore_state(&self, state: PlayerState, playlists: Vec<PlaylistState>) {
        self.import.cancel();
        self.engine.send(EngineCmd::Stop);

        self.shared.library.clear();
        self.shared
            .playlists
            .replace_all(playlists.into_iter().map(Playlist::from).collect());
        *self.shared.filter.lock().unwrap() = FilterSortState::default();

        self.import.run_blocking(state.tracks.clone());

        self.engine.send(EngineCmd::RestoreTransport(TransportRestore {
            volume: state.volume,
            muted: state.is_muted,
            shuffle: state.is_shuffle,
            repeat: state.repeat_mode,
            position_seconds: state.position_seconds,
        }));
        refresh_view(&self.shared);

        // an index past the available paths means "no selection"
        if let Some(path) = state.current_index.and_then(|i| state.tracks.get(i)) {
            let key = path_key(&canonicalize_path(path));
            let index = self
                .shared
                .visible
                .lock()
                .unwrap()
                .iter()
                .position(|t| path_key(&t.path) == key);
            if let Some(index) = index {
                self.engine.send(EngineCmd::SelectVisible(index));
            }
        }
    }

    /// Cancel background work and stop the playback thread.
    pub fn shutdown(&self) {
        self.import.shutdown();
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PlayerBackend, PlayerHandle, RepeatMode};
    use crate::events::VolumeState;
    use crate::metadata::TrackTags;
    use std::time::{Duration, Instant};

    struct TestHandle;

    impl PlayerHandle for TestHandle {
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn stop(&mut self) {}
        fn seek(&mut self, _position: Duration) -> bool {
            true
        }
        fn set_volume(&mut self, _volume: f32) {}
        fn position(&self) -> Duration {
            Duration::ZERO
        }
        fn duration(&self) -> Option<Duration> {
            Some(Duration::from_secs(100))
        }
        fn finished(&self) -> bool {
            false
        }
    }

    struct TestBackend;

    impl PlayerBackend for TestBackend {
        fn open(&mut self, _path: &Path) -> crate::Result<Box<dyn PlayerHandle>> {
            Ok(Box::new(TestHandle))
        }
    }

    /// Maps the file stem to deterministic tags: `a` -> Alpha by X,
    /// `b` -> Beta by Y, anything else -> stem as title.
    struct StubReader;

    impl TagReader for StubReader {
        fn read_tags(&self, path: &Path) -> crate::Result<TrackTags> {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_ascii_lowercase();
            let (title, artist) = match stem.as_str() {
                "a" => ("Alpha", "X"),
                "b" => ("Beta", "Y"),
                other => return Ok(TrackTags {
                    title: Some(other.to_string()),
                    duration: Duration::from_secs(100),
                    ..TrackTags::default()
                }),
            };
            Ok(TrackTags {
                title: Some(title.to_string()),
                artist: Some(artist.to_string()),
                duration: Duration::from_secs(100),
                ..TrackTags::default()
            })
        }
    }

    fn controller() -> Controller {
        Controller::with_parts(
            Settings::default(),
            Box::new(|| Box::new(TestBackend) as Box<dyn PlayerBackend>),
            Arc::new(StubReader),
        )
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("condition not met within 5s");
    }

    fn current_title(controller: &Controller) -> Option<String> {
        controller.current_track().map(|t| t.title)
    }

    #[test]
    fn play_next_and_stop_at_the_end_of_the_visible_list() {
        let c = controller();
        c.add_track(Path::new("/music/a.mp3")).unwrap();
        c.add_track(Path::new("/music/b.mp3")).unwrap();

        let visible = c.visible_tracks();
        assert_eq!(
            visible.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
            vec!["Alpha", "Beta"]
        );

        c.play_track(&visible[0]);
        wait_until(|| current_title(&c).as_deref() == Some("Alpha") && c.transport().playing);

        c.next();
        wait_until(|| current_title(&c).as_deref() == Some("Beta"));

        // repeat is off: the end of the sequence is a stop
        c.next();
        wait_until(|| !c.transport().playing);
        c.shutdown();
    }

    #[test]
    fn free_text_filter_narrows_the_visible_list() {
        let c = controller();
        c.add_track(Path::new("/music/a.mp3")).unwrap();
        c.add_track(Path::new("/music/b.mp3")).unwrap();

        c.set_filter("alp");
        let visible = c.visible_tracks();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Alpha");

        c.set_filter("");
        assert_eq!(c.visible_tracks().len(), 2);
        c.shutdown();
    }

    #[test]
    fn first_added_track_becomes_current_without_playing() {
        let c = controller();
        c.add_track(Path::new("/music/a.mp3")).unwrap();

        wait_until(|| current_title(&c).as_deref() == Some("Alpha"));
        assert!(!c.transport().playing);
        // the library record carries the highlight flag
        wait_until(|| c.all_tracks().iter().any(|t| t.is_current));
        c.shutdown();
    }

    #[test]
    fn adding_a_known_path_returns_the_existing_record() {
        let c = controller();
        let first = c.add_track(Path::new("/music/a.mp3")).unwrap();
        let again = c.add_track(Path::new("/music/A.MP3")).unwrap();

        assert_eq!(first.title, again.title);
        assert_eq!(c.all_tracks().len(), 1);
        assert!(c.add_track(Path::new("")).is_err());
        c.shutdown();
    }

    #[test]
    fn background_import_refreshes_once_and_selects_a_default() {
        let c = controller();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| PathBuf::from(format!("/music/track{i}.mp3")))
            .collect();
        c.add_tracks(paths);

        wait_until(|| c.all_tracks().len() == 5);
        wait_until(|| c.current_track().is_some());
        assert!(!c.transport().playing);
        assert_eq!(c.visible_tracks().len(), 5);
        c.shutdown();
    }

    #[test]
    fn mute_round_trip_emits_the_expected_volume_events() {
        let c = controller();
        let seen: Arc<Mutex<Vec<VolumeState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        c.events()
            .volume_state_changed
            .subscribe(move |v| sink.lock().unwrap().push(v.clone()));

        c.set_volume(0.6);
        c.toggle_mute();
        c.toggle_mute();

        wait_until(|| seen.lock().unwrap().len() == 3);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], VolumeState { volume: 0.6, muted: false });
        assert_eq!(seen[1], VolumeState { volume: 0.0, muted: true });
        assert_eq!(seen[2], VolumeState { volume: 0.6, muted: false });
        drop(seen);
        c.shutdown();
    }

    #[test]
    fn deleting_the_active_playlist_clears_the_scope() {
        let c = controller();
        let alpha = c.add_track(Path::new("/music/a.mp3")).unwrap();
        c.add_track(Path::new("/music/b.mp3")).unwrap();

        c.add_track_to_playlist("Mix", &alpha).unwrap();
        c.set_active_playlist(Some("Mix"));
        assert_eq!(c.visible_tracks().len(), 1);
        assert_eq!(c.active_playlist().as_deref(), Some("Mix"));

        c.delete_playlist("mix").unwrap();
        assert_eq!(c.active_playlist(), None);
        assert_eq!(c.visible_tracks().len(), 2);
        c.shutdown();
    }

    #[test]
    fn renaming_the_active_playlist_keeps_the_scope() {
        let c = controller();
        let alpha = c.add_track(Path::new("/music/a.mp3")).unwrap();
        c.add_track(Path::new("/music/b.mp3")).unwrap();
        c.add_track_to_playlist("Mix", &alpha).unwrap();
        c.set_active_playlist(Some("Mix"));

        c.rename_playlist("Mix", "Best Of").unwrap();
        assert_eq!(c.active_playlist().as_deref(), Some("Best Of"));
        assert_eq!(c.visible_tracks().len(), 1);
        c.shutdown();
    }

    #[test]
    fn playlist_playback_uses_an_ephemeral_snapshot() {
        let c = controller();
        let alpha = c.add_track(Path::new("/music/a.mp3")).unwrap();
        let beta = c.add_track(Path::new("/music/b.mp3")).unwrap();
        c.add_track_to_playlist("Mix", &beta).unwrap();
        c.add_track_to_playlist("Mix", &alpha).unwrap();

        c.play_named_playlist("Mix").unwrap();
        wait_until(|| current_title(&c).as_deref() == Some("Beta") && c.transport().playing);

        // narrowing the visible list does not derail the playlist sequence
        c.set_filter("no such track");
        assert!(c.visible_tracks().is_empty());
        c.next();
        wait_until(|| current_title(&c).as_deref() == Some("Alpha"));
        c.shutdown();
    }

    #[test]
    fn favorites_helpers_use_the_reserved_playlist() {
        let c = controller();
        let alpha = c.add_track(Path::new("/music/a.mp3")).unwrap();

        assert!(!c.is_favorite(&alpha));
        c.add_to_favorites(&alpha).unwrap();
        assert!(c.is_favorite(&alpha));
        assert!(c.playlists().iter().any(|p| p.name == "Favorites"));
        c.remove_from_favorites(&alpha);
        assert!(!c.is_favorite(&alpha));
        c.shutdown();
    }

    #[test]
    fn capture_and_restore_round_trip() {
        let c = controller();
        c.add_track(Path::new("/music/a.mp3")).unwrap();
        let beta = c.add_track(Path::new("/music/b.mp3")).unwrap();
        c.add_track_to_playlist("Mix", &beta).unwrap();
        c.play_track(&beta);
        wait_until(|| current_title(&c).as_deref() == Some("Beta"));

        let state = c.capture_state();
        let playlists = c.capture_playlists();
        assert_eq!(state.tracks.len(), 2);
        assert_eq!(state.current_index, Some(1));
        assert_eq!(playlists.len(), 1);
        c.shutdown();

        let restored = controller();
        restored.restore_state(state, playlists);
        wait_until(|| restored.all_tracks().len() == 2);
        wait_until(|| current_title(&restored).as_deref() == Some("Beta"));
        assert!(!restored.transport().playing);
        assert!(restored.playlists().iter().any(|p| p.name == "Mix"));
        restored.shutdown();
    }

    #[test]
    fn restore_treats_an_out_of_range_index_as_no_selection() {
        let c = controller();
        let state = PlayerState {
            tracks: vec![PathBuf::from("/music/a.mp3")],
            current_index: Some(7),
            ..PlayerState::default()
        };
        c.restore_state(state, Vec::new());

        wait_until(|| c.all_tracks().len() == 1);
        std::thread::sleep(Duration::from_millis(50));
        assert!(c.current_track().is_none());
        c.shutdown();
    }

    #[test]
    fn cycle_repeat_walks_off_all_one() {
        let c = controller();
        assert_eq!(c.transport().repeat, RepeatMode::Off);
        c.cycle_repeat_mode();
        wait_until(|| c.transport().repeat == RepeatMode::All);
        c.cycle_repeat_mode();
        wait_until(|| c.transport().repeat == RepeatMode::One);
        c.cycle_repeat_mode();
        wait_until(|| c.transport().repeat == RepeatMode::Off);
        c.shutdown();
    }
}
