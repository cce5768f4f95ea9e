use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use log::warn;

use crate::config::{PlaybackSettings, SpectrumSettings};
use crate::events::EventHub;
use crate::library::TrackLibrary;

use super::engine::spawn_engine_thread;
use super::output::{NullBackend, RodioBackend};
use super::types::{BackendFactory, EngineCmd, PlayerBackend, TransportHandle, TransportInfo};

/// Facade over the playback thread: command sender, shared transport
/// handle and join-on-shutdown.
pub struct PlaybackEngine {
    tx: Sender<EngineCmd>,
    transport: TransportHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackEngine {
    pub fn new(
        factory: BackendFactory,
        library: Arc<TrackLibrary>,
        events: Arc<EventHub>,
        playback: PlaybackSettings,
        spectrum: SpectrumSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let transport: TransportHandle = Arc::new(Mutex::new(TransportInfo {
            volume: playback.volume.clamp(0.0, 1.0),
            shuffle: playback.shuffle,
            repeat: playback.repeat.into(),
            ..TransportInfo::default()
        }));

        let join = spawn_engine_thread(
            rx,
            factory,
            library,
            events,
            transport.clone(),
            playback,
            spectrum,
        );

        Self {
            tx,
            transport,
            join: Mutex::new(Some(join)),
        }
    }

    /// Engine wired to the default audio output. A missing output device is
    /// not fatal: every load then fails as unplayable and the core keeps
    /// running.
    pub fn with_default_output(
        library: Arc<TrackLibrary>,
        events: Arc<EventHub>,
        playback: PlaybackSettings,
        spectrum: SpectrumSettings,
    ) -> Self {
        Self::new(
            Box::new(default_backend),
            library,
            events,
            playback,
            spectrum,
        )
    }

    pub fn send(&self, cmd: EngineCmd) {
        let _ = self.tx.send(cmd);
    }

    /// Cloneable command sender for collaborators that outlive a borrow.
    pub fn sender(&self) -> Sender<EngineCmd> {
        self.tx.clone()
    }

    pub fn transport(&self) -> TransportHandle {
        self.transport.clone()
    }

    /// Current transport values, cloned out of the shared handle.
    pub fn snapshot(&self) -> TransportInfo {
        self.transport.lock().unwrap().clone()
    }

    /// Stop the engine thread and wait for it to finish.
    pub fn shutdown(&self) {
        let _ = self.tx.send(EngineCmd::Quit);
        if let Ok(mut join) = self.join.lock() {
            if let Some(handle) = join.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn default_backend() -> Box<dyn PlayerBackend> {
    match RodioBackend::open_default() {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            warn!("{err}; playback disabled");
            Box::new(NullBackend)
        }
    }
}
