//! rodio-backed implementation of the player seams.
//!
//! One `OutputStream` for the lifetime of the backend; each loaded track
//! gets a fresh paused `Sink` with the decoded file appended.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::Error;

use super::types::{PlayerBackend, PlayerHandle};

pub struct RodioBackend {
    stream: OutputStream,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn open_default() -> crate::Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| Error::AudioOutput(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in
        // debugging, but noisy for a library embedded in a UI.
        stream.log_on_drop(false);
        Ok(Self { stream })
    }
}

impl PlayerBackend for RodioBackend {
    fn open(&mut self, path: &Path) -> crate::Result<Box<dyn PlayerHandle>> {
        let file = File::open(path).map_err(|e| Error::Unplayable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| Error::Unplayable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let duration = decoder.total_duration();

        let sink = Sink::connect_new(self.stream.mixer());
        sink.append(decoder);
        sink.pause();

        Ok(Box::new(RodioHandle { sink, duration }))
    }
}

struct RodioHandle {
    sink: Sink,
    duration: Option<Duration>,
}

impl PlayerHandle for RodioHandle {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn seek(&mut self, position: Duration) -> bool {
        self.sink.try_seek(position).is_ok()
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn finished(&self) -> bool {
        self.sink.empty()
    }
}

/// Stand-in used when no output device is available: every load fails as
/// unplayable and the core keeps running.
pub(super) struct NullBackend;

impl PlayerBackend for NullBackend {
    fn open(&mut self, path: &Path) -> crate::Result<Box<dyn PlayerHandle>> {
        Err(Error::Unplayable {
            path: path.to_path_buf(),
            reason: "no audio output device".to_string(),
        })
    }
}
