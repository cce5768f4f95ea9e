use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::warn;
use rodio::{Decoder, Source};

use crate::config::SpectrumSettings;
use crate::events::EventHub;

use super::dsp::{SpectrumAnalyzer, downmix};

/// Decode-and-FFT loop for one track.
///
/// Runs for as long as the track stays loaded, looping back to the start of
/// the file at EOF, independent of playback repeat semantics. Pausing idles
/// the loop instead of stopping it. Dropping the sampler cancels the loop
/// and joins the thread.
pub struct SpectrumSampler {
    cancel: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl SpectrumSampler {
    /// Spawn the sampling loop for `path`.
    pub fn start(path: PathBuf, events: Arc<EventHub>, settings: SpectrumSettings) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));

        let thread_cancel = cancel.clone();
        let thread_paused = paused.clone();
        let join = thread::spawn(move || {
            pump(&path, &events, &settings, &thread_cancel, &thread_paused);
        });

        Self {
            cancel,
            paused,
            join: Some(join),
        }
    }

    /// Idle (`true`) or resume (`false`) the loop without stopping it.
    pub fn pause(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }
}

impl Drop for SpectrumSampler {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

fn open_decoder(path: &Path) -> crate::Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| crate::Error::Unplayable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(decoder)
}

fn pump(
    path: &Path,
    events: &EventHub,
    settings: &SpectrumSettings,
    cancel: &AtomicBool,
    paused: &AtomicBool,
) {
    // Decode errors are non-fatal for the player: they end this sampler
    // instance only.
    let mut decoder = match open_decoder(path) {
        Ok(decoder) => decoder,
        Err(err) => {
            warn!("spectrum sampler could not open {}: {err}", path.display());
            return;
        }
    };

    let channels = decoder.channels().max(1) as usize;
    let block_len = settings.block_frames.max(1) * channels;
    let cadence = Duration::from_millis(settings.cadence_ms);
    let idle = Duration::from_millis(settings.paused_idle_ms);
    let mut analyzer = SpectrumAnalyzer::new();
    let mut block: Vec<f32> = Vec::with_capacity(block_len);

    while !cancel.load(Ordering::Relaxed) {
        if paused.load(Ordering::Relaxed) {
            thread::sleep(idle);
            continue;
        }

        block.clear();
        while block.len() < block_len {
            match decoder.next() {
                Some(sample) => block.push(sample),
                None => break,
            }
        }

        if block.is_empty() {
            // end of file: rewind and keep sampling
            if decoder.try_seek(Duration::ZERO).is_err() {
                decoder = match open_decoder(path) {
                    Ok(decoder) => decoder,
                    Err(err) => {
                        warn!("spectrum sampler lost {}: {err}", path.display());
                        return;
                    }
                };
            }
            continue;
        }

        let mono = downmix(&block, channels);
        if let Some(frame) = analyzer.analyze(&mono) {
            events.spectrum_frame.emit(&frame);
        }

        thread::sleep(cadence);
    }
}
