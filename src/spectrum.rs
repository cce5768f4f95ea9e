//! Background spectrum analysis for the visualizer.
//!
//! One [`SpectrumSampler`] runs per loaded track, decoding the file
//! independently of the playback handle and emitting normalized FFT
//! magnitude frames at a fixed cadence. Visualization is best-effort:
//! sampler errors terminate only the sampler, never playback.

mod dsp;
mod sampler;

pub use dsp::{FFT_SIZE, SPECTRUM_BINS, SpectrumAnalyzer, downmix};
pub use sampler::SpectrumSampler;
