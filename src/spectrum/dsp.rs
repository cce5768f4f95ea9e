use std::f32::consts::PI;
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex, num_complex::Complex32};

/// Fixed FFT size; short blocks are zero-padded up to this length.
pub const FFT_SIZE: usize = 1024;
/// Bins emitted per frame: the first half of the spectrum.
pub const SPECTRUM_BINS: usize = FFT_SIZE / 2;

/// Average interleaved multi-channel samples down to mono, one value per
/// frame.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    let channels = channels.max(1);
    let frames = interleaved.len() / channels;
    let mut mono = Vec::with_capacity(frames);
    for frame in 0..frames {
        let start = frame * channels;
        let sum: f32 = interleaved[start..start + channels].iter().sum();
        mono.push(sum / channels as f32);
    }
    mono
}

/// Reusable Hann-window + forward-FFT pipeline producing normalized
/// magnitude frames.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let input = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        Self {
            fft,
            input,
            spectrum,
            scratch,
        }
    }

    /// Window, transform and normalize one block of mono samples.
    ///
    /// Returns [`SPECTRUM_BINS`] magnitudes scaled by the frame maximum and
    /// clamped to `[0, 1.5]`, or `None` when the transform fails.
    pub fn analyze(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        for (i, slot) in self.input.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = sample * hann_value(i, FFT_SIZE);
        }

        self.fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .ok()?;

        let mut magnitudes: Vec<f32> = self.spectrum[..SPECTRUM_BINS]
            .iter()
            .map(|bin| bin.norm())
            .collect();
        normalize(&mut magnitudes);
        Some(magnitudes)
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

/// Scale by the frame maximum (1 when all-zero) and clamp to `[0, 1.5]`.
fn normalize(values: &mut [f32]) {
    let max = values.iter().copied().fold(0.0f32, f32::max);
    let scale = if max <= 0.0 { 1.0 } else { 1.0 / max };
    for value in values.iter_mut() {
        *value = (*value * scale).clamp(0.0, 1.5);
    }
}
