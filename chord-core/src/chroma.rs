//! # Chroma Extraction
//!
//! Converts one analysis window into a 12-bin pitch-class energy vector:
//! DC offset removal, Hann windowing, forward FFT, and folding of every
//! spectral bin onto the chromatic scale. The FFT plan, the taper and the
//! bin-to-pitch-class mapping are all computed once at construction so the
//! per-window cost stays well under the hop duration.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::config::RecognizerConfig;

/// Number of pitch classes in the equal-tempered octave.
pub const PITCH_CLASSES: usize = 12;

/// Norms below this are treated as zero energy during normalization.
const NORM_EPSILON: f32 = 1e-9;

/// A 12-bin pitch-class profile paired with the RMS level of the frame it
/// was computed from.
///
/// The bins are L2-normalized (or all zero for a silent frame) so loudness
/// never biases template matching; the raw RMS rides along because the
/// stability filter still needs it for silence gating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaVector {
    /// Index 0 = C, ascending by semitone up to index 11 = B.
    pub bins: [f32; PITCH_CLASSES],
    /// Root mean square amplitude of the source frame.
    pub rms: f32,
}

impl ChromaVector {
    pub fn zero() -> Self {
        Self {
            bins: [0.0; PITCH_CLASSES],
            rms: 0.0,
        }
    }
}

/// Root mean square amplitude of a signal.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Stateless-per-window chroma extractor. Deterministic: the same window
/// always yields the same vector.
pub struct ChromaExtractor {
    fft: Arc<dyn Fft<f32>>,
    /// Precomputed Hann taper coefficients.
    taper: Vec<f32>,
    /// For each spectral bin below Nyquist, the pitch class it folds into,
    /// or `None` for bins outside the usable frequency range.
    bin_classes: Vec<Option<usize>>,
    window_size: usize,
    spectrum: Vec<Complex<f32>>,
}

impl ChromaExtractor {
    pub fn new(config: &RecognizerConfig) -> Self {
        let window_size = config.window_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);

        let taper = hann_window(window_size);
        let bin_classes = map_bins_to_pitch_classes(
            window_size,
            config.sample_rate,
            config.min_frequency,
        );

        Self {
            fft,
            taper,
            bin_classes,
            window_size,
            spectrum: vec![Complex { re: 0.0, im: 0.0 }; window_size],
        }
    }

    /// Computes the chroma vector for one analysis window.
    ///
    /// Windows of the wrong length and non-finite samples are handled
    /// defensively: a malformed window yields the zero vector rather than
    /// poisoning the matcher with NaN.
    pub fn extract(&mut self, window: &[f32]) -> ChromaVector {
        if window.len() != self.window_size {
            log::warn!(
                "skipping malformed window: expected {} samples, got {}",
                self.window_size,
                window.len()
            );
            return ChromaVector::zero();
        }

        // Sanitize before anything else so NaN never reaches the FFT.
        let mut frame: Vec<f32> = window
            .iter()
            .map(|&s| if s.is_finite() { s } else { 0.0 })
            .collect();

        let level = rms(&frame);
        remove_dc_offset(&mut frame);

        for ((out, &sample), &coefficient) in
            self.spectrum.iter_mut().zip(&frame).zip(&self.taper)
        {
            *out = Complex {
                re: sample * coefficient,
                im: 0.0,
            };
        }
        self.fft.process(&mut self.spectrum);

        let mut bins = [0.0f32; PITCH_CLASSES];
        for (value, class) in self.spectrum.iter().zip(&self.bin_classes) {
            if let Some(class) = class {
                bins[*class] += value.norm();
            }
        }

        normalize(&mut bins);
        ChromaVector { bins, rms: level }
    }
}

/// Subtracts the mean so a constant offset does not leak into the low bins.
fn remove_dc_offset(signal: &mut [f32]) {
    if signal.is_empty() {
        return;
    }
    let mean = signal.iter().sum::<f32>() / signal.len() as f32;
    if mean.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= mean;
        }
    }
}

/// Hann taper coefficients for a window of `n` samples.
fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let n_minus_1 = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos()))
        .collect()
}

/// Maps each FFT bin to the nearest pitch class, following
/// `round(69 + 12 * log2(f / 440)) mod 12` with A4 = 440 Hz.
///
/// Bins at DC, below the low cutoff or at/above Nyquist map to `None`.
/// Only the first half of the spectrum carries information for real input;
/// the mirrored half is excluded by the Nyquist bound.
fn map_bins_to_pitch_classes(
    window_size: usize,
    sample_rate: u32,
    min_frequency: f32,
) -> Vec<Option<usize>> {
    let nyquist = sample_rate as f32 / 2.0;
    let resolution = sample_rate as f32 / window_size as f32;
    (0..window_size)
        .map(|bin| {
            let frequency = bin as f32 * resolution;
            if bin == 0 || frequency < min_frequency || frequency >= nyquist {
                return None;
            }
            let midi = 69.0 + 12.0 * (frequency / 440.0).log2();
            Some((midi.round() as i32).rem_euclid(12) as usize)
        })
        .collect()
}

/// L2-normalizes the chroma bins; a near-zero-energy vector is left as
/// all zeros so silent windows never divide by zero.
fn normalize(bins: &mut [f32; PITCH_CLASSES]) {
    let norm = bins.iter().map(|&b| b * b).sum::<f32>().sqrt();
    if norm > NORM_EPSILON {
        for bin in bins.iter_mut() {
            *bin /= norm;
        }
    } else {
        *bins = [0.0; PITCH_CLASSES];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    fn extractor() -> ChromaExtractor {
        ChromaExtractor::new(&RecognizerConfig::default())
    }

    #[test]
    fn silent_window_yields_zero_vector() {
        let mut extractor = extractor();
        let chroma = extractor.extract(&vec![0.0; 2048]);
        assert_eq!(chroma.bins, [0.0; PITCH_CLASSES]);
        assert_eq!(chroma.rms, 0.0);
    }

    #[test]
    fn a440_lands_in_the_a_bin() {
        let mut extractor = extractor();
        let chroma = extractor.extract(&sine(440.0, 22_050, 2048));
        let strongest = chroma
            .bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(strongest, 9); // A is pitch class 9
        assert!(chroma.rms > 0.5);
    }

    #[test]
    fn extracted_vector_has_unit_norm() {
        let mut extractor = extractor();
        let chroma = extractor.extract(&sine(196.0, 22_050, 2048));
        let norm: f32 = chroma.bins.iter().map(|&b| b * b).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn non_finite_samples_are_neutralized() {
        let mut extractor = extractor();
        let mut window = sine(440.0, 22_050, 2048);
        window[100] = f32::NAN;
        window[200] = f32::INFINITY;
        let chroma = extractor.extract(&window);
        assert!(chroma.bins.iter().all(|b| b.is_finite()));
        assert!(chroma.rms.is_finite());
    }

    #[test]
    fn wrong_length_window_is_skipped_not_fatal() {
        let mut extractor = extractor();
        let chroma = extractor.extract(&[0.3; 100]);
        assert_eq!(chroma, ChromaVector::zero());
    }

    #[test]
    fn extraction_is_deterministic() {
        let mut extractor = extractor();
        let window = sine(329.63, 22_050, 2048);
        let first = extractor.extract(&window);
        let second = extractor.extract(&window);
        assert_eq!(first, second);
    }
}
