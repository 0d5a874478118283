//! # Recognition Configuration
//!
//! All tunable parameters of the chord recognition pipeline, with defaults
//! matching a resource-constrained device (22.05 kHz, 2048-sample windows).
//! Every field has a serde default so a settings file only needs to name
//! the values it overrides.

use serde::Deserialize;

use crate::error::ConfigError;

/// Relative weights of the triad tones inside a chord template.
///
/// The root is weighted highest by default so that inversions and strong
/// bass notes pull the match toward the intended root.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateWeights {
    pub root: f32,
    pub third: f32,
    pub fifth: f32,
}

impl Default for TemplateWeights {
    fn default() -> Self {
        Self {
            root: 1.0,
            third: 0.8,
            fifth: 0.8,
        }
    }
}

/// Parameters for the streaming chord recognition pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// FFT / analysis window length in samples.
    pub window_size: usize,
    /// Fraction of each window shared with the next one, in [0, 1).
    pub overlap: f32,
    /// Exponential moving average factor for chroma smoothing, in [0, 1).
    /// Higher values favor stability over reaction time.
    pub smoothing: f32,
    /// Minimum cosine similarity before a match may change the label.
    pub min_confidence: f32,
    /// Smoothed frame RMS below this value is treated as silence.
    pub silence_rms: f32,
    /// Consecutive windows a new candidate must win before it is accepted.
    pub hold_windows: u32,
    /// Spectral bins below this frequency (Hz) are ignored to keep
    /// sub-bass hum out of the chroma vector.
    pub min_frequency: f32,
    /// Triad tone weights used to build the template bank.
    pub weights: TemplateWeights,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            window_size: 2048,
            overlap: 0.5,
            smoothing: 0.7,
            min_confidence: 0.55,
            silence_rms: 0.01,
            hold_windows: 3,
            min_frequency: 40.0,
            weights: TemplateWeights::default(),
        }
    }
}

impl RecognizerConfig {
    /// Samples advanced between consecutive analysis windows.
    /// Always at least 1 so extraction makes progress.
    pub fn hop(&self) -> usize {
        let hop = (self.window_size as f32 * (1.0 - self.overlap)).round() as usize;
        hop.max(1)
    }

    /// Upper frequency limit of the spectrum in Hz.
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Checks every parameter against its valid range.
    ///
    /// Returns the first violation found. Called once at startup;
    /// misconfiguration is the only fatal failure in the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::SampleRate);
        }
        if self.window_size == 0 {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        if !(0.0..1.0).contains(&self.overlap) || !self.overlap.is_finite() {
            return Err(ConfigError::Overlap(self.overlap));
        }
        if !(0.0..1.0).contains(&self.smoothing) || !self.smoothing.is_finite() {
            return Err(ConfigError::Smoothing(self.smoothing));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) || !self.min_confidence.is_finite() {
            return Err(ConfigError::Confidence(self.min_confidence));
        }
        if self.silence_rms < 0.0 || !self.silence_rms.is_finite() {
            return Err(ConfigError::SilenceThreshold(self.silence_rms));
        }
        if self.hold_windows == 0 {
            return Err(ConfigError::HoldWindows);
        }
        for weight in [self.weights.root, self.weights.third, self.weights.fifth] {
            if weight <= 0.0 || !weight.is_finite() {
                return Err(ConfigError::TemplateWeight(weight));
            }
        }
        if self.min_frequency < 0.0
            || !self.min_frequency.is_finite()
            || self.min_frequency >= self.nyquist()
        {
            return Err(ConfigError::FrequencyRange {
                min: self.min_frequency,
                nyquist: self.nyquist(),
            });
        }
        Ok(())
    }
}
