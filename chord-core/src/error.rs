//! Error types for configuration validation and audio capture.

use thiserror::Error;

/// A configuration value was out of its valid range.
///
/// Raised at startup by [`crate::config::RecognizerConfig::validate`];
/// values are never silently clamped.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    SampleRate,

    #[error("window size must be positive, got {0}")]
    WindowSize(usize),

    #[error("overlap fraction must be in [0, 1), got {0}")]
    Overlap(f32),

    #[error("smoothing factor must be in [0, 1), got {0}")]
    Smoothing(f32),

    #[error("confidence threshold must be in [0, 1], got {0}")]
    Confidence(f32),

    #[error("silence threshold must be a non-negative number, got {0}")]
    SilenceThreshold(f32),

    #[error("hold window count must be at least 1")]
    HoldWindows,

    #[error("template weights must be positive numbers, got {0}")]
    TemplateWeight(f32),

    #[error("minimum frequency {min} Hz must be non-negative and below the Nyquist limit {nyquist} Hz")]
    FrequencyRange { min: f32, nyquist: f32 },
}

/// Audio capture could not be started or failed while running.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No usable capture backend or device. The recognition pipeline has no
    /// recovery responsibility here; callers decide whether to exit.
    #[error("audio capture unavailable: {0}")]
    Unavailable(String),

    #[error("audio stream error: {0}")]
    Stream(String),
}
