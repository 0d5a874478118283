// chord-core/src/lib.rs

//! The core logic for the realtime guitar chord display.
//! This crate is responsible for audio capture, chroma feature
//! extraction, chord template matching and the stability filtering
//! that decides when the shown chord changes. It is completely
//! headless and contains no rendering code.

pub mod audio;
pub mod buffer;
pub mod chroma;
pub mod config;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod stability;
pub mod templates;

pub use config::RecognizerConfig;
pub use error::{CaptureError, ConfigError};
pub use pipeline::ChordRecognizer;
pub use stability::ChordState;
pub use templates::{ChordLabel, ChordQuality};

/// An accepted change of the displayed chord.
///
/// Emitted by the pipeline whenever the stability filter accepts a new
/// state. Timestamps are seconds of audio since the stream started and
/// never decrease between consecutive updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordUpdate {
    /// The accepted chord, or `None` for "no chord".
    pub label: Option<ChordLabel>,
    /// Similarity score backing the decision (0.0 for silence).
    pub confidence: f32,
    /// Stream position in seconds at the end of the deciding window.
    pub timestamp: f64,
}

impl ChordUpdate {
    /// The label as display text, with `"no chord"` for silence.
    pub fn label_text(&self) -> String {
        match self.label {
            Some(label) => label.to_string(),
            None => "no chord".to_string(),
        }
    }
}
