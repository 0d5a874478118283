//! # Pipeline Driver
//!
//! Owns every stage of the recognition pipeline (buffer, extractor,
//! matcher, filter) and runs them in a fixed cycle: push captured samples,
//! drain all ready windows, and report an update whenever the accepted
//! label changes. No ambient state; drop the recognizer and everything
//! is gone.

use crossbeam_channel::{Receiver, Sender, select};

use crate::ChordUpdate;
use crate::buffer::SampleBuffer;
use crate::chroma::ChromaExtractor;
use crate::config::RecognizerConfig;
use crate::error::ConfigError;
use crate::matcher::Matcher;
use crate::stability::{ChordState, StabilityFilter};
use crate::templates::TemplateBank;

/// The complete streaming chord recognizer.
pub struct ChordRecognizer {
    buffer: SampleBuffer,
    extractor: ChromaExtractor,
    matcher: Matcher,
    filter: StabilityFilter,
    window_seconds: f64,
    hop_seconds: f64,
    windows_processed: u64,
}

impl ChordRecognizer {
    /// Validates the configuration and builds all pipeline stages.
    pub fn new(config: &RecognizerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let hop = config.hop();
        let rate = config.sample_rate as f64;
        Ok(Self {
            buffer: SampleBuffer::new(config.window_size, hop),
            extractor: ChromaExtractor::new(config),
            matcher: Matcher::new(TemplateBank::new(config.weights)),
            filter: StabilityFilter::new(config),
            window_seconds: config.window_size as f64 / rate,
            hop_seconds: hop as f64 / rate,
            windows_processed: 0,
        })
    }

    /// Feeds newly captured samples through the pipeline.
    ///
    /// Returns one update per accepted state change, in chronological
    /// order with monotonically non-decreasing timestamps. An empty vec
    /// means the display keeps showing what it already shows.
    pub fn push_samples(&mut self, samples: &[f32]) -> Vec<ChordUpdate> {
        self.buffer.push(samples);

        let mut updates = Vec::new();
        while let Some(window) = self.buffer.try_extract_window() {
            let chroma = self.extractor.extract(&window);
            let decision = self.filter.process(chroma, &self.matcher);
            self.windows_processed += 1;

            if decision.changed {
                let update = ChordUpdate {
                    label: decision.state.label(),
                    confidence: decision.confidence,
                    timestamp: self.stream_position(),
                };
                log::debug!(
                    "accepted {} at {:.2}s (confidence {:.2})",
                    update.label_text(),
                    update.timestamp,
                    update.confidence
                );
                updates.push(update);
            }
        }
        updates
    }

    /// The currently accepted recognition state.
    pub fn state(&self) -> ChordState {
        self.filter.state()
    }

    /// Analysis windows processed so far.
    pub fn windows_processed(&self) -> u64 {
        self.windows_processed
    }

    /// Samples dropped by the capture buffer due to overload.
    pub fn dropped_samples(&self) -> u64 {
        self.buffer.dropped_samples()
    }

    /// Stream time in seconds at the end of the last processed window.
    fn stream_position(&self) -> f64 {
        self.window_seconds + self.windows_processed.saturating_sub(1) as f64 * self.hop_seconds
    }
}

/// Runs a recognizer against a live capture channel until the channel
/// closes or a shutdown signal arrives.
///
/// One producer (the capture callback) feeds `raw_rx`; this loop is the
/// single consumer. Updates go out on `update_tx`; a closed update channel
/// also ends the loop. There is nothing to flush on exit.
pub fn run_recognition_loop(
    mut recognizer: ChordRecognizer,
    raw_rx: Receiver<Vec<f32>>,
    update_tx: Sender<ChordUpdate>,
    shutdown_rx: Receiver<()>,
) {
    loop {
        select! {
            recv(raw_rx) -> msg => match msg {
                Ok(chunk) => {
                    for update in recognizer.push_samples(&chunk) {
                        if update_tx.send(update).is_err() {
                            log::info!("update channel closed, stopping recognition");
                            return;
                        }
                    }
                }
                Err(_) => {
                    log::info!("capture channel closed, stopping recognition");
                    return;
                }
            },
            recv(shutdown_rx) -> _ => {
                log::info!(
                    "shutdown requested after {} windows ({} samples dropped)",
                    recognizer.windows_processed(),
                    recognizer.dropped_samples()
                );
                return;
            }
        }
    }
}
