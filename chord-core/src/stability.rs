//! # Stability Filter
//!
//! The state machine that decides which chord is actually shown. Raw chroma
//! frames jitter with pick noise and strum transients, so the filter smooths
//! them with an exponential moving average and requires a new candidate to
//! win several consecutive windows before the displayed label changes.
//!
//! States are `Silence` and `Chord(label)`; both are steady and revisitable,
//! and the filter runs for the lifetime of the process.

use crate::chroma::{ChromaVector, PITCH_CLASSES};
use crate::config::RecognizerConfig;
use crate::matcher::Matcher;
use crate::templates::ChordLabel;

/// The currently accepted recognition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordState {
    /// No chord is sounding (or nothing loud enough to judge).
    Silence,
    Chord(ChordLabel),
}

impl ChordState {
    pub fn label(&self) -> Option<ChordLabel> {
        match self {
            ChordState::Silence => None,
            ChordState::Chord(label) => Some(*label),
        }
    }
}

/// Per-window outcome of the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: ChordState,
    /// Similarity score backing the current state; 0.0 in silence.
    pub confidence: f32,
    /// True when this window changed the accepted state.
    pub changed: bool,
}

/// Smooths chroma over time and applies silence, confidence and hysteresis
/// gates before accepting a chord change.
pub struct StabilityFilter {
    smoothing: f32,
    min_confidence: f32,
    silence_rms: f32,
    hold_windows: u32,
    smoothed: Option<ChromaVector>,
    state: ChordState,
    /// A differing candidate and the number of consecutive windows it has won.
    challenger: Option<(ChordLabel, u32)>,
}

impl StabilityFilter {
    pub fn new(config: &RecognizerConfig) -> Self {
        Self {
            smoothing: config.smoothing,
            min_confidence: config.min_confidence,
            silence_rms: config.silence_rms,
            hold_windows: config.hold_windows,
            smoothed: None,
            state: ChordState::Silence,
            challenger: None,
        }
    }

    pub fn state(&self) -> ChordState {
        self.state
    }

    /// Feeds one raw chroma frame through the filter.
    pub fn process(&mut self, raw: ChromaVector, matcher: &Matcher) -> Decision {
        let smoothed = self.smooth(raw);

        // Silence overrides everything, including a confident-looking match
        // on whatever low-level noise remains in the smoothed bins.
        if smoothed.rms < self.silence_rms {
            let changed = self.state != ChordState::Silence;
            self.state = ChordState::Silence;
            self.challenger = None;
            return Decision {
                state: self.state,
                confidence: 0.0,
                changed,
            };
        }

        let result = matcher.best_match(&smoothed, self.state.label());

        // Low-confidence frames never trigger a change; they also reset the
        // challenger streak so ambiguous strums cannot creep past the gate.
        if result.score < self.min_confidence {
            self.challenger = None;
            return Decision {
                state: self.state,
                confidence: result.score,
                changed: false,
            };
        }

        if self.state == ChordState::Chord(result.label) {
            // Candidate equals the accepted chord: stay, refresh confidence.
            self.challenger = None;
            return Decision {
                state: self.state,
                confidence: result.score,
                changed: false,
            };
        }

        // Hysteresis: the candidate must win hold_windows consecutive
        // windows before the transition is accepted.
        let streak = match self.challenger {
            Some((label, streak)) if label == result.label => streak + 1,
            _ => 1,
        };

        if streak >= self.hold_windows {
            self.state = ChordState::Chord(result.label);
            self.challenger = None;
            Decision {
                state: self.state,
                confidence: result.score,
                changed: true,
            }
        } else {
            self.challenger = Some((result.label, streak));
            Decision {
                state: self.state,
                confidence: result.score,
                changed: false,
            }
        }
    }

    /// Exponential moving average of bins and RMS. The first frame is
    /// adopted as-is so recognition does not start from an artificial
    /// silence bias.
    fn smooth(&mut self, raw: ChromaVector) -> ChromaVector {
        let smoothed = match self.smoothed {
            None => raw,
            Some(previous) => {
                let alpha = self.smoothing;
                let mut bins = [0.0f32; PITCH_CLASSES];
                for (bin, (&old, &new)) in
                    bins.iter_mut().zip(previous.bins.iter().zip(&raw.bins))
                {
                    *bin = alpha * old + (1.0 - alpha) * new;
                }
                ChromaVector {
                    bins,
                    rms: alpha * previous.rms + (1.0 - alpha) * raw.rms,
                }
            }
        };
        self.smoothed = Some(smoothed);
        smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{ChordQuality, TemplateBank};

    fn template_chroma(matcher: &Matcher, label: ChordLabel) -> ChromaVector {
        let template = matcher.bank().get(label).unwrap();
        ChromaVector {
            bins: template.weights,
            rms: 0.5,
        }
    }

    fn filter_with(config: RecognizerConfig) -> StabilityFilter {
        StabilityFilter::new(&config)
    }

    fn c_major() -> ChordLabel {
        ChordLabel::new(0, ChordQuality::Major)
    }

    fn g_major() -> ChordLabel {
        ChordLabel::new(7, ChordQuality::Major)
    }

    #[test]
    fn a_chord_needs_the_full_hold_streak() {
        let matcher = Matcher::default();
        let mut filter = filter_with(RecognizerConfig::default());
        let chroma = template_chroma(&matcher, c_major());

        assert!(!filter.process(chroma, &matcher).changed);
        assert!(!filter.process(chroma, &matcher).changed);
        let third = filter.process(chroma, &matcher);
        assert!(third.changed);
        assert_eq!(third.state, ChordState::Chord(c_major()));
    }

    #[test]
    fn oscillating_candidates_never_flicker() {
        let matcher = Matcher::default();
        // No smoothing so each window carries its own candidate cleanly.
        let mut filter = filter_with(RecognizerConfig {
            smoothing: 0.0,
            ..Default::default()
        });

        let c = template_chroma(&matcher, c_major());
        let g = template_chroma(&matcher, g_major());

        let mut changes = 0;
        for i in 0..40 {
            let frame = if i % 2 == 0 { c } else { g };
            if filter.process(frame, &matcher).changed {
                changes += 1;
            }
        }
        // Neither candidate ever sustains the hold streak.
        assert_eq!(changes, 0);
        assert_eq!(filter.state(), ChordState::Silence);
    }

    #[test]
    fn silence_resets_to_no_chord_once() {
        let matcher = Matcher::default();
        let mut filter = filter_with(RecognizerConfig {
            smoothing: 0.0,
            ..Default::default()
        });
        let chroma = template_chroma(&matcher, c_major());
        for _ in 0..3 {
            filter.process(chroma, &matcher);
        }
        assert_eq!(filter.state(), ChordState::Chord(c_major()));

        let quiet = ChromaVector {
            bins: chroma.bins,
            rms: 0.001,
        };
        let first = filter.process(quiet, &matcher);
        assert!(first.changed);
        assert_eq!(first.state, ChordState::Silence);
        assert_eq!(first.confidence, 0.0);

        let second = filter.process(quiet, &matcher);
        assert!(!second.changed);
    }

    #[test]
    fn low_confidence_frames_never_change_the_label() {
        let matcher = Matcher::default();
        // Raise the bar so only exact template frames pass the gate.
        let mut filter = filter_with(RecognizerConfig {
            smoothing: 0.0,
            min_confidence: 0.99,
            ..Default::default()
        });

        let c = template_chroma(&matcher, c_major());
        for _ in 0..3 {
            filter.process(c, &matcher);
        }
        assert_eq!(filter.state(), ChordState::Chord(c_major()));

        // A blend of C and G scores well below 0.99 against either.
        let g = template_chroma(&matcher, g_major());
        let mut bins = [0.0f32; PITCH_CLASSES];
        for (bin, (&a, &b)) in bins.iter_mut().zip(c.bins.iter().zip(&g.bins)) {
            *bin = 0.5 * (a + b);
        }
        let ambiguous = ChromaVector { bins, rms: 0.5 };
        for _ in 0..10 {
            let decision = filter.process(ambiguous, &matcher);
            assert!(!decision.changed);
            assert_eq!(decision.state, ChordState::Chord(c_major()));
        }
    }

    #[test]
    fn interrupted_streaks_start_over() {
        let matcher = Matcher::default();
        let mut filter = filter_with(RecognizerConfig {
            smoothing: 0.0,
            ..Default::default()
        });
        let c = template_chroma(&matcher, c_major());
        let g = template_chroma(&matcher, g_major());

        filter.process(c, &matcher);
        filter.process(c, &matcher);
        filter.process(g, &matcher); // breaks the C streak
        let fourth = filter.process(c, &matcher);
        assert!(!fourth.changed); // C is back to streak 1
    }

    #[test]
    fn custom_bank_weights_flow_through() {
        let config = RecognizerConfig::default();
        let matcher = Matcher::new(TemplateBank::new(config.weights));
        let mut filter = filter_with(config);
        let chroma = template_chroma(&matcher, g_major());
        for _ in 0..3 {
            filter.process(chroma, &matcher);
        }
        assert_eq!(filter.state(), ChordState::Chord(g_major()));
    }
}
