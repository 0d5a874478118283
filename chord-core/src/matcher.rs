//! # Template Matcher
//!
//! Scores a chroma vector against every chord template by cosine
//! similarity and returns the best match. Pure function of its inputs;
//! the only context it takes is the previously accepted label, which is
//! used as a stability bias when scores tie.

use crate::chroma::ChromaVector;
use crate::templates::{ChordLabel, TemplateBank};

/// Scores within this distance of the maximum count as tied.
const TIE_TOLERANCE: f32 = 1e-6;

/// Outcome of matching one chroma vector against the bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub label: ChordLabel,
    /// Cosine similarity in [0, 1] for non-negative inputs.
    pub score: f32,
}

/// Cosine similarity between two vectors; 0.0 when either is near zero,
/// so silent frames never produce a spurious perfect match.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = a.iter().map(|&x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm_a < 1e-9 || norm_b < 1e-9 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(&x, &y)| x * y).sum();
    dot / (norm_a * norm_b)
}

pub struct Matcher {
    bank: TemplateBank,
}

impl Matcher {
    pub fn new(bank: TemplateBank) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &TemplateBank {
        &self.bank
    }

    /// Finds the template most similar to `chroma`.
    ///
    /// Ties within floating-point tolerance are broken in favor of
    /// `previous` (the currently accepted label), then the lowest root,
    /// then major over minor. The last two fall out of the bank's build
    /// order, so the first tied entry wins.
    pub fn best_match(&self, chroma: &ChromaVector, previous: Option<ChordLabel>) -> MatchResult {
        let scores: Vec<f32> = self
            .bank
            .templates()
            .iter()
            .map(|t| cosine_similarity(&chroma.bins, &t.weights))
            .collect();

        let best_score = scores.iter().copied().fold(0.0f32, f32::max);

        let mut winner = None;
        for (template, &score) in self.bank.templates().iter().zip(&scores) {
            if best_score - score > TIE_TOLERANCE {
                continue;
            }
            if previous == Some(template.label) {
                winner = Some(template.label);
                break;
            }
            winner.get_or_insert(template.label);
        }

        MatchResult {
            // The bank always holds 24 templates, so a winner always exists.
            label: winner.unwrap_or_else(|| self.bank.templates()[0].label),
            score: best_score,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(TemplateBank::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chroma::PITCH_CLASSES;
    use crate::templates::ChordQuality;

    fn chroma_from(bins: [f32; PITCH_CLASSES]) -> ChromaVector {
        ChromaVector { bins, rms: 0.5 }
    }

    #[test]
    fn identical_vectors_score_one() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0; 12], &[1.0; 12]), 0.0);
    }

    #[test]
    fn template_matched_against_itself_returns_itself() {
        let matcher = Matcher::default();
        for template in matcher.bank().templates() {
            let result = matcher.best_match(&chroma_from(template.weights), None);
            assert_eq!(result.label, template.label);
            assert!((result.score - 1.0).abs() < 1e-5, "{}", template.label);
        }
    }

    #[test]
    fn c_major_triad_energy_matches_c_major() {
        let mut bins = [0.0f32; PITCH_CLASSES];
        bins[0] = 1.0; // C
        bins[4] = 1.0; // E
        bins[7] = 1.0; // G
        let result = matcher_result(bins, None);
        assert_eq!(
            result.label,
            ChordLabel::new(0, ChordQuality::Major)
        );
        assert!(result.score > 0.55);
    }

    #[test]
    fn tie_prefers_the_previous_label() {
        let matcher = Matcher::default();
        let c_major = ChordLabel::new(0, ChordQuality::Major);
        let c_minor = ChordLabel::new(0, ChordQuality::Minor);

        // Sum of both C templates is exactly equidistant from each: the
        // shared root and fifth dominate, and the two thirds are symmetric.
        let mut bins = [0.0f32; PITCH_CLASSES];
        for label in [c_major, c_minor] {
            let template = matcher.bank().get(label).unwrap();
            for (bin, weight) in bins.iter_mut().zip(&template.weights) {
                *bin += weight;
            }
        }
        let chroma = chroma_from(bins);

        let held = matcher.best_match(&chroma, Some(c_minor));
        assert_eq!(held.label, c_minor);

        // Without a previous label, the lowest root / major-first order wins.
        let fresh = matcher.best_match(&chroma, None);
        assert_eq!(fresh.label, c_major);
    }

    fn matcher_result(bins: [f32; PITCH_CLASSES], previous: Option<ChordLabel>) -> MatchResult {
        Matcher::default().best_match(&chroma_from(bins), previous)
    }
}
