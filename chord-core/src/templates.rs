//! # Chord Template Bank
//!
//! The 24 reference profiles (12 roots x major/minor) that chroma vectors
//! are matched against. Built once at startup from the configured triad
//! weights and never mutated afterwards.

use std::fmt;

use crate::chroma::PITCH_CLASSES;
use crate::config::TemplateWeights;

/// Pitch class names, index 0 = C.
pub const NOTE_NAMES: [&str; PITCH_CLASSES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Triad quality of a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    Major,
    Minor,
}

impl ChordQuality {
    /// Semitone offset of the third above the root.
    fn third_interval(self) -> usize {
        match self {
            ChordQuality::Major => 4,
            ChordQuality::Minor => 3,
        }
    }
}

/// A named chord: root pitch class (0-11, 0 = C) and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChordLabel {
    pub root: u8,
    pub quality: ChordQuality,
}

impl ChordLabel {
    pub fn new(root: u8, quality: ChordQuality) -> Self {
        debug_assert!((root as usize) < PITCH_CLASSES);
        Self { root, quality }
    }
}

impl fmt::Display for ChordLabel {
    /// Renders as `C`, `F#m`, `A#`, ... matching guitar chart convention.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.quality {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
        };
        write!(f, "{}{}", NOTE_NAMES[self.root as usize % PITCH_CLASSES], suffix)
    }
}

/// One reference profile: a label and its unit-norm 12-bin weight vector.
#[derive(Debug, Clone)]
pub struct ChordTemplate {
    pub label: ChordLabel,
    pub weights: [f32; PITCH_CLASSES],
}

/// Read-only bank of all 24 triad templates, ordered by ascending root
/// with major before minor. That ordering doubles as the matcher's
/// final tie-break.
#[derive(Debug, Clone)]
pub struct TemplateBank {
    templates: Vec<ChordTemplate>,
}

impl TemplateBank {
    pub fn new(weights: TemplateWeights) -> Self {
        let mut templates = Vec::with_capacity(PITCH_CLASSES * 2);
        for root in 0..PITCH_CLASSES as u8 {
            for quality in [ChordQuality::Major, ChordQuality::Minor] {
                templates.push(build_template(root, quality, weights));
            }
        }
        Self { templates }
    }

    pub fn templates(&self) -> &[ChordTemplate] {
        &self.templates
    }

    pub fn get(&self, label: ChordLabel) -> Option<&ChordTemplate> {
        self.templates.iter().find(|t| t.label == label)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateBank {
    fn default() -> Self {
        Self::new(TemplateWeights::default())
    }
}

fn build_template(root: u8, quality: ChordQuality, weights: TemplateWeights) -> ChordTemplate {
    let label = ChordLabel::new(root, quality);
    let root = root as usize;
    let mut profile = [0.0f32; PITCH_CLASSES];
    profile[root] = weights.root;
    profile[(root + quality.third_interval()) % PITCH_CLASSES] = weights.third;
    profile[(root + 7) % PITCH_CLASSES] = weights.fifth;

    // Unit norm so cosine scores of templates against themselves are 1.0.
    let norm = profile.iter().map(|&w| w * w).sum::<f32>().sqrt();
    for weight in profile.iter_mut() {
        *weight /= norm;
    }

    ChordTemplate {
        label,
        weights: profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_holds_all_24_chords() {
        let bank = TemplateBank::default();
        assert_eq!(bank.len(), 24);
    }

    #[test]
    fn labels_render_like_guitar_charts() {
        assert_eq!(ChordLabel::new(0, ChordQuality::Major).to_string(), "C");
        assert_eq!(ChordLabel::new(0, ChordQuality::Minor).to_string(), "Cm");
        assert_eq!(ChordLabel::new(6, ChordQuality::Minor).to_string(), "F#m");
        assert_eq!(ChordLabel::new(10, ChordQuality::Major).to_string(), "A#");
    }

    #[test]
    fn c_major_covers_root_third_and_fifth() {
        let bank = TemplateBank::default();
        let c_major = bank
            .get(ChordLabel::new(0, ChordQuality::Major))
            .unwrap();
        for (class, weight) in c_major.weights.iter().enumerate() {
            if [0, 4, 7].contains(&class) {
                assert!(*weight > 0.0);
            } else {
                assert_eq!(*weight, 0.0);
            }
        }
        // Root carries the largest weight.
        assert!(c_major.weights[0] > c_major.weights[4]);
    }

    #[test]
    fn a_minor_uses_the_flat_third() {
        let bank = TemplateBank::default();
        let a_minor = bank
            .get(ChordLabel::new(9, ChordQuality::Minor))
            .unwrap();
        assert!(a_minor.weights[9] > 0.0); // A
        assert!(a_minor.weights[0] > 0.0); // C
        assert!(a_minor.weights[4] > 0.0); // E
        assert_eq!(a_minor.weights[1], 0.0); // not C#
    }

    #[test]
    fn templates_have_unit_norm() {
        let bank = TemplateBank::default();
        for template in bank.templates() {
            let norm: f32 = template.weights.iter().map(|&w| w * w).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "{}", template.label);
        }
    }
}
