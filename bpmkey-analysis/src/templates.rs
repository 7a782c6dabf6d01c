//! Binary key templates
//!
//! 24 templates (12 rotations x major/minor) built from two triad
//! patterns. Rotation `i` has pitch class `i` as its tonic.

use crate::camelot::Mode;
use crate::chroma::{PITCH_CLASSES, PITCH_CLASS_NAMES};
use std::sync::OnceLock;

/// Root, major third, fifth
const MAJOR_BASE: [f32; PITCH_CLASSES] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

/// Root, minor third, fifth
const MINOR_BASE: [f32; PITCH_CLASSES] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

/// Minor labels by tonic pitch class
const MINOR_LABELS: [&str; PITCH_CLASSES] = [
    "Cm", "C#m", "Dm", "Ebm", "Em", "Fm", "F#m", "Gm", "G#m", "Am", "Bbm", "Bm",
];

/// One reference pattern
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTemplate {
    /// Tonic pitch class (0 = C), equal to the rotation index
    pub tonic: u8,
    pub mode: Mode,
    /// Label as produced by the bank; majors use sharp spelling
    pub label: &'static str,
    /// 0/1 weight per pitch class
    pub weights: [f32; PITCH_CLASSES],
}

impl KeyTemplate {
    /// Dot product with a chroma vector
    pub fn score(&self, chroma: &[f32; PITCH_CLASSES]) -> f32 {
        self.weights.iter().zip(chroma).map(|(w, c)| w * c).sum()
    }
}

/// Immutable set of the 24 templates
#[derive(Debug, Clone)]
pub struct KeyTemplateBank {
    major: Vec<KeyTemplate>,
    minor: Vec<KeyTemplate>,
}

static BANK: OnceLock<KeyTemplateBank> = OnceLock::new();

/// Rotate a base pattern so that offset 0 lands on `tonic`
fn rotate(base: &[f32; PITCH_CLASSES], tonic: usize) -> [f32; PITCH_CLASSES] {
    let mut rotated = [0.0; PITCH_CLASSES];
    for (offset, &w) in base.iter().enumerate() {
        rotated[(offset + tonic) % PITCH_CLASSES] = w;
    }
    rotated
}

impl KeyTemplateBank {
    /// Build all 24 templates
    pub fn new() -> Self {
        let build = |mode: Mode| -> Vec<KeyTemplate> {
            (0..PITCH_CLASSES)
                .map(|tonic| {
                    let (base, label) = match mode {
                        Mode::Major => (&MAJOR_BASE, PITCH_CLASS_NAMES[tonic]),
                        Mode::Minor => (&MINOR_BASE, MINOR_LABELS[tonic]),
                    };
                    KeyTemplate {
                        tonic: tonic as u8,
                        mode,
                        label,
                        weights: rotate(base, tonic),
                    }
                })
                .collect()
        };

        Self {
            major: build(Mode::Major),
            minor: build(Mode::Minor),
        }
    }

    /// Process-wide shared bank, built on first use
    pub fn shared() -> &'static KeyTemplateBank {
        BANK.get_or_init(KeyTemplateBank::new)
    }

    /// Major templates ordered by rotation index
    pub fn major(&self) -> &[KeyTemplate] {
        &self.major
    }

    /// Minor templates ordered by rotation index
    pub fn minor(&self) -> &[KeyTemplate] {
        &self.minor
    }

    /// All 24 templates, majors first
    pub fn iter(&self) -> impl Iterator<Item = &KeyTemplate> {
        self.major.iter().chain(self.minor.iter())
    }
}

impl Default for KeyTemplateBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_size() {
        let bank = KeyTemplateBank::new();
        assert_eq!(bank.major().len(), 12);
        assert_eq!(bank.minor().len(), 12);
        assert_eq!(bank.iter().count(), 24);
    }

    #[test]
    fn test_rotation_matches_tonic() {
        let bank = KeyTemplateBank::new();
        for (i, template) in bank.iter().enumerate() {
            assert_eq!(template.tonic as usize, i % 12);
            assert_eq!(template.weights[template.tonic as usize], 1.0);
            assert_eq!(template.weights.iter().sum::<f32>(), 3.0);
        }
    }

    #[test]
    fn test_major_triads() {
        let bank = KeyTemplateBank::new();
        // E major: E, G#, B
        let e = &bank.major()[4];
        assert_eq!(e.label, "E");
        assert_eq!(e.weights[4], 1.0);
        assert_eq!(e.weights[8], 1.0);
        assert_eq!(e.weights[11], 1.0);
        // B major wraps: B, D#, F#
        let b = &bank.major()[11];
        assert_eq!(b.weights[11], 1.0);
        assert_eq!(b.weights[3], 1.0);
        assert_eq!(b.weights[6], 1.0);
    }

    #[test]
    fn test_minor_triads() {
        let bank = KeyTemplateBank::new();
        // A minor: A, C, E
        let am = &bank.minor()[9];
        assert_eq!(am.label, "Am");
        assert_eq!(am.weights[9], 1.0);
        assert_eq!(am.weights[0], 1.0);
        assert_eq!(am.weights[4], 1.0);
    }

    #[test]
    fn test_major_labels_are_sharp() {
        let bank = KeyTemplateBank::new();
        assert_eq!(bank.major()[1].label, "C#");
        assert_eq!(bank.major()[10].label, "A#");
        assert_eq!(bank.minor()[1].label, "C#m");
        assert_eq!(bank.minor()[10].label, "Bbm");
    }

    #[test]
    fn test_score_is_dot_product() {
        let bank = KeyTemplateBank::new();
        let mut chroma = [0.0; 12];
        chroma[0] = 1.0;
        chroma[4] = 2.0;
        chroma[7] = 3.0;
        chroma[9] = 10.0;
        assert_eq!(bank.major()[0].score(&chroma), 6.0);
        assert_eq!(bank.minor()[9].score(&chroma), 13.0);
    }

    #[test]
    fn test_shared_bank_is_singleton() {
        assert!(std::ptr::eq(KeyTemplateBank::shared(), KeyTemplateBank::shared()));
    }
}
