//! Key estimation by template correlation
//!
//! Scores a chroma vector against the 24 binary templates, picks the best
//! major and the best minor candidate independently, then lets the major
//! candidate win unless the minor one scores strictly higher.

use crate::camelot::{to_flat, Mode, MusicalKey};
use crate::chroma::Chroma;
use crate::error::AnalysisError;
use crate::templates::{KeyTemplate, KeyTemplateBank};

/// Scores within this fraction of the bank's best score count as tied
///
/// Absorbs FFT leakage so a pure tone resolves to its own tonic. A template
/// that beats another by less than this margin is treated as equal to it,
/// so the tie rules can pick the lower-scoring one.
pub const SCORE_TOLERANCE: f32 = 1e-4;

/// Single-chroma key estimator
#[derive(Debug, Clone, Copy)]
pub struct KeyEstimator {
    bank: &'static KeyTemplateBank,
}

impl KeyEstimator {
    /// Estimator backed by the shared template bank
    pub fn new() -> Self {
        Self {
            bank: KeyTemplateBank::shared(),
        }
    }

    /// Estimate the key of one chroma vector
    ///
    /// Ties within a mode go to the candidate whose tonic carries the most
    /// energy, then to the lowest rotation index. An all-zero chroma
    /// therefore yields C major.
    pub fn estimate(&self, chroma: &Chroma) -> Result<MusicalKey, AnalysisError> {
        if !chroma.is_finite() {
            return Err(AnalysisError::NonFinite {
                stage: "key correlation",
            });
        }

        let major_scores = scores(self.bank.major(), chroma);
        let minor_scores = scores(self.bank.minor(), chroma);

        let best = major_scores
            .iter()
            .chain(&minor_scores)
            .copied()
            .fold(0.0f32, f32::max);
        let tolerance = SCORE_TOLERANCE * best;

        let major = pick(self.bank.major(), &major_scores, chroma, tolerance);
        let minor = pick(self.bank.minor(), &minor_scores, chroma, tolerance);

        let winner = if major_scores[major] >= minor_scores[minor] - tolerance {
            &self.bank.major()[major]
        } else {
            &self.bank.minor()[minor]
        };

        let label = match winner.mode {
            Mode::Major => to_flat(winner.label),
            Mode::Minor => winner.label,
        };

        MusicalKey::from_label(label).ok_or(AnalysisError::UnmappedTemplate {
            label: winner.label,
        })
    }
}

impl Default for KeyEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn scores(templates: &[KeyTemplate], chroma: &Chroma) -> Vec<f32> {
    templates.iter().map(|t| t.score(chroma.values())).collect()
}

/// Index of the winning template among one mode's candidates
fn pick(templates: &[KeyTemplate], scores: &[f32], chroma: &Chroma, tolerance: f32) -> usize {
    let top = scores.iter().copied().fold(f32::MIN, f32::max);

    let mut best: Option<usize> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score < top - tolerance {
            continue;
        }
        best = match best {
            Some(b)
                if chroma.energy(templates[i].tonic as usize)
                    <= chroma.energy(templates[b].tonic as usize) =>
            {
                Some(b)
            }
            _ => Some(i),
        };
    }

    best.unwrap_or(0)
}
