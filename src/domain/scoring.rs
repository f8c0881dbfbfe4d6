//! Overlay scoring and selection.

use crate::domain::calculus::CalculusFeatureRow;
use crate::domain::patterns::PatternOverlay;
use serde::{Deserialize, Serialize};

const WIDTH_PENALTY: f64 = 0.015;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub min_score: f64,
    pub max_patterns: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score: 0.18,
            max_patterns: 60,
        }
    }
}

/// mean(strength over the span) / (1 + 0.015 * width) * family bias.
pub fn score_overlay(overlay: &PatternOverlay, calculus: &[CalculusFeatureRow]) -> f64 {
    let span = &calculus[overlay.start_index..=overlay.end_index];
    let mean = span.iter().map(|r| r.calculus_strength).sum::<f64>() / span.len() as f64;
    let width = overlay.width() as f64;
    mean * (1.0 / (1.0 + WIDTH_PENALTY * width)) * overlay.family.bias()
}

/// Scores every candidate, sorts by score descending (stable, so ties keep detection
/// order), drops those under `min_score` and keeps at most `max_patterns`.
pub fn select_overlays(
    candidates: Vec<PatternOverlay>,
    calculus: &[CalculusFeatureRow],
    config: &ScoringConfig,
) -> Vec<PatternOverlay> {
    let mut scored: Vec<PatternOverlay> = candidates
        .into_iter()
        .map(|mut o| {
            o.score = score_overlay(&o, calculus);
            o
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.retain(|o| o.score >= config.min_score);
    scored.truncate(config.max_patterns);
    scored
}
