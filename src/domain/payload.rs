//! The per-run document stored as a level-2 blob.
//!
//! Serialization goes through `serde_json::Value`, whose object maps keep keys
//! sorted, so equal payloads always produce identical bytes.

use crate::domain::calculus::CalculusFeatureRow;
use crate::domain::derived::DerivedRow;
use crate::domain::error::PipelineError;
use crate::domain::patterns::{DetectionConfig, PatternOverlay};
use crate::domain::scoring::ScoringConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DERIVED_TAIL: usize = 500;
pub const CALCULUS_TAIL: usize = 250;

/// Describes the input a payload was computed from. Holds no wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadMeta {
    pub ticker: String,
    pub period: String,
    pub interval: String,
    pub bar_count: usize,
    pub first_time: Option<DateTime<Utc>>,
    pub last_time: Option<DateTime<Utc>>,
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPayload {
    pub meta: PayloadMeta,
    pub derived_tail: Vec<DerivedRow>,
    /// Indices refer to the full series, not the tail.
    pub overlays: Vec<PatternOverlay>,
    pub calculus_tail: Vec<CalculusFeatureRow>,
}

fn tail<T: Clone>(rows: &[T], n: usize) -> Vec<T> {
    rows[rows.len().saturating_sub(n)..].to_vec()
}

impl RunPayload {
    pub fn new(
        meta: PayloadMeta,
        derived: &[DerivedRow],
        overlays: Vec<PatternOverlay>,
        calculus: &[CalculusFeatureRow],
    ) -> Self {
        Self {
            meta,
            derived_tail: tail(derived, DERIVED_TAIL),
            overlays,
            calculus_tail: tail(calculus, CALCULUS_TAIL),
        }
    }

    /// Compact JSON with sorted object keys.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_vec(&value)?)
    }
}
