//! Target–decoy stratification.
//!
//! After best-category selection, each call increments one histogram cell
//! keyed by (peptide length, category, origin) at its confidence-score bin
//! as target, decoy, or ambiguous. The accumulator lives for the run and
//! is flushed once into two flat artifacts: the per-bin histogram and the
//! cumulative target/decoy counts per stratum as the score threshold is
//! lowered from 100 to 0. Cumulative counts are non-decreasing by
//! construction; the target/decoy ratio is the unsmoothed sanity bound.
//! The monotone smoothing that turns it into a reportable FDR lookup runs
//! externally.

use std::collections::HashMap;

use crate::constants::SCORE_BINS;
use crate::types::Category;

/// How a call's best location resolved the target–decoy competition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Target,
    Decoy,
    /// Priority tie between the best target and the best decoy location
    Ambiguous,
}

/// Counts of one histogram cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StratumCounts {
    pub target: u64,
    pub decoy: u64,
    pub ambiguous: u64,
}

/// Stratum key: peptide length, category, genome-of-origin id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StratumKey {
    pub length: usize,
    pub category: Category,
    pub origin: String,
}

/// One row of the flat histogram artifact
#[derive(Debug, Clone)]
pub struct FdrRow {
    pub length: usize,
    pub category: Category,
    pub origin: String,
    pub score: u8,
    pub counts: StratumCounts,
    /// Cumulative counts from score 100 down to this bin
    pub cumulative_target: u64,
    pub cumulative_decoy: u64,
    /// Unsmoothed decoy/target ratio at this threshold
    pub ratio: f64,
}

/// Run-long accumulator of target/decoy counts per stratum and score bin
#[derive(Debug, Default)]
pub struct FdrAccumulator {
    cells: HashMap<StratumKey, Vec<StratumCounts>>,
}

impl FdrAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments one cell; scores are clamped into 0..=100
    pub fn record(
        &mut self,
        length: usize,
        category: Category,
        origin: &str,
        score: f64,
        outcome: HitOutcome,
    ) {
        let bin = score.clamp(0.0, 100.0).round() as usize;
        let key = StratumKey {
            length,
            category,
            origin: origin.to_string(),
        };
        let cells = self
            .cells
            .entry(key)
            .or_insert_with(|| vec![StratumCounts::default(); SCORE_BINS]);
        match outcome {
            HitOutcome::Target => cells[bin].target += 1,
            HitOutcome::Decoy => cells[bin].decoy += 1,
            HitOutcome::Ambiguous => cells[bin].ambiguous += 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flushes the accumulator into the flat table, one row per stratum and
    /// score bin, scores descending within each stratum.
    #[must_use]
    pub fn rows(&self) -> Vec<FdrRow> {
        let mut keys: Vec<&StratumKey> = self.cells.keys().collect();
        keys.sort();
        let mut out = Vec::new();
        for key in keys {
            let cells = &self.cells[key];
            let mut cumulative_target = 0u64;
            let mut cumulative_decoy = 0u64;
            for score in (0..SCORE_BINS).rev() {
                let counts = cells[score];
                cumulative_target += counts.target;
                cumulative_decoy += counts.decoy;
                let ratio = if cumulative_target == 0 {
                    if cumulative_decoy == 0 {
                        0.0
                    } else {
                        1.0
                    }
                } else {
                    (cumulative_decoy as f64 / cumulative_target as f64).min(1.0)
                };
                out.push(FdrRow {
                    length: key.length,
                    category: key.category,
                    origin: key.origin.clone(),
                    score: score as u8,
                    counts,
                    cumulative_target,
                    cumulative_decoy,
                    ratio,
                });
            }
        }
        out
    }
}
