//! Step length estimation.
//!
//! Converts the amplitude envelope of a detected step into a length:
//! - Weinberg model: `l = K * (peak - valley)^(1/4)`
//! - Once three steps exist, the instantaneous length is blended with the
//!   mean of the last three (history blend)
//! - The result is smoothed by a [`ScalarEstimator`]

use serde::{Deserialize, Serialize};

use crate::signal::{NoisePair, ScalarEstimator};
use crate::types::StepEvent;

/// Number of past steps averaged by the blend.
pub const HISTORY_LEN: usize = 3;

/// Configuration for step length estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepLengthConfig {
    /// Weinberg gain K (meters per (m/s²)^(1/4)).
    pub weinberg_k: f64,
    /// Weight of the history mean in the blend, in [0, 1].
    pub history_weight: f64,
    /// Smoother noise for the final length.
    pub smoothing: NoisePair,
}

impl Default for StepLengthConfig {
    fn default() -> Self {
        Self {
            weinberg_k: 0.97,
            history_weight: 0.60,
            smoothing: NoisePair::STEP_LENGTH,
        }
    }
}

/// Weinberg + history-blend step length estimator.
#[derive(Debug, Clone)]
pub struct StepLengthEstimator {
    config: StepLengthConfig,
    history: [f64; HISTORY_LEN],
    smoother: ScalarEstimator,
    last_length: f64,
}

impl StepLengthEstimator {
    pub fn new(config: StepLengthConfig) -> Self {
        let smoother = ScalarEstimator::new(config.smoothing);
        Self {
            config,
            history: [0.0; HISTORY_LEN],
            smoother,
            last_length: 0.0,
        }
    }

    /// Raw Weinberg length for a peak/valley pair.
    pub fn weinberg(&self, peak: f64, valley: f64) -> f64 {
        self.config.weinberg_k * (peak - valley).powf(0.25)
    }

    /// Estimate the smoothed length of step `step_index` (1-based).
    pub fn estimate(&mut self, peak: f64, valley: f64, step_index: u32) -> f64 {
        let l = self.weinberg(peak, valley);

        let blended = if step_index as usize <= HISTORY_LEN {
            // Not enough history yet: Weinberg only
            if step_index > 0 {
                self.history[step_index as usize - 1] = l;
            }
            l
        } else {
            let previous_mean = self.history.iter().sum::<f64>() / HISTORY_LEN as f64;
            self.history.copy_within(1.., 0);
            self.history[HISTORY_LEN - 1] = l;

            let q = self.config.history_weight;
            q * previous_mean + (1.0 - q) * l
        };

        self.last_length = self.smoother.update(blended);
        self.last_length
    }

    /// Convenience wrapper for a detector event.
    pub fn estimate_step(&mut self, step: &StepEvent) -> f64 {
        self.estimate(step.peak, step.valley, step.index)
    }

    /// Latest smoothed length, 0 before the first step.
    pub fn last_length(&self) -> f64 {
        self.last_length
    }

    /// Raw Weinberg lengths of the last three steps, oldest first.
    pub fn history(&self) -> [f64; HISTORY_LEN] {
        self.history
    }

    pub fn reset(&mut self) {
        self.history = [0.0; HISTORY_LEN];
        self.smoother.reset();
        self.last_length = 0.0;
    }
}

impl Default for StepLengthEstimator {
    fn default() -> Self {
        Self::new(StepLengthConfig::default())
    }
}
