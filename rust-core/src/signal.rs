//! Signal conditioning: bias removal and recursive smoothing.
//!
//! This module provides the low-level per-channel processing that every raw
//! sample goes through before it reaches step detection or orientation:
//! - Fixed calibration bias subtraction
//! - A single-state recursive estimator per sensor channel
//!
//! Design note: all filters use incremental updates (O(1) per sample).
//! No history buffers, no allocations in hot paths.

use serde::{Deserialize, Serialize};

/// Process/observation noise variances for one [`ScalarEstimator`].
///
/// Higher observation noise means the estimator trusts new measurements
/// less and smooths harder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoisePair {
    /// Process noise variance Q. Must be > 0.
    pub process: f64,
    /// Observation noise variance R. Must be > 0.
    pub observation: f64,
}

impl NoisePair {
    pub const fn new(process: f64, observation: f64) -> Self {
        Self {
            process,
            observation,
        }
    }

    /// Accelerometer channels: noisy, smooth hard.
    pub const ACCELERATION: NoisePair = NoisePair::new(0.01, 0.5);

    /// Gyroscope channels: low noise and low drift.
    pub const ANGULAR_RATE: NoisePair = NoisePair::new(0.001, 0.1);

    /// Step length: between the two sensor classes.
    pub const STEP_LENGTH: NoisePair = NoisePair::new(0.005, 0.2);

    pub(crate) fn is_valid(&self) -> bool {
        self.process > 0.0 && self.observation > 0.0
    }
}

/// Single-state recursive smoother (scalar Kalman recursion with a constant
/// state model).
///
/// Each call computes `gain = P / (P + R)`, moves the estimate by
/// `gain * (measurement - X)` and sets `P = (1 - gain) * P + Q`. The gain is
/// always in (0, 1), so for a constant input the error shrinks every call and
/// never overshoots.
#[derive(Debug, Clone)]
pub struct ScalarEstimator {
    noise: NoisePair,
    covariance: f64,
    estimate: f64,
}

impl ScalarEstimator {
    const INITIAL_COVARIANCE: f64 = 1.0;

    /// Create an estimator starting at `X = 0`, `P = 1`.
    pub fn new(noise: NoisePair) -> Self {
        debug_assert!(noise.is_valid(), "noise variances must be positive");
        Self {
            noise,
            covariance: Self::INITIAL_COVARIANCE,
            estimate: 0.0,
        }
    }

    /// Fold one measurement in and return the updated estimate.
    pub fn update(&mut self, measurement: f64) -> f64 {
        let gain = self.covariance / (self.covariance + self.noise.observation);
        self.estimate += gain * (measurement - self.estimate);
        self.covariance = (1.0 - gain) * self.covariance + self.noise.process;
        self.estimate
    }

    /// Current state estimate.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Current error covariance.
    pub fn covariance(&self) -> f64 {
        self.covariance
    }

    pub fn noise(&self) -> NoisePair {
        self.noise
    }

    /// Back to the freshly constructed state.
    pub fn reset(&mut self) {
        self.covariance = Self::INITIAL_COVARIANCE;
        self.estimate = 0.0;
    }
}

/// Three independent [`ScalarEstimator`]s, one per sensor axis.
#[derive(Debug, Clone)]
pub struct TriaxialSmoother {
    channels: [ScalarEstimator; 3],
}

impl TriaxialSmoother {
    pub fn new(noise: NoisePair) -> Self {
        Self {
            channels: [
                ScalarEstimator::new(noise),
                ScalarEstimator::new(noise),
                ScalarEstimator::new(noise),
            ],
        }
    }

    /// Smooth one three-axis reading.
    pub fn update(&mut self, values: [f64; 3]) -> [f64; 3] {
        [
            self.channels[0].update(values[0]),
            self.channels[1].update(values[1]),
            self.channels[2].update(values[2]),
        ]
    }

    /// Latest smoothed reading.
    pub fn estimate(&self) -> [f64; 3] {
        [
            self.channels[0].estimate(),
            self.channels[1].estimate(),
            self.channels[2].estimate(),
        ]
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }
}

/// Subtracts a fixed calibration offset from raw three-axis readings.
///
/// The offset is configuration (measured per device offline), never
/// estimated at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasCorrector {
    bias: [f64; 3],
}

impl BiasCorrector {
    pub fn new(bias: [f64; 3]) -> Self {
        Self { bias }
    }

    /// Elementwise `raw - bias`.
    pub fn correct(&self, raw: [f64; 3]) -> [f64; 3] {
        [
            raw[0] - self.bias[0],
            raw[1] - self.bias[1],
            raw[2] - self.bias[2],
        ]
    }

    pub fn bias(&self) -> [f64; 3] {
        self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_update_uses_initial_covariance() {
        let mut estimator = ScalarEstimator::new(NoisePair::ACCELERATION);
        // gain = 1 / (1 + 0.5)
        let x = estimator.update(3.0);
        assert_relative_eq!(x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(estimator.covariance(), 1.0 / 3.0 + 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_input_converges_without_overshoot() {
        let target = 9.81;
        let mut estimator = ScalarEstimator::new(NoisePair::ACCELERATION);
        let mut prev_err = (estimator.estimate() - target).abs();

        for _ in 0..500 {
            let x = estimator.update(target);
            let err = (x - target).abs();
            assert!(err <= prev_err, "error grew: {} -> {}", prev_err, err);
            assert!(x <= target, "overshoot: {}", x);
            prev_err = err;
        }
        assert!(prev_err < 1e-9);
    }

    #[test]
    fn test_covariance_stays_positive_and_settles() {
        let mut estimator = ScalarEstimator::new(NoisePair::ANGULAR_RATE);
        for i in 0..1000 {
            estimator.update(if i % 2 == 0 { 1e6 } else { -1e6 });
            assert!(estimator.covariance() > 0.0);
        }
        // Steady state of P = PR/(P+R) + Q
        let q: f64 = 0.001;
        let r = 0.1;
        let expected = (q + (q * q + 4.0 * q * r).sqrt()) / 2.0;
        assert_relative_eq!(estimator.covariance(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_nan_propagates() {
        let mut estimator = ScalarEstimator::new(NoisePair::STEP_LENGTH);
        assert!(estimator.update(f64::NAN).is_nan());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut estimator = ScalarEstimator::new(NoisePair::STEP_LENGTH);
        estimator.update(1.0);
        estimator.update(2.0);
        estimator.reset();
        assert_eq!(estimator.estimate(), 0.0);
        assert_eq!(estimator.covariance(), 1.0);
    }

    #[test]
    fn test_triaxial_channels_are_independent() {
        let mut smoother = TriaxialSmoother::new(NoisePair::ACCELERATION);
        let out = smoother.update([3.0, 0.0, -3.0]);
        assert_relative_eq!(out[0], 2.0, epsilon = 1e-12);
        assert_eq!(out[1], 0.0);
        assert_relative_eq!(out[2], -2.0, epsilon = 1e-12);
        assert_eq!(smoother.estimate(), out);
    }

    #[test]
    fn test_bias_corrector_subtracts() {
        let corrector = BiasCorrector::new([0.1639, 0.1739, 0.0440]);
        let out = corrector.correct([1.0, 1.0, 9.8]);
        assert_relative_eq!(out[0], 0.8361, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.8261, epsilon = 1e-12);
        assert_relative_eq!(out[2], 9.756, epsilon = 1e-12);
    }
}
