//! Orientation tracking with a gravity-referenced complementary filter.
//!
//! Each gyroscope sample goes through:
//! 1. Complementary correction: the smoothed acceleration is taken as the
//!    gravity direction, crossed with the "down" axis implied by the current
//!    attitude, and the resulting error is fed back into the angular rate
//!    (proportional + integral terms)
//! 2. First-order quaternion integration, renormalized every step
//! 3. Yaw extraction from the rotation matrix
//! 4. Drift elimination (see [`crate::heading`])
//!
//! There is no magnetometer, so absolute yaw is unobservable; the
//! drift eliminator bounds it instead.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::heading::{DriftConfig, DriftEliminator};
use crate::types::ns_to_s;

/// How the integration step size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeStep {
    /// Always integrate over `nominal_dt_s`, regardless of sample spacing.
    #[default]
    Fixed,
    /// Integrate over the measured gap between gyroscope samples.
    Measured,
}

/// Configuration for the orientation tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Proportional feedback gain on the gravity error.
    pub proportional_gain: f64,
    /// Integral feedback gain on the gravity error.
    pub integral_gain: f64,
    pub time_step: TimeStep,
    /// Step size for [`TimeStep::Fixed`], and the fallback for
    /// [`TimeStep::Measured`] when no gap can be measured (seconds).
    pub nominal_dt_s: f64,
    pub drift: DriftConfig,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            proportional_gain: 0.8,
            integral_gain: 0.1,
            time_step: TimeStep::Fixed,
            nominal_dt_s: 0.01,
            drift: DriftConfig::default(),
        }
    }
}

/// Result of one orientation update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationUpdate {
    /// Angular rate after complementary correction (rad/s).
    pub corrected_rate: [f64; 3],
    /// Yaw straight from the quaternion (rad).
    pub raw_heading: f64,
    /// Yaw after drift elimination (rad).
    pub heading: f64,
}

/// Quaternion attitude tracker with drift-corrected heading output.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    config: OrientationConfig,
    attitude: UnitQuaternion<f64>,
    integral_error: Vector3<f64>,
    drift: DriftEliminator,
    last_timestamp_ns: Option<u64>,
}

impl OrientationTracker {
    pub fn new(config: OrientationConfig) -> Self {
        let drift = DriftEliminator::new(&config.drift);
        Self {
            config,
            attitude: UnitQuaternion::identity(),
            integral_error: Vector3::zeros(),
            drift,
            last_timestamp_ns: None,
        }
    }

    /// Process one smoothed angular-rate sample.
    ///
    /// `acceleration` is the latest smoothed acceleration (gravity reference)
    /// and `step_count` the steps taken so far, which gates drift elimination.
    pub fn update(
        &mut self,
        angular_rate: [f64; 3],
        acceleration: [f64; 3],
        timestamp_ns: u64,
        step_count: u32,
    ) -> OrientationUpdate {
        let dt = self.step_size(timestamp_ns);
        self.last_timestamp_ns = Some(timestamp_ns);

        let error = self.gravity_error(Vector3::from(acceleration));

        let omega = Vector3::from(angular_rate)
            + error * self.config.proportional_gain
            + self.integral_error;
        self.integral_error += error * (self.config.integral_gain * dt);

        self.integrate(omega, dt);

        let raw_heading = self.raw_heading();
        let heading = self.drift.correct(raw_heading, step_count);

        OrientationUpdate {
            corrected_rate: omega.into(),
            raw_heading,
            heading,
        }
    }

    /// Current attitude (body to world).
    pub fn attitude(&self) -> &UnitQuaternion<f64> {
        &self.attitude
    }

    /// Drift-corrected heading in radians.
    pub fn heading(&self) -> f64 {
        self.drift.heading()
    }

    /// Yaw of the current attitude before drift elimination.
    ///
    /// `atan2(T[1], T[4])` over the row-major rotation matrix
    /// `T = [[q0²+q1²-q2²-q3², 2(q1q2-q0q3), ..], [2(q1q2+q0q3), q0²-q1²+q2²-q3², ..], ..]`.
    pub fn raw_heading(&self) -> f64 {
        let q = self.attitude.quaternion();
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);
        let t1 = 2.0 * (q1 * q2 - q0 * q3);
        let t4 = q0 * q0 - q1 * q1 + q2 * q2 - q3 * q3;
        t1.atan2(t4)
    }

    /// Accumulated integral of the gravity error.
    pub fn integral_error(&self) -> [f64; 3] {
        self.integral_error.into()
    }

    pub fn drift(&self) -> &DriftEliminator {
        &self.drift
    }

    /// Forget the last gyroscope timestamp, so the next sample integrates
    /// over the nominal step instead of the gap since it.
    pub fn rearm(&mut self) {
        self.last_timestamp_ns = None;
    }

    pub fn reset(&mut self) {
        self.attitude = UnitQuaternion::identity();
        self.integral_error = Vector3::zeros();
        self.drift.reset();
        self.last_timestamp_ns = None;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    fn step_size(&self, timestamp_ns: u64) -> f64 {
        match (self.config.time_step, self.last_timestamp_ns) {
            (TimeStep::Measured, Some(last)) if timestamp_ns > last => {
                ns_to_s(timestamp_ns - last)
            }
            _ => self.config.nominal_dt_s,
        }
    }

    /// Cross product of measured gravity with the attitude's down axis.
    fn gravity_error(&self, acceleration: Vector3<f64>) -> Vector3<f64> {
        let norm = acceleration.norm();
        let measured = if norm > 0.0 {
            acceleration / norm
        } else {
            acceleration
        };

        let q = self.attitude.quaternion();
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);
        let down = Vector3::new(
            2.0 * (q1 * q3 - q0 * q2),
            2.0 * (q2 * q3 + q0 * q1),
            1.0 - 2.0 * (q1 * q1 + q2 * q2),
        );

        measured.cross(&down)
    }

    fn integrate(&mut self, omega: Vector3<f64>, dt: f64) {
        // dq/dt = 0.5 * q ⊗ (0, ω)
        let rate = Quaternion::from_parts(0.0, omega);
        let q = self.attitude.quaternion();
        let derivative = q * rate * 0.5;
        let next = q + derivative * dt;
        self.attitude = UnitQuaternion::from_quaternion(next);
    }
}

impl Default for OrientationTracker {
    fn default() -> Self {
        Self::new(OrientationConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const GRAVITY: [f64; 3] = [0.0, 0.0, 9.81];
    const MS: u64 = 1_000_000;

    #[test]
    fn test_starts_at_identity() {
        let tracker = OrientationTracker::default();
        assert_eq!(*tracker.attitude(), UnitQuaternion::identity());
        assert_eq!(tracker.heading(), 0.0);
        assert_eq!(tracker.raw_heading(), 0.0);
    }

    #[test]
    fn test_no_rotation_stays_fixed() {
        let mut tracker = OrientationTracker::default();
        for i in 0..1000u64 {
            let out = tracker.update([0.0; 3], GRAVITY, i * 10 * MS, 0);
            assert_eq!(out.corrected_rate, [0.0; 3]);
            assert_eq!(out.heading, 0.0);
        }
        assert_eq!(*tracker.attitude(), UnitQuaternion::identity());
        assert_eq!(tracker.integral_error(), [0.0; 3]);
    }

    #[test]
    fn test_positive_yaw_rate_gives_negative_heading() {
        let mut tracker = OrientationTracker::default();
        // 0.5 rad/s about z for 1 s at the fixed 10 ms step
        for i in 0..100u64 {
            tracker.update([0.0, 0.0, 0.5], GRAVITY, i * 10 * MS, 0);
        }
        assert_abs_diff_eq!(tracker.raw_heading(), -0.5, epsilon = 1e-3);
        assert_eq!(tracker.heading(), tracker.raw_heading());
    }

    #[test]
    fn test_quaternion_stays_unit_over_long_run() {
        let mut tracker = OrientationTracker::default();
        for i in 0..10_000u64 {
            let t = i as f64 * 0.01;
            let rate = [
                0.8 * (t * 1.3).sin(),
                -0.6 * (t * 0.7).cos(),
                1.5 * (t * 0.2).sin(),
            ];
            let accel = [0.3 * (t * 2.1).sin(), 0.2, 9.7];
            tracker.update(rate, accel, i * 10 * MS, (i / 50) as u32);
            assert_relative_eq!(tracker.attitude().quaternion().norm(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_tilt_error_feeds_back_into_rate() {
        let mut tracker = OrientationTracker::default();
        // Gravity along +y while attitude says +z: error = y × z = +x
        let out = tracker.update([0.0; 3], [0.0, 9.81, 0.0], 0, 0);
        assert_relative_eq!(out.corrected_rate[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(out.corrected_rate[1], 0.0);
        assert_abs_diff_eq!(out.corrected_rate[2], 0.0);
        assert_relative_eq!(tracker.integral_error()[0], 0.1 * 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_acceleration_gives_no_error() {
        let mut tracker = OrientationTracker::default();
        let out = tracker.update([0.0, 0.0, 0.1], [0.0; 3], 0, 0);
        assert_eq!(out.corrected_rate, [0.0, 0.0, 0.1]);
    }

    #[test]
    fn test_measured_time_step_uses_sample_gap() {
        let config = OrientationConfig {
            time_step: TimeStep::Measured,
            ..OrientationConfig::default()
        };
        let mut measured = OrientationTracker::new(config);
        let mut fixed = OrientationTracker::default();

        // 20 ms spacing: measured integrates twice as far as fixed
        for i in 0..50u64 {
            measured.update([0.0, 0.0, 0.5], GRAVITY, i * 20 * MS, 0);
            fixed.update([0.0, 0.0, 0.5], GRAVITY, i * 20 * MS, 0);
        }
        // First sample falls back to the nominal step: 49 * 0.02 + 0.01
        assert_abs_diff_eq!(measured.raw_heading(), -0.5 * 0.99, epsilon = 1e-3);
        assert_abs_diff_eq!(fixed.raw_heading(), -0.5 * 0.50, epsilon = 1e-3);
    }

    #[test]
    fn test_measured_time_step_falls_back_on_repeated_timestamp() {
        let config = OrientationConfig {
            time_step: TimeStep::Measured,
            ..OrientationConfig::default()
        };
        let mut tracker = OrientationTracker::new(config);
        tracker.update([0.0, 0.0, 1.0], GRAVITY, 100 * MS, 0);
        tracker.update([0.0, 0.0, 1.0], GRAVITY, 100 * MS, 0);
        assert_abs_diff_eq!(tracker.raw_heading(), -0.02, epsilon = 1e-6);
    }

    #[test]
    fn test_rearm_uses_nominal_step_for_next_sample() {
        let config = OrientationConfig {
            time_step: TimeStep::Measured,
            ..OrientationConfig::default()
        };
        let mut tracker = OrientationTracker::new(config);
        tracker.update([0.0, 0.0, 1.0], GRAVITY, 0, 0);
        let before = tracker.raw_heading();

        tracker.rearm();
        tracker.update([0.0, 0.0, 1.0], GRAVITY, 600_000 * MS, 0);

        assert_abs_diff_eq!(tracker.raw_heading() - before, -0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut tracker = OrientationTracker::default();
        for i in 0..100u64 {
            tracker.update([0.1, 0.2, 0.3], [0.0, 1.0, 9.0], i * 10 * MS, 5);
        }
        tracker.reset();
        assert_eq!(*tracker.attitude(), UnitQuaternion::identity());
        assert_eq!(tracker.integral_error(), [0.0; 3]);
        assert_eq!(tracker.heading(), 0.0);
    }
}
