//! Pedestrian Dead Reckoning (PDR) Trajectory Module.
//!
//! Accumulates 2-D displacement one step at a time:
//! `x += l·sin(φ)`, `y += l·cos(φ)`, so heading 0 walks along +y.
//!
//! Internally the walked-along axis is `y`. Externally reported coordinates
//! are transposed (`reported = (internal_y, internal_x)`); [`swap_axes`] is
//! the only place that convention lives.

use crate::types::Point2;

/// Convert between the internal frame and the reported frame.
///
/// The transposition is its own inverse, so it serves both directions.
#[inline]
pub fn swap_axes(p: Point2) -> Point2 {
    Point2::new(p.y, p.x)
}

/// Step-driven position accumulator.
#[derive(Debug, Clone, Default)]
pub struct PositionIntegrator {
    // Internal frame
    position: Point2,
    total_distance: f64,
    step_count: u32,
}

impl PositionIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one step of `length` meters along `heading` radians.
    pub fn on_step(&mut self, length: f64, heading: f64) {
        self.position.x += length * heading.sin();
        self.position.y += length * heading.cos();
        self.total_distance += length;
        self.step_count += 1;
    }

    /// Seed the internal-frame position. Distance and steps are untouched.
    pub fn set_internal(&mut self, position: Point2) {
        self.position = position;
    }

    /// Seed from a reported-frame position.
    pub fn set_reported(&mut self, position: Point2) {
        self.position = swap_axes(position);
    }

    /// Position in the internal frame.
    pub fn internal(&self) -> Point2 {
        self.position
    }

    /// Position in the reported frame.
    pub fn position(&self) -> Point2 {
        swap_axes(self.position)
    }

    /// Cumulative walked distance in meters.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Mean step length, 0 before the first step.
    pub fn mean_step_length(&self) -> f64 {
        if self.step_count == 0 {
            0.0
        } else {
            self.total_distance / f64::from(self.step_count)
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_heading_zero_walks_internal_y() {
        let mut integrator = PositionIntegrator::new();
        integrator.on_step(0.7, 0.0);
        assert_abs_diff_eq!(integrator.internal().x, 0.0);
        assert_relative_eq!(integrator.internal().y, 0.7);

        // Reported frame swaps the axes
        assert_relative_eq!(integrator.position().x, 0.7);
        assert_abs_diff_eq!(integrator.position().y, 0.0);
    }

    #[test]
    fn test_heading_quarter_turn_walks_internal_x() {
        let mut integrator = PositionIntegrator::new();
        integrator.on_step(1.0, FRAC_PI_2);
        assert_relative_eq!(integrator.internal().x, 1.0);
        assert_abs_diff_eq!(integrator.internal().y, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_ten_steps_straight() {
        let mut integrator = PositionIntegrator::new();
        let lengths = [1.10, 1.25, 1.31, 1.35, 1.36, 1.37, 1.37, 1.37, 1.37, 1.37];
        for &l in &lengths {
            integrator.on_step(l, 0.0);
        }
        let sum: f64 = lengths.iter().sum();
        assert_eq!(integrator.step_count(), 10);
        assert_relative_eq!(integrator.total_distance(), sum, epsilon = 1e-12);
        assert_relative_eq!(integrator.internal().y, sum, epsilon = 1e-12);
        assert_abs_diff_eq!(integrator.internal().x, 0.0);
        assert_relative_eq!(integrator.mean_step_length(), sum / 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_total_distance_is_monotonic() {
        let mut integrator = PositionIntegrator::new();
        let mut prev = 0.0;
        for i in 0..100 {
            integrator.on_step(0.5 + 0.01 * f64::from(i % 7), f64::from(i) * 0.3);
            assert!(integrator.total_distance() >= prev);
            prev = integrator.total_distance();
        }
    }

    #[test]
    fn test_seed_from_reported_frame() {
        let mut integrator = PositionIntegrator::new();
        integrator.set_reported(Point2::new(2.0, 5.0));
        assert_eq!(integrator.internal(), Point2::new(5.0, 2.0));
        assert_eq!(integrator.position(), Point2::new(2.0, 5.0));
        assert_eq!(integrator.total_distance(), 0.0);
    }

    #[test]
    fn test_swap_axes_is_involution() {
        let p = Point2::new(-1.5, 3.25);
        assert_eq!(swap_axes(swap_axes(p)), p);
    }

    #[test]
    fn test_mean_step_length_without_steps() {
        assert_eq!(PositionIntegrator::new().mean_step_length(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut integrator = PositionIntegrator::new();
        integrator.set_internal(Point2::new(1.0, 1.0));
        integrator.on_step(1.0, 0.3);
        integrator.reset();
        assert_eq!(integrator.internal(), Point2::default());
        assert_eq!(integrator.total_distance(), 0.0);
        assert_eq!(integrator.step_count(), 0);
    }
}
