//! Pedestrian dead reckoning engine integrating all sensor processing stages.
//!
//! This module orchestrates the full data flow from raw IMU samples to a
//! position estimate.
//!
//! # Architecture
//!
//! Two independent ingestion paths share one owner:
//! 1. **Acceleration**: bias removal → per-axis smoothing → step detection →
//!    (on step) step length → position update
//! 2. **Angular rate**: bias removal → per-axis smoothing → complementary
//!    correction → quaternion integration → drift-corrected heading
//!
//! The position update reads whatever heading the angular-rate path last
//! produced. The engine holds no locks; `&mut self` on every ingestion call
//! means the host serializes access.
//!
//! # Session lifecycle
//! - `start()` opens a session. The first sample afterwards sets the clock
//!   origin and the step-timing baseline.
//! - Samples arriving while the session is not running are ignored.
//! - `stop()` is idempotent; a later `start()` resumes with accumulated state.
//! - `reset()` clears estimator state but keeps configuration and calibration.

use crate::config::PdrConfig;
use crate::error::Result;
use crate::orientation::{OrientationTracker, OrientationUpdate};
use crate::signal::{BiasCorrector, TriaxialSmoother};
use crate::step_detection::StepDetector;
use crate::stride::StepLengthEstimator;
use crate::trajectory::PositionIntegrator;
use crate::types::*;

/// Complete PDR processor.
///
/// Maintains internal state across all processing stages and answers
/// position/heading/step queries at any time.
#[derive(Debug, Clone)]
pub struct PdrEngine {
    config: PdrConfig,
    state: SessionState,

    // Signal conditioning
    accel_bias: BiasCorrector,
    gyro_bias: BiasCorrector,
    accel_smoother: TriaxialSmoother,
    gyro_smoother: TriaxialSmoother,

    // Processing stages
    detector: StepDetector,
    stride: StepLengthEstimator,
    orientation: OrientationTracker,
    trajectory: PositionIntegrator,

    // Latest conditioned readings
    acceleration: [f64; 3],
    angular_rate: [f64; 3],

    // Session clock; origin is None until the first sample after start()
    origin_ns: Option<u64>,
    last_sample_ns: Option<u64>,
}

impl PdrEngine {
    /// Creates a new engine after validating `config`.
    pub fn new(config: PdrConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            accel_bias: BiasCorrector::new(config.calibration.accel_bias),
            gyro_bias: BiasCorrector::new(config.calibration.gyro_bias),
            accel_smoother: TriaxialSmoother::new(config.noise.acceleration),
            gyro_smoother: TriaxialSmoother::new(config.noise.angular_rate),
            detector: StepDetector::new(config.step.clone()),
            stride: StepLengthEstimator::new(config.stride.clone()),
            orientation: OrientationTracker::new(config.orientation.clone()),
            trajectory: PositionIntegrator::new(),

            config,
            state: SessionState::Idle,
            acceleration: [0.0; 3],
            angular_rate: [0.0; 3],
            origin_ns: None,
            last_sample_ns: None,
        })
    }

    // =========================================================================
    // SESSION LIFECYCLE
    // =========================================================================

    /// Opens (or resumes) a session.
    pub fn start(&mut self) {
        if self.state == SessionState::Running {
            log::debug!("start() while already running; ignored");
            return;
        }
        self.state = SessionState::Running;
        self.origin_ns = None;
        self.orientation.rearm();
        log::info!(
            "PDR session started (steps={}, distance={:.3}m)",
            self.step_count(),
            self.total_distance()
        );
    }

    /// Finalizes the session. Safe to call repeatedly or before `start()`.
    pub fn stop(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.state = SessionState::Stopped;
        let p = self.position();
        log::info!(
            "PDR session stopped: steps={}, distance={:.3}m, position=({:.3}, {:.3})",
            self.step_count(),
            self.total_distance(),
            p.x,
            p.y
        );
    }

    /// Zeroes detector, step length, orientation and position state.
    ///
    /// Calibration, configuration and the sensor smoothers are kept. A
    /// running session keeps its clock; the step-timing baseline moves to
    /// the latest sample.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.stride.reset();
        self.orientation.reset();
        self.trajectory.reset();

        if let Some(ts) = self.last_sample_ns {
            self.detector.arm(ts);
        }
        log::info!("PDR state reset");
    }

    /// Overrides the current position, in the reported frame.
    pub fn set_initial_position(&mut self, x: f64, y: f64) {
        self.trajectory.set_reported(Point2::new(x, y));
        log::info!("Initial position set to ({:.3}, {:.3})", x, y);
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Processes one raw accelerometer sample (m/s²).
    ///
    /// Returns the step that fired on this sample, if any.
    pub fn ingest_acceleration(&mut self, sample: SensorSample) -> Option<StepEvent> {
        if !self.accept(sample.timestamp_ns) {
            return None;
        }

        let corrected = self.accel_bias.correct(sample.values);
        self.acceleration = self.accel_smoother.update(corrected);
        let magnitude = norm3(&self.acceleration);

        let step = self.detector.update(magnitude, sample.timestamp_ns)?;
        let length = self.stride.estimate_step(&step);
        let heading = self.orientation.heading();
        self.trajectory.on_step(length, heading);

        log::debug!(
            "Step {}: peak={:.3} valley={:.3} length={:.3}m heading={:.1}°",
            step.index,
            step.peak,
            step.valley,
            length,
            heading.to_degrees()
        );
        Some(step)
    }

    /// Processes one raw gyroscope sample (rad/s).
    pub fn ingest_angular_rate(&mut self, sample: SensorSample) -> Option<OrientationUpdate> {
        if !self.accept(sample.timestamp_ns) {
            return None;
        }

        let corrected = self.gyro_bias.correct(sample.values);
        let smoothed = self.gyro_smoother.update(corrected);
        let update = self.orientation.update(
            smoothed,
            self.acceleration,
            sample.timestamp_ns,
            self.detector.step_count(),
        );
        self.angular_rate = update.corrected_rate;
        Some(update)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Position in the reported frame (meters).
    pub fn position(&self) -> Point2 {
        self.trajectory.position()
    }

    /// Position in the internal frame, where heading 0 walks along +y.
    pub fn internal_position(&self) -> Point2 {
        self.trajectory.internal()
    }

    /// Drift-corrected heading in radians.
    pub fn heading(&self) -> f64 {
        self.orientation.heading()
    }

    pub fn heading_degrees(&self) -> f64 {
        self.heading().to_degrees()
    }

    pub fn step_count(&self) -> u32 {
        self.trajectory.step_count()
    }

    pub fn total_distance(&self) -> f64 {
        self.trajectory.total_distance()
    }

    /// Mean step length over the session, 0 without steps.
    pub fn step_length(&self) -> f64 {
        self.trajectory.mean_step_length()
    }

    /// Smoothed length of the most recent step.
    pub fn last_step_length(&self) -> f64 {
        self.stride.last_length()
    }

    /// Bias-corrected, smoothed acceleration.
    pub fn acceleration(&self) -> [f64; 3] {
        self.acceleration
    }

    /// Bias-corrected, smoothed and complementary-corrected angular rate.
    pub fn angular_rate(&self) -> [f64; 3] {
        self.angular_rate
    }

    pub fn acceleration_magnitude(&self) -> f64 {
        norm3(&self.acceleration)
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &PdrConfig {
        &self.config
    }

    /// Step detector, for rejection statistics.
    pub fn detector(&self) -> &StepDetector {
        &self.detector
    }

    pub fn orientation(&self) -> &OrientationTracker {
        &self.orientation
    }

    /// Nanoseconds between the session origin and the latest sample.
    pub fn elapsed_ns(&self) -> u64 {
        match (self.origin_ns, self.last_sample_ns) {
            (Some(origin), Some(last)) => last.saturating_sub(origin),
            _ => 0,
        }
    }

    /// Everything the session log needs, captured now.
    pub fn snapshot(&self) -> PdrSnapshot {
        PdrSnapshot {
            elapsed_ns: self.elapsed_ns(),
            acceleration: self.acceleration,
            angular_rate: self.angular_rate,
            step_count: self.step_count(),
            step_length: self.step_length(),
            position: self.position(),
            heading_rad: self.heading(),
            total_distance: self.total_distance(),
            acceleration_magnitude: self.acceleration_magnitude(),
        }
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    /// Gate a sample on the session state and advance the session clock.
    fn accept(&mut self, timestamp_ns: u64) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        if self.origin_ns.is_none() {
            self.origin_ns = Some(timestamp_ns);
            self.detector.arm(timestamp_ns);
        }
        self.last_sample_ns = Some(timestamp_ns);
        true
    }
}
