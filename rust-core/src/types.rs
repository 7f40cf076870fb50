//! Core data types for the PDR engine.
//!
//! This module defines the plain values that flow between the pipeline
//! stages: timestamped sensor samples, step events, 2-D points and the
//! read-only snapshot handed to log writers.
//!
//! Design principle: if a concept crosses a module boundary, it gets a type.
//! Never pass raw tuples across boundaries.

// ============================================================================
// SENSOR INPUT
// ============================================================================

/// A single timestamped three-axis sensor reading.
///
/// The same type carries accelerometer samples (m/s²) and gyroscope samples
/// (rad/s); which one it is depends on the ingestion entry point it is
/// handed to. Samples are immutable once produced.
///
/// Design note: values are f64 throughout. The recursive smoothers and the
/// position accumulator run for whole sessions and f32 rounding becomes
/// visible in long walks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Monotonic timestamp in nanoseconds.
    pub timestamp_ns: u64,

    /// Reading [x, y, z] in sensor frame.
    pub values: [f64; 3],
}

impl SensorSample {
    /// Creates a new sample.
    ///
    /// Assumptions:
    /// - timestamp_ns is monotonically increasing per sensor stream
    /// - values are raw (calibration bias still present)
    pub fn new(timestamp_ns: u64, values: [f64; 3]) -> Self {
        Self {
            timestamp_ns,
            values,
        }
    }

    /// Euclidean norm of the reading.
    pub fn magnitude(&self) -> f64 {
        norm3(&self.values)
    }
}

/// Euclidean norm of a three-component vector.
#[inline]
pub fn norm3(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Convert a nanosecond interval to seconds.
#[inline]
pub fn ns_to_s(ns: u64) -> f64 {
    ns as f64 * 1e-9
}

// ============================================================================
// STEP TYPES
// ============================================================================

/// A detected step.
///
/// Produced exactly once per valid peak-to-valley episode, consumed by the
/// step-length estimator and then discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    /// Step index within the session, starting at 1.
    pub index: u32,
    /// Largest smoothed acceleration magnitude seen in the episode (m/s²).
    pub peak: f64,
    /// Smallest smoothed acceleration magnitude seen in the episode (m/s²).
    pub valley: f64,
    /// Timestamp of the sample that fired the step.
    pub timestamp_ns: u64,
}

impl StepEvent {
    pub fn new(index: u32, peak: f64, valley: f64, timestamp_ns: u64) -> Self {
        Self {
            index,
            peak,
            valley,
            timestamp_ns,
        }
    }

    /// Peak-to-valley amplitude of the episode.
    pub fn amplitude(&self) -> f64 {
        self.peak - self.valley
    }
}

/// Binary walking-direction classification used by drift elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionClass {
    /// Heading is changing slowly; the walker goes straight.
    #[default]
    Straight,
    /// Heading changed by at least the turn threshold.
    Turning,
}

// ============================================================================
// POSITION TYPES
// ============================================================================

/// A 2-D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from origin.
    pub fn distance_from_origin(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// 2-D distance to another point.
    pub fn distance_to(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ============================================================================
// SESSION TYPES
// ============================================================================

/// Lifecycle of a measurement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Constructed, `start()` not called yet.
    #[default]
    Idle,
    /// Accepting samples.
    Running,
    /// Finalized by `stop()`. A later `start()` resumes.
    Stopped,
}

/// Everything the session log needs, captured at one instant.
///
/// Position is already in the reported frame and heading in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdrSnapshot {
    /// Nanoseconds since the session origin.
    pub elapsed_ns: u64,
    /// Bias-corrected, smoothed acceleration (m/s²).
    pub acceleration: [f64; 3],
    /// Bias-corrected, smoothed and complementary-corrected angular rate (rad/s).
    pub angular_rate: [f64; 3],
    /// Steps taken this session.
    pub step_count: u32,
    /// Mean step length (total distance / step count), 0 without steps.
    pub step_length: f64,
    /// Position in the reported frame.
    pub position: Point2,
    /// Drift-corrected heading in radians.
    pub heading_rad: f64,
    /// Cumulative walked distance in meters.
    pub total_distance: f64,
    /// Magnitude of the smoothed acceleration.
    pub acceleration_magnitude: f64,
}

impl PdrSnapshot {
    /// Heading converted for presentation.
    pub fn heading_degrees(&self) -> f64 {
        self.heading_rad.to_degrees()
    }
}
