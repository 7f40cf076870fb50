//! Step Detection Module.
//!
//! Implements step counting over the smoothed acceleration magnitude with a
//! two-state peak/valley machine:
//! - `Idle` until the magnitude rises above the detection threshold
//! - `Detecting` while it stays above, tracking the episode envelope
//!
//! A step fires once per episode, on the first sample where the magnitude
//! has started to fall from its running peak. A timing gate rejects peaks
//! that arrive too soon after the previous step (shock, vibration) or too
//! late (device at rest). What a late peak does to the timing baseline is
//! selected by [`StalePolicy`].

use serde::{Deserialize, Serialize};

use crate::types::{ns_to_s, StepEvent};

/// Handling of peaks that arrive after the maximum interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Drop the peak; the baseline only ever moves on a fired step. Once the
    /// maximum interval has passed without a step, no further step fires.
    #[default]
    Literal,
    /// Drop the peak and move the baseline to it, so walking resumes after a
    /// pause at the cost of one step.
    Reanchor,
}

/// Configuration for step detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDetectorConfig {
    /// Magnitude the smoothed acceleration must exceed to open an episode (m/s²).
    pub threshold: f64,
    /// Minimum time between steps in seconds (exclusive).
    pub min_interval_s: f64,
    /// Maximum time between steps in seconds (exclusive).
    pub max_interval_s: f64,
    pub stale_policy: StalePolicy,
}

impl Default for StepDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            min_interval_s: 0.25, // Max 4 steps/sec
            max_interval_s: 2.0,  // Min 0.5 steps/sec
            stale_policy: StalePolicy::Literal,
        }
    }
}

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorPhase {
    /// Magnitude at or below threshold.
    Idle,
    /// Inside an above-threshold episode.
    Detecting {
        /// Running maximum of the episode.
        peak: f64,
        /// Running minimum of the episode.
        valley: f64,
        /// Whether this episode already produced a step.
        counted: bool,
        /// Whether a peak of this episode was already rejected by the gate.
        rejected: bool,
    },
}

/// Outcome of the timing gate for one falling sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Pass,
    /// Unarmed detector took this peak as its baseline.
    Anchored,
    TooFast,
    Stale,
}

/// Peak/valley step detector.
#[derive(Debug, Clone)]
pub struct StepDetector {
    config: StepDetectorConfig,
    phase: DetectorPhase,

    // Timing baseline: last fired step, or the session origin
    last_step_ns: Option<u64>,

    step_count: u32,
    rejected_fast: u64,
    rejected_stale: u64,
}

impl StepDetector {
    /// Create a new step detector with the given configuration.
    pub fn new(config: StepDetectorConfig) -> Self {
        Self {
            config,
            phase: DetectorPhase::Idle,
            last_step_ns: None,
            step_count: 0,
            rejected_fast: 0,
            rejected_stale: 0,
        }
    }

    /// Set the timing baseline (session start).
    pub fn arm(&mut self, timestamp_ns: u64) {
        self.last_step_ns = Some(timestamp_ns);
    }

    /// Process one smoothed acceleration magnitude.
    /// Returns a StepEvent if a step fired on this sample.
    pub fn update(&mut self, magnitude: f64, timestamp_ns: u64) -> Option<StepEvent> {
        if magnitude.is_nan() || magnitude <= self.config.threshold {
            self.phase = DetectorPhase::Idle;
            return None;
        }

        let (peak, valley, mut counted, mut rejected) = match self.phase {
            DetectorPhase::Idle => (magnitude, magnitude, false, false),
            DetectorPhase::Detecting {
                peak,
                valley,
                counted,
                rejected,
            } => (peak, valley, counted, rejected),
        };

        let mut event = None;
        if magnitude < peak && !counted {
            match self.timing_gate(timestamp_ns) {
                Gate::Pass => {
                    self.step_count += 1;
                    self.last_step_ns = Some(timestamp_ns);
                    counted = true;
                    event = Some(StepEvent::new(self.step_count, peak, valley, timestamp_ns));
                }
                Gate::Anchored => rejected = true,
                Gate::TooFast => {
                    if !rejected {
                        self.rejected_fast += 1;
                        rejected = true;
                    }
                }
                Gate::Stale => {
                    if !rejected {
                        self.rejected_stale += 1;
                        rejected = true;
                    }
                    if self.config.stale_policy == StalePolicy::Reanchor {
                        self.last_step_ns = Some(timestamp_ns);
                    }
                }
            }
        }

        self.phase = DetectorPhase::Detecting {
            peak: peak.max(magnitude),
            valley: valley.min(magnitude),
            counted,
            rejected,
        };

        event
    }

    /// Get the total number of steps detected.
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Current state of the machine.
    pub fn phase(&self) -> DetectorPhase {
        self.phase
    }

    /// Episodes whose peak was dropped for arriving within the minimum interval.
    pub fn rejected_fast(&self) -> u64 {
        self.rejected_fast
    }

    /// Episodes whose peak was dropped for arriving after the maximum interval.
    pub fn rejected_stale(&self) -> u64 {
        self.rejected_stale
    }

    /// Reset the detector state. The timing baseline is cleared too; call
    /// [`arm`](Self::arm) again before the next episode.
    pub fn reset(&mut self) {
        self.phase = DetectorPhase::Idle;
        self.last_step_ns = None;
        self.step_count = 0;
        self.rejected_fast = 0;
        self.rejected_stale = 0;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    fn timing_gate(&mut self, timestamp_ns: u64) -> Gate {
        let Some(last) = self.last_step_ns else {
            // Unarmed: the first peak only anchors the baseline
            self.last_step_ns = Some(timestamp_ns);
            return Gate::Anchored;
        };

        let interval_s = ns_to_s(timestamp_ns.saturating_sub(last));
        if interval_s <= self.config.min_interval_s {
            log::trace!("Peak rejected: {:.3}s after previous step", interval_s);
            return Gate::TooFast;
        }
        if interval_s >= self.config.max_interval_s {
            log::trace!("Peak rejected: stale baseline ({:.3}s)", interval_s);
            return Gate::Stale;
        }
        Gate::Pass
    }
}

impl Default for StepDetector {
    fn default() -> Self {
        Self::new(StepDetectorConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
