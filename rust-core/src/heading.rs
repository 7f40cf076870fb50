//! Heading Drift Elimination Module.
//!
//! Integrated gyroscope heading drifts without bound over a long walk.
//! Indoors, walking directions cluster at building-aligned angles, so the
//! heading is snapped to an angular grid depending on how the walker moves:
//! - Turning (large second-difference of heading): nearest 45° multiple
//! - Straight after straight: 22.5° grid with a sine-weighted damping term
//! - Straight right after a turn: treated like turning
//!
//! Heading is only corrected once a few steps have been taken; before that
//! the raw integrated heading passes through.

use std::f64::consts::{FRAC_PI_4, FRAC_PI_8};

use serde::{Deserialize, Serialize};

use crate::types::MotionClass;

/// Configuration for heading drift elimination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Heading change (over the 3-sample history) at or above which the
    /// walker is classified as turning, in degrees.
    pub turn_threshold_deg: f64,
    /// Steps that must be taken before quantization starts.
    pub warmup_steps: u32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            turn_threshold_deg: 20.0,
            warmup_steps: 3,
        }
    }
}

/// Adaptive heading quantizer.
#[derive(Debug, Clone)]
pub struct DriftEliminator {
    turn_threshold_rad: f64,
    warmup_steps: u32,

    // Corrected headings, oldest first; [2] is the current heading
    history: [f64; 3],
    motion: MotionClass,
    previous_motion: MotionClass,
}

impl DriftEliminator {
    pub fn new(config: &DriftConfig) -> Self {
        Self {
            turn_threshold_rad: config.turn_threshold_deg.to_radians(),
            warmup_steps: config.warmup_steps,
            history: [0.0; 3],
            motion: MotionClass::Straight,
            previous_motion: MotionClass::Straight,
        }
    }

    /// Correct a raw integrated heading. `step_count` gates the warm-up.
    pub fn correct(&mut self, raw_heading: f64, step_count: u32) -> f64 {
        if step_count < self.warmup_steps {
            self.history[2] = raw_heading;
            return raw_heading;
        }

        self.history.copy_within(1.., 0);

        let heading_change =
            (raw_heading - self.history[1]) + (self.history[1] - self.history[0]);
        self.previous_motion = self.motion;
        self.motion = if heading_change.abs() < self.turn_threshold_rad {
            MotionClass::Straight
        } else {
            MotionClass::Turning
        };

        let corrected = match (self.previous_motion, self.motion) {
            (MotionClass::Straight, MotionClass::Straight) => snap_fine(raw_heading),
            // Turning, and the first straight sample after a turn
            _ => snap_coarse(raw_heading),
        };

        self.history[2] = corrected;
        corrected
    }

    /// Current drift-corrected heading in radians.
    pub fn heading(&self) -> f64 {
        self.history[2]
    }

    /// Corrected heading history, oldest first.
    pub fn history(&self) -> [f64; 3] {
        self.history
    }

    pub fn motion(&self) -> MotionClass {
        self.motion
    }

    pub fn previous_motion(&self) -> MotionClass {
        self.previous_motion
    }

    pub fn reset(&mut self) {
        self.history = [0.0; 3];
        self.motion = MotionClass::Straight;
        self.previous_motion = MotionClass::Straight;
    }
}

/// Snap to a 45° multiple, rounding up when the remainder exceeds 22.5°.
///
/// The remainder keeps the sign of `heading`, so negative headings always
/// round toward zero.
pub fn snap_coarse(heading: f64) -> f64 {
    let remainder = heading % FRAC_PI_4;
    if remainder > FRAC_PI_8 {
        heading - remainder + FRAC_PI_4
    } else {
        heading - remainder
    }
}

/// Snap toward the 22.5° grid with the extra `-Δ·sin(Δ)·k` damping term.
pub fn snap_fine(heading: f64) -> f64 {
    let k = round_half_up(heading / FRAC_PI_8);
    let residual = heading - FRAC_PI_8 * k;
    heading - residual - residual * residual.sin() * k
}

/// Round to nearest, ties toward positive infinity.
#[inline]
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

// ============================================================================
// TESTS
// ============================================================================
