//! PDR Sensing Engine Library
//!
//! A pedestrian dead reckoning kernel that turns raw accelerometer and
//! gyroscope streams into a running estimate of step count, walked distance,
//! heading and 2-D position.
//!
//! # Design Philosophy
//!
//! - **Sample-driven**: every ingestion call is a deterministic function of
//!   the current state and one sample. No threads, no clocks, no I/O.
//! - **Single owner**: [`PdrEngine`] owns every stage; the host serializes
//!   calls into it.
//! - **Bounded state**: O(1) work per sample, fixed-size histories only.
//! - **Garbage in, garbage out**: non-finite samples propagate instead of
//!   being clamped, so corruption stays visible at the query boundary.
//!
//! # Example
//!
//! ```
//! use pdr_sensing::{PdrConfig, PdrEngine, SensorSample};
//!
//! let mut engine = PdrEngine::new(PdrConfig::default())?;
//! engine.start();
//!
//! for i in 0..100u64 {
//!     let t = i * 10_000_000;
//!     engine.ingest_acceleration(SensorSample::new(t, [0.16, 0.17, 9.85]));
//!     engine.ingest_angular_rate(SensorSample::new(t, [0.0, 0.0, 0.0]));
//! }
//!
//! engine.stop();
//! assert_eq!(engine.step_count(), 0);
//! # Ok::<(), pdr_sensing::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod heading;
pub mod orientation;
pub mod pipeline;
pub mod signal;
pub mod step_detection;
pub mod stride;
pub mod trajectory;
pub mod types;


// Re-export commonly used types
pub use config::PdrConfig;
pub use error::{Error, Result};
pub use pipeline::PdrEngine;
pub use types::{PdrSnapshot, Point2, SensorSample, SessionState, StepEvent};
