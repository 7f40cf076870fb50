//! Configuration for the PDR engine
//!
//! Every stage owns its own config struct with a `Default` carrying the
//! tuned constants; [`PdrConfig`] bundles them and loads from TOML. Any
//! section or key left out of the file keeps its default.

use crate::error::{Error, Result};
use crate::orientation::OrientationConfig;
use crate::signal::NoisePair;
use crate::step_detection::StepDetectorConfig;
use crate::stride::StepLengthConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Standard gravity (m/s²).
const GRAVITY: f64 = 9.806_65;

/// Per-device sensor offsets, measured offline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Calibration {
    /// Accelerometer bias (m/s²)
    pub accel_bias: [f64; 3],
    /// Gyroscope bias (rad/s)
    pub gyro_bias: [f64; 3],
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            accel_bias: [0.1639, 0.1739, 0.0440],
            gyro_bias: [8.2161e-5, -1.0239e-5, -0.6398e-5],
        }
    }
}

/// Smoother noise per sensor class.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorNoise {
    pub acceleration: NoisePair,
    pub angular_rate: NoisePair,
}

impl Default for SensorNoise {
    fn default() -> Self {
        Self {
            acceleration: NoisePair::ACCELERATION,
            angular_rate: NoisePair::ANGULAR_RATE,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PdrConfig {
    pub calibration: Calibration,
    pub noise: SensorNoise,
    pub step: StepDetectorConfig,
    pub stride: StepLengthConfig,
    pub orientation: OrientationConfig,
}

impl PdrConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PdrConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use pdr_sensing::config::PdrConfig;
    ///
    /// let config = PdrConfig::from_file("pdr.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Check every value is in its usable range.
    ///
    /// Values that are legal but unusual are logged at `warn` instead.
    pub fn validate(&self) -> Result<()> {
        let finite3 = |v: &[f64; 3]| v.iter().all(|x| x.is_finite());
        if !finite3(&self.calibration.accel_bias) {
            return Err(Error::invalid("calibration.accel_bias", "must be finite"));
        }
        if !finite3(&self.calibration.gyro_bias) {
            return Err(Error::invalid("calibration.gyro_bias", "must be finite"));
        }

        check_noise("noise.acceleration", self.noise.acceleration)?;
        check_noise("noise.angular_rate", self.noise.angular_rate)?;
        check_noise("stride.smoothing", self.stride.smoothing)?;

        let step = &self.step;
        if !step.threshold.is_finite() {
            return Err(Error::invalid("step.threshold", "must be finite"));
        }
        if !is_non_negative(step.min_interval_s) {
            return Err(Error::invalid("step.min_interval_s", "must be >= 0"));
        }
        if step.max_interval_s.is_nan() || step.max_interval_s <= step.min_interval_s {
            return Err(Error::invalid(
                "step.max_interval_s",
                format!("must be greater than min_interval_s ({})", step.min_interval_s),
            ));
        }
        if step.threshold <= GRAVITY {
            log::warn!(
                "Step threshold {:.2} m/s² is at or below gravity; standing still will open episodes",
                step.threshold
            );
        }

        if !is_positive(self.stride.weinberg_k) {
            return Err(Error::invalid("stride.weinberg_k", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.stride.history_weight) {
            return Err(Error::invalid("stride.history_weight", "must be within [0, 1]"));
        }

        let orientation = &self.orientation;
        if !is_non_negative(orientation.proportional_gain) {
            return Err(Error::invalid("orientation.proportional_gain", "must be >= 0"));
        }
        if !is_non_negative(orientation.integral_gain) {
            return Err(Error::invalid("orientation.integral_gain", "must be >= 0"));
        }
        if !is_positive(orientation.nominal_dt_s) {
            return Err(Error::invalid("orientation.nominal_dt_s", "must be positive"));
        }
        if orientation.nominal_dt_s > 0.1 {
            log::warn!(
                "Nominal integration step {:.3}s is coarse; heading will lag fast turns",
                orientation.nominal_dt_s
            );
        }
        let turn = orientation.drift.turn_threshold_deg;
        if !is_positive(turn) || turn >= 360.0 {
            return Err(Error::invalid(
                "orientation.drift.turn_threshold_deg",
                "must be within (0, 360)",
            ));
        }

        Ok(())
    }
}

fn is_positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

fn is_non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

fn check_noise(field: &'static str, noise: NoisePair) -> Result<()> {
    if is_positive(noise.process) && is_positive(noise.observation) {
        Ok(())
    } else {
        Err(Error::invalid(field, "process and observation variances must be positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::TimeStep;
    use crate::step_detection::StalePolicy;

    #[test]
    fn test_default_config_is_valid() {
        let config = PdrConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step.threshold, 10.0);
        assert_eq!(config.step.stale_policy, StalePolicy::Literal);
        assert_eq!(config.stride.weinberg_k, 0.97);
        assert_eq!(config.orientation.proportional_gain, 0.8);
        assert_eq!(config.orientation.drift.turn_threshold_deg, 20.0);
        assert_eq!(config.calibration.accel_bias, [0.1639, 0.1739, 0.0440]);
    }

    #[test]
    fn test_toml_serialization() {
        let config = PdrConfig::default();
        let toml_string = config.to_toml_string().unwrap();

        assert!(toml_string.contains("[calibration]"));
        assert!(toml_string.contains("[step]"));
        assert!(toml_string.contains("[orientation.drift]"));
        assert!(toml_string.contains("time_step = \"fixed\""));

        let parsed = PdrConfig::from_toml_str(&toml_string).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_content = r#"
[step]
threshold = 10.5
stale_policy = "reanchor"

[orientation]
time_step = "measured"
"#;

        let config = PdrConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.step.threshold, 10.5);
        assert_eq!(config.step.min_interval_s, 0.25);
        assert_eq!(config.step.stale_policy, StalePolicy::Reanchor);
        assert_eq!(config.orientation.time_step, TimeStep::Measured);
        assert_eq!(config.orientation.nominal_dt_s, 0.01);
        assert_eq!(config.calibration, Calibration::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PdrConfig::from_toml_str("").unwrap(), PdrConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = PdrConfig::from_toml_str("[step\nthreshold = ").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_inverted_interval_rejected() {
        let toml_content = r#"
[step]
min_interval_s = 2.0
max_interval_s = 0.25
"#;
        match PdrConfig::from_toml_str(toml_content) {
            Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, "step.max_interval_s"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_noise_rejected() {
        let mut config = PdrConfig::default();
        config.noise.acceleration.observation = 0.0;
        match config.validate() {
            Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, "noise.acceleration"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_history_weight_out_of_range_rejected() {
        let mut config = PdrConfig::default();
        config.stride.history_weight = 1.5;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { field: "stride.history_weight", .. })
        ));
    }

    #[test]
    fn test_nan_bias_rejected() {
        let mut config = PdrConfig::default();
        config.calibration.gyro_bias[2] = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { field: "calibration.gyro_bias", .. })
        ));
    }

    #[test]
    fn test_zero_time_step_rejected() {
        let mut config = PdrConfig::default();
        config.orientation.nominal_dt_s = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PdrConfig::from_file("/nonexistent/pdr.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
