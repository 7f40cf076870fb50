//! Error types for the PDR engine.
//!
//! The numeric pipeline itself never fails: malformed samples propagate as
//! NaN and are visible at the query boundary. Errors only come from the
//! surfaces around it (configuration and log writers).

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// PDR engine error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is out of its valid range
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field
        field: &'static str,
        /// Human-readable constraint that was violated
        reason: String,
    },

    /// TOML configuration could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error in a log writer
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
