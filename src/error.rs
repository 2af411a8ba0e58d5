// src/error.rs
//! Unified error handling for the filtering core
//!
//! Only construction paths can fail: configuring a primitive filter, loading a
//! coordinate file, building a [`TimeBuffer`](crate::processing::buffer::TimeBuffer)
//! or loading a parameter file. Resolution, margin computation, orchestration and
//! descriptor decoding never fail; they degrade a single feature and log it.

use crate::config::loader::ConfigError;
use thiserror::Error;

/// Unified error type for the filtering core
#[derive(Debug, Error)]
pub enum FilterError {
    /// A primitive filter or a buffer was given a parameter it cannot honor
    #[error("[CONFIG] Invalid {parameter}: {reason}")]
    InvalidParameter {
        /// Parameter name, e.g. `"cutoff_hz"`
        parameter: String,
        /// Human readable reason
        reason: String,
    },

    /// Buffer dimensions are inconsistent with the requested window
    #[error("[BUFFER] {reason} (expected: {expected}, got: {actual})")]
    BufferShape {
        /// What was being checked
        reason: String,
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Electrode coordinate file missing or malformed
    #[error("[COORDINATES] {path}: {reason}")]
    Coordinates {
        /// File path as given by the caller
        path: String,
        /// Human readable reason
        reason: String,
    },

    /// Parameter file loading failed
    #[error("[CONFIG] {0}")]
    Config(#[from] ConfigError),

    /// Underlying I/O failure
    #[error("[IO] {0}")]
    Io(#[from] std::io::Error),
}

impl FilterError {
    /// Shorthand for [`FilterError::InvalidParameter`]
    pub fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        FilterError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`FilterError::Coordinates`]
    pub fn coordinates(path: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::Coordinates {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for filtering operations
pub type FilterResult<T> = Result<T, FilterError>;
