//! EEG-Filter-Core: multichannel EEG/MEG filtering pipeline
//!
//! This library turns a user's filter request into a consistent configuration
//! and runs it over channel×time buffers in parallel. It features:
//!
//! - Butterworth, notch, baseline and envelope filters, causal or zero phase
//! - Spatial filtering, ranking and re-referencing across channels
//! - Safe margin computation so windows can be filtered without edge artifacts
//! - Compact descriptor strings that round-trip a configuration
//! - Layered TOML parameter files with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use eeg_filter_core::config::FilterParams;
//! use eeg_filter_core::processing::{ChannelSelection, FilterPipeline, FilterPrecedence, TimeBuffer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut params = FilterParams::bandpass(1.0, 40.0, 2);
//!     params.notch.enabled = true;
//!     params.notch.frequencies_hz = vec![50.0];
//!
//!     let pipeline = FilterPipeline::with_feedback(&params, 250.0);
//!     for warning in pipeline.warnings() {
//!         eprintln!("{}", warning);
//!     }
//!
//!     // Read the margin on both sides of a one second window
//!     let margin = pipeline.safe_margin();
//!     let mut buffer = TimeBuffer::with_margin(32, 250, margin);
//!     // ... fill buffer.data_mut() ...
//!
//!     pipeline.apply_default(&mut buffer, &ChannelSelection::all_valid(32), FilterPrecedence::ALL);
//!     println!("{}: {:?}", pipeline.descriptor(), buffer.window().dim());
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod processing;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, FilterParams};
pub use error::{FilterError, FilterResult};
pub use processing::{
    ChannelSelection, FilterConfiguration, FilterPipeline, FilterPrecedence, ReferenceMode, TimeBuffer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Multichannel EEG/MEG filtering pipeline".to_string(),
        features: vec![
            "Butterworth and notch filtering".to_string(),
            "Spatial filtering and re-referencing".to_string(),
            "Safe margin computation".to_string(),
            "Filter descriptor strings".to_string(),
            "Layered parameter files".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
