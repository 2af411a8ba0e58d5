// src/config/filter_params.rs
//! Raw, user-facing filter parameter record
//!
//! This is what a dialog or a parameter file produces. Values are taken as
//! requested; clipping and consistency fixes happen in the resolver.

use crate::config::constants::{butterworth, envelope, frequency};
use crate::processing::filters::pointwise::RectificationMode;
use crate::processing::filters::Causality;
use crate::processing::reference::ReferenceMode;
use crate::processing::spatial::SpatialFilterKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete raw parameter record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Lowest frequency any filter may use (clipped to an absolute floor)
    #[serde(default = "defaults::frequency_floor_hz")]
    pub frequency_floor_hz: f64,

    #[serde(default)]
    pub causality: Causality,

    /// DC removal before the Butterworth stage
    #[serde(default)]
    pub baseline: bool,

    #[serde(default)]
    pub ranking: bool,

    #[serde(default)]
    pub rectification: RectificationMode,

    #[serde(default)]
    pub butterworth: ButterworthParams,

    #[serde(default)]
    pub notch: NotchParams,

    #[serde(default)]
    pub spatial: SpatialParams,

    #[serde(default)]
    pub reference: ReferenceParams,

    #[serde(default)]
    pub envelope: EnvelopeParams,

    #[serde(default)]
    pub threshold: ThresholdParams,
}

/// Butterworth cutoffs; a cutoff of 0 disables that side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButterworthParams {
    #[serde(default)]
    pub highpass_hz: f64,

    #[serde(default = "defaults::order")]
    pub highpass_order: usize,

    #[serde(default)]
    pub lowpass_hz: f64,

    #[serde(default = "defaults::order")]
    pub lowpass_order: usize,
}

/// Notch fundamentals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NotchParams {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub frequencies_hz: Vec<f64>,

    #[serde(default)]
    pub auto_harmonics: bool,
}

/// Spatial filter selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpatialParams {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub kind: SpatialFilterKind,

    /// Electrode coordinates (`.xyz`)
    #[serde(default)]
    pub coordinates_file: Option<PathBuf>,
}

/// Default re-referencing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReferenceParams {
    #[serde(default)]
    pub mode: ReferenceMode,

    /// Explicit reference channels, used with [`ReferenceMode::Channels`]
    #[serde(default)]
    pub channels: Vec<usize>,
}

/// Envelope settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeParams {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::envelope_width_ms")]
    pub width_ms: f64,
}

/// Thresholding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ThresholdParams {
    #[serde(default)]
    pub above_enabled: bool,

    #[serde(default)]
    pub above_value: f64,

    #[serde(default)]
    pub below_enabled: bool,

    #[serde(default)]
    pub below_value: f64,
}

mod defaults {
    use super::*;

    pub fn frequency_floor_hz() -> f64 { frequency::DEFAULT_MIN_FREQUENCY_HZ }
    pub fn order() -> usize { butterworth::DEFAULT_ORDER }
    pub fn envelope_width_ms() -> f64 { envelope::DEFAULT_WIDTH_MS }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            frequency_floor_hz: defaults::frequency_floor_hz(),
            causality: Causality::default(),
            baseline: false,
            ranking: false,
            rectification: RectificationMode::default(),
            butterworth: ButterworthParams::default(),
            notch: NotchParams::default(),
            spatial: SpatialParams::default(),
            reference: ReferenceParams::default(),
            envelope: EnvelopeParams::default(),
            threshold: ThresholdParams::default(),
        }
    }
}

impl Default for ButterworthParams {
    fn default() -> Self {
        Self {
            highpass_hz: 0.0,
            highpass_order: defaults::order(),
            lowpass_hz: 0.0,
            lowpass_order: defaults::order(),
        }
    }
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            enabled: false,
            width_ms: defaults::envelope_width_ms(),
        }
    }
}

impl FilterParams {
    /// Band-pass request, the most common EEG setup
    pub fn bandpass(highpass_hz: f64, lowpass_hz: f64, order: usize) -> Self {
        Self {
            butterworth: ButterworthParams {
                highpass_hz,
                highpass_order: order,
                lowpass_hz,
                lowpass_order: order,
            },
            ..Default::default()
        }
    }
}

/// Cross-field checks that cannot be expressed per key
///
/// Out-of-range frequencies are not reported here, the resolver clips them.
pub fn validate_filter_params(params: &FilterParams) -> Result<(), String> {
    if !params.frequency_floor_hz.is_finite() || params.frequency_floor_hz <= 0.0 {
        return Err("Frequency floor must be positive".to_string());
    }

    let bw = &params.butterworth;
    if bw.highpass_hz < 0.0 || bw.lowpass_hz < 0.0 {
        return Err("Butterworth cutoffs cannot be negative".to_string());
    }
    if bw.highpass_order == 0 || bw.lowpass_order == 0 {
        return Err("Filter order must be greater than 0".to_string());
    }

    for &freq in &params.notch.frequencies_hz {
        if !freq.is_finite() || freq <= 0.0 {
            return Err("Notch frequencies must be positive".to_string());
        }
    }

    if params.envelope.enabled && params.envelope.width_ms <= 0.0 {
        return Err("Envelope width must be positive".to_string());
    }

    if params.spatial.enabled && params.spatial.coordinates_file.is_none() {
        return Err("Spatial filter requires a coordinates file".to_string());
    }

    if params.reference.mode == ReferenceMode::Channels && params.reference.channels.is_empty() {
        return Err("Channel reference requires at least one reference channel".to_string());
    }

    Ok(())
}
