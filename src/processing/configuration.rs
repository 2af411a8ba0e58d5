// src/processing/configuration.rs
//! Resolved, internally consistent filter settings
//!
//! A [`FilterConfiguration`] is only produced by the resolver. Frequency filters
//! are *effectively* active only once a sampling frequency is known; without one
//! their settings are kept as requested so a later re-resolution can use them.

use crate::config::constants::{butterworth, envelope, frequency};
use crate::config::filter_params::{
    ButterworthParams, EnvelopeParams, FilterParams, NotchParams, ReferenceParams, SpatialParams, ThresholdParams,
};
use crate::processing::filters::envelope::window_samples;
use crate::processing::filters::{Causality, NotchPlan, RectificationMode};
use crate::processing::reference::ReferenceMode;
use crate::processing::spatial::SpatialFilterKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfiguration {
    /// 0 when unknown
    pub sampling_frequency_hz: f64,
    pub frequency_floor_hz: f64,
    pub causality: Causality,

    pub baseline: bool,

    /// High-pass cutoff, 0 = disabled
    pub butterworth_high_hz: f64,
    pub order_high: usize,
    /// Low-pass cutoff, 0 = disabled
    pub butterworth_low_hz: f64,
    pub order_low: usize,

    pub notches_enabled: bool,
    /// Requested fundamentals, clipped
    pub notch_frequencies: Vec<f64>,
    pub notch_auto_harmonics: bool,

    pub spatial_enabled: bool,
    pub spatial_filter_kind: SpatialFilterKind,
    pub coordinates_file: Option<PathBuf>,

    pub ranking_enabled: bool,

    /// Default reference, callers may override it per `apply`
    pub reference: ReferenceMode,
    pub reference_channels: Vec<usize>,

    pub rectification_mode: RectificationMode,

    pub envelope_enabled: bool,
    pub envelope_width_ms: f64,

    pub threshold_above_enabled: bool,
    pub threshold_above_value: f64,
    pub threshold_below_enabled: bool,
    pub threshold_below_value: f64,
}

impl FilterConfiguration {
    pub fn has_sampling_frequency(&self) -> bool {
        self.sampling_frequency_hz > 0.0
    }

    /// Nyquist frequency, 0 when the sampling frequency is unknown
    pub fn nyquist_hz(&self) -> f64 {
        self.sampling_frequency_hz / 2.0
    }

    pub fn is_highpass_active(&self) -> bool {
        self.has_sampling_frequency() && self.butterworth_high_hz > 0.0
    }

    pub fn is_lowpass_active(&self) -> bool {
        self.has_sampling_frequency() && self.butterworth_low_hz > 0.0
    }

    /// Both sides active, run as a single band-pass
    pub fn is_bandpass_active(&self) -> bool {
        self.is_highpass_active() && self.is_lowpass_active()
    }

    pub fn is_notch_active(&self) -> bool {
        self.has_sampling_frequency() && self.notches_enabled && !self.notch_frequencies.is_empty()
    }

    pub fn is_envelope_active(&self) -> bool {
        self.has_sampling_frequency() && self.envelope_enabled
    }

    /// Any filter whose settling needs a margin
    pub fn has_frequency_filter(&self) -> bool {
        self.is_highpass_active() || self.is_lowpass_active() || self.is_notch_active() || self.is_envelope_active()
    }

    /// Any filter run by channel
    pub fn has_temporal_filter(&self) -> bool {
        self.baseline || self.has_frequency_filter()
    }

    /// Any filter run by time sample, the caller's reference aside
    pub fn has_non_temporal_filter(&self) -> bool {
        self.spatial_enabled
            || self.ranking_enabled
            || self.reference != ReferenceMode::AsRecorded
            || self.rectification_mode != RectificationMode::None
            || self.threshold_above_enabled
            || self.threshold_below_enabled
    }

    /// Order of the fused band-pass: cascading two order-`k` sides gives `2k`
    pub fn bandpass_order(&self) -> usize {
        2 * self.order_low.max(self.order_high)
    }

    /// Notch targets for the current sampling frequency, empty when notches are inactive
    pub fn notch_plan(&self) -> NotchPlan {
        if !self.is_notch_active() {
            return NotchPlan::default();
        }

        let lowpass_edge = self.is_lowpass_active().then_some(self.butterworth_low_hz);
        NotchPlan::build(
            &self.notch_frequencies,
            self.notch_auto_harmonics,
            self.nyquist_hz(),
            lowpass_edge,
        )
    }

    /// Envelope window in samples, 0 when the envelope is inactive
    pub fn envelope_window_samples(&self) -> usize {
        if self.is_envelope_active() {
            window_samples(self.envelope_width_ms, self.sampling_frequency_hz)
        } else {
            0
        }
    }
}

impl Default for FilterConfiguration {
    /// Nothing requested, no sampling frequency
    fn default() -> Self {
        Self {
            sampling_frequency_hz: 0.0,
            frequency_floor_hz: frequency::DEFAULT_MIN_FREQUENCY_HZ,
            causality: Causality::default(),
            baseline: false,
            butterworth_high_hz: 0.0,
            order_high: butterworth::DEFAULT_ORDER,
            butterworth_low_hz: 0.0,
            order_low: butterworth::DEFAULT_ORDER,
            notches_enabled: false,
            notch_frequencies: Vec::new(),
            notch_auto_harmonics: false,
            spatial_enabled: false,
            spatial_filter_kind: SpatialFilterKind::default(),
            coordinates_file: None,
            ranking_enabled: false,
            reference: ReferenceMode::default(),
            reference_channels: Vec::new(),
            rectification_mode: RectificationMode::default(),
            envelope_enabled: false,
            envelope_width_ms: envelope::DEFAULT_WIDTH_MS,
            threshold_above_enabled: false,
            threshold_above_value: 0.0,
            threshold_below_enabled: false,
            threshold_below_value: 0.0,
        }
    }
}

/// Raw parameters that resolve back to this configuration
impl From<&FilterConfiguration> for FilterParams {
    fn from(config: &FilterConfiguration) -> Self {
        FilterParams {
            frequency_floor_hz: config.frequency_floor_hz,
            causality: config.causality,
            baseline: config.baseline,
            ranking: config.ranking_enabled,
            rectification: config.rectification_mode,
            butterworth: ButterworthParams {
                highpass_hz: config.butterworth_high_hz,
                highpass_order: config.order_high,
                lowpass_hz: config.butterworth_low_hz,
                lowpass_order: config.order_low,
            },
            notch: NotchParams {
                enabled: config.notches_enabled,
                frequencies_hz: config.notch_frequencies.clone(),
                auto_harmonics: config.notch_auto_harmonics,
            },
            spatial: SpatialParams {
                enabled: config.spatial_enabled,
                kind: config.spatial_filter_kind,
                coordinates_file: config.coordinates_file.clone(),
            },
            reference: ReferenceParams {
                mode: config.reference,
                channels: config.reference_channels.clone(),
            },
            envelope: EnvelopeParams {
                enabled: config.envelope_enabled,
                width_ms: config.envelope_width_ms,
            },
            threshold: ThresholdParams {
                above_enabled: config.threshold_above_enabled,
                above_value: config.threshold_above_value,
                below_enabled: config.threshold_below_enabled,
                below_value: config.threshold_below_value,
            },
        }
    }
}

/// Descriptor text, see [`crate::processing::descriptor`]
impl fmt::Display for FilterConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::processing::descriptor::encode(self))
    }
}
