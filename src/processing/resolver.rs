// src/processing/resolver.rs
//! Turns a raw parameter record into a consistent configuration and its filter chain
//!
//! Resolution never fails. Out-of-range values are clipped, inconsistent or
//! unavailable features are dropped, and each such fix produces a warning that
//! non-silent callers get back as text.

use crate::config::constants::{butterworth, envelope, frequency, notch};
use crate::config::filter_params::FilterParams;
use crate::processing::configuration::FilterConfiguration;
use crate::processing::filters::{
    BaselineFilter, ButterworthFilter, ButterworthKind, Causality, EnvelopeFilter, NotchBank, RectificationMode,
    Rectifier, Thresholder,
};
use crate::processing::pipeline::{FilterPrecedence, FilterStep, Stage};
use crate::processing::ranking::RankingFilter;
use crate::processing::reference::{ReferenceMode, Rereference};
use crate::processing::spatial::{SpatialFilter, SpatialFilterKind};
use tracing::{debug, warn};

/// Output of [`resolve`]
#[derive(Debug)]
pub struct Resolution {
    pub configuration: FilterConfiguration,
    /// Configured filters in execution order
    pub chain: Vec<FilterStep>,
    /// Clipping and disabling notices, empty for silent resolutions
    pub warnings: Vec<String>,
}

/// Resolve `params` against a sampling frequency (0 or less when unknown)
///
/// Calling this twice with the same inputs gives identical configurations, and
/// resolving the parameters of a resolved configuration gives it back.
pub fn resolve(params: &FilterParams, sampling_frequency_hz: f64, silent: bool) -> Resolution {
    let mut resolver = Resolver::new(silent);
    let (configuration, spatial) = resolver.configuration(params, sampling_frequency_hz);
    let chain = resolver.chain(&configuration, spatial);

    debug!(
        steps = chain.len(),
        descriptor = %configuration,
        "Filter chain resolved"
    );

    Resolution {
        configuration,
        chain,
        warnings: resolver.warnings,
    }
}

struct Resolver {
    silent: bool,
    warnings: Vec<String>,
    floor_hz: f64,
    nyquist_hz: Option<f64>,
}

impl Resolver {
    fn new(silent: bool) -> Self {
        Self {
            silent,
            warnings: Vec::new(),
            floor_hz: frequency::DEFAULT_MIN_FREQUENCY_HZ,
            nyquist_hz: None,
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        if !self.silent {
            self.warnings.push(message);
        }
    }

    fn configuration(
        &mut self,
        params: &FilterParams,
        sampling_frequency_hz: f64,
    ) -> (FilterConfiguration, Option<SpatialFilter>) {
        let sampling_frequency_hz = if sampling_frequency_hz.is_finite() && sampling_frequency_hz > 0.0 {
            sampling_frequency_hz
        } else {
            0.0
        };
        self.nyquist_hz = (sampling_frequency_hz > 0.0).then(|| sampling_frequency_hz / 2.0);
        self.floor_hz = self.frequency_floor(params.frequency_floor_hz);

        let mut config = FilterConfiguration {
            sampling_frequency_hz,
            frequency_floor_hz: self.floor_hz,
            causality: params.causality,
            ranking_enabled: params.ranking,
            rectification_mode: params.rectification,
            ..Default::default()
        };

        self.baseline(params, &mut config);
        self.butterworth(params, &mut config);
        self.notches(params, &mut config);
        let spatial = self.spatial(params, &mut config);
        self.reference(params, &mut config);
        self.envelope(params, &mut config);
        self.thresholds(params, &mut config);

        (config, spatial)
    }

    fn frequency_floor(&mut self, requested: f64) -> f64 {
        if !requested.is_finite() || requested <= 0.0 {
            self.warn(format!(
                "Frequency floor {} is invalid, using {} Hz",
                requested,
                frequency::DEFAULT_MIN_FREQUENCY_HZ
            ));
            frequency::DEFAULT_MIN_FREQUENCY_HZ
        } else if requested < frequency::ABSOLUTE_MIN_FREQUENCY_HZ {
            self.warn(format!(
                "Frequency floor {} Hz raised to {} Hz",
                requested,
                frequency::ABSOLUTE_MIN_FREQUENCY_HZ
            ));
            frequency::ABSOLUTE_MIN_FREQUENCY_HZ
        } else {
            requested
        }
    }

    /// Clip into `[floor, Nyquist]`, the upper bound only when Nyquist is known
    fn clip(&mut self, label: &str, requested: f64) -> f64 {
        let mut clipped = requested.max(self.floor_hz);
        if let Some(nyquist) = self.nyquist_hz {
            clipped = clipped.min(nyquist);
        }

        if clipped != requested {
            self.warn(format!("{} of {} Hz clipped to {} Hz", label, requested, clipped));
        }
        clipped
    }

    fn order(&mut self, label: &str, requested: usize) -> usize {
        let clamped = requested.clamp(butterworth::MIN_ORDER, butterworth::MAX_ORDER);
        if clamped != requested {
            self.warn(format!("{} {} clamped to {}", label, requested, clamped));
        }
        clamped
    }

    /// A positive finite value is a request, anything else is no request
    fn requested(&mut self, label: &str, value: f64) -> bool {
        if value.is_nan() || value.is_infinite() {
            self.warn(format!("{} of {} ignored", label, value));
            return false;
        }
        value > 0.0
    }

    fn baseline(&mut self, params: &FilterParams, config: &mut FilterConfiguration) {
        if params.baseline && params.causality == Causality::Causal {
            self.warn("Baseline correction needs non-causal filtering, dropped".to_string());
            return;
        }
        config.baseline = params.baseline;
    }

    fn butterworth(&mut self, params: &FilterParams, config: &mut FilterConfiguration) {
        let bw = &params.butterworth;

        if self.requested("High-pass cutoff", bw.highpass_hz) {
            config.butterworth_high_hz = self.clip("High-pass cutoff", bw.highpass_hz);
            config.order_high = self.order("High-pass order", bw.highpass_order);
        }

        if self.requested("Low-pass cutoff", bw.lowpass_hz) {
            config.butterworth_low_hz = self.clip("Low-pass cutoff", bw.lowpass_hz);
            config.order_low = self.order("Low-pass order", bw.lowpass_order);
        }

        if config.butterworth_high_hz > 0.0
            && config.butterworth_low_hz > 0.0
            && config.butterworth_high_hz >= config.butterworth_low_hz
        {
            self.warn(format!(
                "High-pass cutoff {} Hz is not below low-pass cutoff {} Hz, low-pass dropped",
                config.butterworth_high_hz, config.butterworth_low_hz
            ));
            config.butterworth_low_hz = 0.0;
            config.order_low = butterworth::DEFAULT_ORDER;
        }
    }

    fn notches(&mut self, params: &FilterParams, config: &mut FilterConfiguration) {
        if !params.notch.enabled {
            return;
        }

        let mut fundamentals: Vec<f64> = Vec::new();
        for &requested in &params.notch.frequencies_hz {
            if !self.requested("Notch frequency", requested) {
                continue;
            }
            let clipped = self.clip("Notch frequency", requested);
            if fundamentals
                .iter()
                .any(|existing| (existing - clipped).abs() < notch::DUPLICATE_TOLERANCE_HZ)
            {
                continue;
            }
            fundamentals.push(clipped);
        }

        if fundamentals.len() > notch::MAX_NOTCHES {
            self.warn(format!(
                "{} notch frequencies requested, only the first {} are kept",
                fundamentals.len(),
                notch::MAX_NOTCHES
            ));
            fundamentals.truncate(notch::MAX_NOTCHES);
        }

        if fundamentals.is_empty() {
            self.warn("Notch filter enabled without any frequency, disabled".to_string());
            return;
        }

        config.notches_enabled = true;
        config.notch_frequencies = fundamentals;
        config.notch_auto_harmonics = params.notch.auto_harmonics;
    }

    fn spatial(&mut self, params: &FilterParams, config: &mut FilterConfiguration) -> Option<SpatialFilter> {
        if !params.spatial.enabled {
            return None;
        }

        let Some(path) = params.spatial.coordinates_file.as_ref() else {
            self.warn("Spatial filter needs an electrode coordinates file, disabled".to_string());
            return None;
        };

        match SpatialFilter::from_file(path, params.spatial.kind) {
            Ok(filter) => {
                config.spatial_enabled = true;
                config.spatial_filter_kind = params.spatial.kind;
                config.coordinates_file = Some(path.clone());
                Some(filter)
            }
            Err(e) => {
                self.warn(format!("Spatial filter disabled: {}", e));
                config.spatial_filter_kind = SpatialFilterKind::default();
                None
            }
        }
    }

    fn reference(&mut self, params: &FilterParams, config: &mut FilterConfiguration) {
        config.reference = params.reference.mode;
        if params.reference.mode == ReferenceMode::Channels {
            let mut channels = params.reference.channels.clone();
            channels.sort_unstable();
            channels.dedup();
            config.reference_channels = channels;
        }
    }

    fn envelope(&mut self, params: &FilterParams, config: &mut FilterConfiguration) {
        if !params.envelope.enabled {
            return;
        }

        let requested = params.envelope.width_ms;
        config.envelope_enabled = true;
        config.envelope_width_ms = if !requested.is_finite() || requested <= 0.0 {
            self.warn(format!(
                "Envelope width {} ms is invalid, using {} ms",
                requested,
                envelope::DEFAULT_WIDTH_MS
            ));
            envelope::DEFAULT_WIDTH_MS
        } else if requested < envelope::MIN_WIDTH_MS {
            self.warn(format!("Envelope width {} ms raised to {} ms", requested, envelope::MIN_WIDTH_MS));
            envelope::MIN_WIDTH_MS
        } else {
            requested
        };
    }

    fn thresholds(&mut self, params: &FilterParams, config: &mut FilterConfiguration) {
        let threshold = &params.threshold;

        if threshold.above_enabled {
            if threshold.above_value.is_finite() {
                config.threshold_above_enabled = true;
                config.threshold_above_value = threshold.above_value;
            } else {
                self.warn(format!("Threshold above {} ignored", threshold.above_value));
            }
        }

        if threshold.below_enabled {
            if threshold.below_value.is_finite() {
                config.threshold_below_enabled = true;
                config.threshold_below_value = threshold.below_value;
            } else {
                self.warn(format!("Threshold below {} ignored", threshold.below_value));
            }
        }
    }

    fn chain(&mut self, config: &FilterConfiguration, spatial: Option<SpatialFilter>) -> Vec<FilterStep> {
        let mut chain = Vec::new();
        let sampling_frequency_hz = config.sampling_frequency_hz;

        // Stage 1: by channel, baseline strictly before any high-pass
        if config.baseline {
            chain.push(FilterStep::channel(
                Stage::PreReferenceTemporal,
                FilterPrecedence::TEMPORAL,
                BaselineFilter::new(),
            ));
        }

        let butterworth = if config.is_bandpass_active() {
            Some((
                ButterworthKind::BandPass {
                    highpass_hz: config.butterworth_high_hz,
                    lowpass_hz: config.butterworth_low_hz,
                },
                config.bandpass_order(),
            ))
        } else if config.is_highpass_active() {
            Some((ButterworthKind::HighPass { cutoff_hz: config.butterworth_high_hz }, config.order_high))
        } else if config.is_lowpass_active() {
            Some((ButterworthKind::LowPass { cutoff_hz: config.butterworth_low_hz }, config.order_low))
        } else {
            None
        };

        if let Some((kind, order)) = butterworth {
            match ButterworthFilter::configure(kind, order, config.causality, sampling_frequency_hz) {
                Ok(filter) => chain.push(FilterStep::channel(
                    Stage::PreReferenceTemporal,
                    FilterPrecedence::TEMPORAL,
                    filter,
                )),
                Err(e) => self.warn(format!("Butterworth filter skipped: {}", e)),
            }
        }

        let plan = config.notch_plan();
        if !plan.is_empty() {
            match NotchBank::configure(&plan, config.causality, sampling_frequency_hz) {
                Ok(bank) => chain.push(FilterStep::channel(
                    Stage::PreReferenceTemporal,
                    FilterPrecedence::TEMPORAL,
                    bank,
                )),
                Err(e) => self.warn(format!("Notch filter skipped: {}", e)),
            }
        }

        // Stage 2: by time sample, reference last
        if let Some(spatial) = spatial {
            chain.push(FilterStep::column(
                Stage::PreReferenceNonTemporal,
                FilterPrecedence::NON_TEMPORAL,
                spatial,
            ));
        }

        if config.ranking_enabled {
            chain.push(FilterStep::column(
                Stage::PreReferenceNonTemporal,
                FilterPrecedence::NON_TEMPORAL,
                RankingFilter::new(),
            ));
        }

        // Always present: the reference is chosen per call
        chain.push(FilterStep::column(
            Stage::PreReferenceNonTemporal,
            FilterPrecedence::NON_TEMPORAL,
            Rereference::new(),
        ));

        // Stage 3: rectification strictly before the envelope
        if config.rectification_mode != RectificationMode::None {
            chain.push(FilterStep::column(
                Stage::PostReference,
                FilterPrecedence::NON_TEMPORAL,
                Rectifier::new(config.rectification_mode),
            ));
        }

        if config.is_envelope_active() {
            match EnvelopeFilter::configure(config.envelope_width_ms, config.causality, sampling_frequency_hz) {
                Ok(filter) => chain.push(FilterStep::channel(Stage::PostReference, FilterPrecedence::TEMPORAL, filter)),
                Err(e) => self.warn(format!("Envelope skipped: {}", e)),
            }
        }

        if config.threshold_above_enabled || config.threshold_below_enabled {
            let above = config.threshold_above_enabled.then_some(config.threshold_above_value as f32);
            let below = config.threshold_below_enabled.then_some(config.threshold_below_value as f32);
            chain.push(FilterStep::column(
                Stage::PostReference,
                FilterPrecedence::NON_TEMPORAL,
                Thresholder::new(above, below),
            ));
        }

        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::filter_params::FilterParams;

    fn names(resolution: &Resolution) -> Vec<&str> {
        resolution.chain.iter().map(|step| step.name()).collect()
    }

    #[test]
    fn test_lowpass_clipped_to_nyquist() {
        let params = FilterParams::bandpass(0.1, 300.0, 2);
        let resolution = resolve(&params, 500.0, false);

        assert_eq!(resolution.configuration.butterworth_low_hz, 250.0);
        assert_eq!(resolution.configuration.butterworth_high_hz, 0.1);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].contains("250"));
    }

    #[test]
    fn test_silent_resolution_collects_nothing() {
        let params = FilterParams::bandpass(0.1, 300.0, 2);
        assert!(resolve(&params, 500.0, true).warnings.is_empty());
    }

    #[test]
    fn test_no_sampling_frequency_keeps_request() {
        let params = FilterParams::bandpass(1.0, 300.0, 4);
        let resolution = resolve(&params, 0.0, false);

        assert_eq!(resolution.configuration.butterworth_low_hz, 300.0);
        assert!(!resolution.configuration.has_frequency_filter());
        assert!(resolution.warnings.is_empty());
        assert_eq!(names(&resolution), vec!["Re-reference"]);
    }

    #[test]
    fn test_inverted_band_drops_lowpass() {
        let params = FilterParams::bandpass(40.0, 10.0, 2);
        let resolution = resolve(&params, 250.0, false);

        assert_eq!(resolution.configuration.butterworth_high_hz, 40.0);
        assert_eq!(resolution.configuration.butterworth_low_hz, 0.0);
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test]
    fn test_orders_clamped() {
        let mut params = FilterParams::bandpass(1.0, 40.0, 2);
        params.butterworth.highpass_order = 0;
        params.butterworth.lowpass_order = 100;

        let config = resolve(&params, 250.0, true).configuration;
        assert_eq!(config.order_high, butterworth::MIN_ORDER);
        assert_eq!(config.order_low, butterworth::MAX_ORDER);
        assert_eq!(config.bandpass_order(), 2 * butterworth::MAX_ORDER);
    }

    #[test]
    fn test_causal_baseline_dropped() {
        let mut params = FilterParams::default();
        params.baseline = true;
        params.causality = Causality::Causal;

        let resolution = resolve(&params, 250.0, false);
        assert!(!resolution.configuration.baseline);
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test]
    fn test_notch_truncated_and_deduplicated() {
        let mut params = FilterParams::default();
        params.notch.enabled = true;
        params.notch.frequencies_hz = (1..=12).map(|i| i as f64 * 10.0).collect();
        params.notch.frequencies_hz.push(10.0);

        let resolution = resolve(&params, 1000.0, false);
        assert_eq!(resolution.configuration.notch_frequencies.len(), notch::MAX_NOTCHES);
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test]
    fn test_missing_coordinates_disable_spatial_only() {
        let mut params = FilterParams::default();
        params.ranking = true;
        params.spatial.enabled = true;
        params.spatial.kind = SpatialFilterKind::Median;
        params.spatial.coordinates_file = Some("/nonexistent/cap.xyz".into());

        let resolution = resolve(&params, 250.0, false);
        assert!(!resolution.configuration.spatial_enabled);
        assert_eq!(resolution.configuration.spatial_filter_kind, SpatialFilterKind::default());
        assert!(resolution.configuration.ranking_enabled);
        assert_eq!(names(&resolution), vec!["Ranking", "Re-reference"]);
    }

    #[test]
    fn test_full_chain_order() {
        let mut params = FilterParams::bandpass(1.0, 40.0, 2);
        params.baseline = true;
        params.notch.enabled = true;
        params.notch.frequencies_hz = vec![50.0];
        params.ranking = true;
        params.rectification = RectificationMode::Power;
        params.envelope.enabled = true;
        params.threshold.above_enabled = true;
        params.threshold.above_value = 0.5;

        let resolution = resolve(&params, 250.0, true);
        assert_eq!(
            names(&resolution),
            vec![
                "Baseline correction",
                "Butterworth band-pass 1-40 Hz",
                "Notch bank",
                "Ranking",
                "Re-reference",
                "Rectification",
                "Envelope",
                "Thresholding",
            ]
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut params = FilterParams::bandpass(0.01, 400.0, 40);
        params.notch.enabled = true;
        params.notch.frequencies_hz = vec![50.0, 600.0];
        params.notch.auto_harmonics = true;
        params.envelope.enabled = true;
        params.envelope.width_ms = 0.2;

        let first = resolve(&params, 500.0, true).configuration;
        let second = resolve(&params, 500.0, true).configuration;
        assert_eq!(first, second);

        let again = resolve(&FilterParams::from(&first), 500.0, true).configuration;
        assert_eq!(first, again);
    }
}
