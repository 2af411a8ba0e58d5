// src/processing/descriptor.rs
//! Human readable filter descriptor strings
//!
//! A descriptor is a comma separated list of tokens, e.g.
//! `Non-Causal, Band Pass 1 - 40 Hz Order 2/2, Notch 50 Hz with Harmonics, Sampling Frequency 250 Hz`.
//! Encoding a configuration and decoding the result (with the same sampling
//! frequency and coordinate file) gives the same configuration back.
//!
//! Decoding is lenient: unknown or malformed tokens are skipped.

use crate::config::constants::frequency;
use crate::config::filter_params::FilterParams;
use crate::processing::configuration::FilterConfiguration;
use crate::processing::filters::{Causality, RectificationMode};
use crate::processing::reference::ReferenceMode;
use crate::processing::resolver::resolve;
use crate::processing::spatial::SpatialFilterKind;
use std::path::Path;
use tracing::debug;

const SEPARATOR: &str = ", ";

/// Parameters recovered from a descriptor, before resolution
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDescriptor {
    pub params: FilterParams,
    /// Present when the descriptor carried a `Sampling Frequency` token
    pub sampling_frequency_hz: Option<f64>,
}

/// Descriptor of a configuration
pub fn encode(config: &FilterConfiguration) -> String {
    let mut tokens: Vec<String> = Vec::new();

    tokens.push(
        match config.causality {
            Causality::Causal => "Causal",
            Causality::NonCausal => "Non-Causal",
        }
        .to_string(),
    );

    if config.baseline {
        tokens.push("Baseline Correction".to_string());
    }

    let highpass = config.butterworth_high_hz > 0.0;
    let lowpass = config.butterworth_low_hz > 0.0;
    match (highpass, lowpass) {
        (true, true) => tokens.push(format!(
            "Band Pass {} - {} Hz Order {}/{}",
            config.butterworth_high_hz, config.butterworth_low_hz, config.order_high, config.order_low
        )),
        (true, false) => tokens.push(format!(
            "High Pass {} Hz Order {}",
            config.butterworth_high_hz, config.order_high
        )),
        (false, true) => tokens.push(format!(
            "Low Pass {} Hz Order {}",
            config.butterworth_low_hz, config.order_low
        )),
        (false, false) => {}
    }

    if config.notches_enabled && !config.notch_frequencies.is_empty() {
        let frequencies: Vec<String> = config.notch_frequencies.iter().map(f64::to_string).collect();
        let mut token = format!("Notch {} Hz", frequencies.join(" "));
        if config.notch_auto_harmonics {
            token.push_str(" with Harmonics");
        }
        tokens.push(token);
    }

    if config.spatial_enabled {
        tokens.push(format!("Spatial Filter {}", config.spatial_filter_kind.label()));
    }

    if config.ranking_enabled {
        tokens.push("Ranking".to_string());
    }

    match config.reference {
        ReferenceMode::AsRecorded => {}
        ReferenceMode::Average => tokens.push("Reference Average".to_string()),
        ReferenceMode::Channels => {
            let mut token = "Reference Channels".to_string();
            for channel in &config.reference_channels {
                token.push_str(&format!(" {}", channel));
            }
            tokens.push(token);
        }
    }

    match config.rectification_mode {
        RectificationMode::None => {}
        RectificationMode::Absolute => tokens.push("Rectification Absolute".to_string()),
        RectificationMode::Power => tokens.push("Rectification Power".to_string()),
    }

    if config.envelope_enabled {
        tokens.push(format!("Envelope of {} ms", config.envelope_width_ms));
    }

    if config.threshold_above_enabled || config.threshold_below_enabled {
        let mut token = "Thresholding".to_string();
        if config.threshold_above_enabled {
            token.push_str(&format!(" showing Above {}", config.threshold_above_value));
        }
        if config.threshold_below_enabled {
            token.push_str(&format!(" showing Below {}", config.threshold_below_value));
        }
        tokens.push(token);
    }

    if config.has_sampling_frequency() {
        tokens.push(format!("Sampling Frequency {} Hz", config.sampling_frequency_hz));
    }

    if config.frequency_floor_hz != frequency::DEFAULT_MIN_FREQUENCY_HZ {
        tokens.push(format!("Minimum Frequency {} Hz", config.frequency_floor_hz));
    }

    tokens.join(SEPARATOR)
}

/// Decode and resolve silently
///
/// `sampling_frequency_hz` is used when the descriptor carries none.
pub fn decode(text: &str, coordinates_hint: Option<&Path>, sampling_frequency_hz: f64) -> FilterConfiguration {
    let decoded = decode_params(text, coordinates_hint);
    let sampling_frequency_hz = decoded.sampling_frequency_hz.unwrap_or(sampling_frequency_hz);
    resolve(&decoded.params, sampling_frequency_hz, true).configuration
}

/// Raw parameters named by a descriptor
///
/// A spatial filter token only takes effect with a `coordinates_hint`, the
/// descriptor itself does not carry the electrode layout.
pub fn decode_params(text: &str, coordinates_hint: Option<&Path>) -> DecodedDescriptor {
    let mut params = FilterParams::default();
    let mut sampling_frequency_hz = None;
    let mut non_causal_seen = false;

    for token in text.split(SEPARATOR).map(str::trim).filter(|token| !token.is_empty()) {
        let recognized = match token {
            "Non-Causal" => {
                params.causality = Causality::NonCausal;
                non_causal_seen = true;
                true
            }
            "Causal" => {
                params.causality = Causality::Causal;
                non_causal_seen = false;
                true
            }
            "Baseline Correction" => {
                params.baseline = non_causal_seen;
                non_causal_seen
            }
            "Ranking" => {
                params.ranking = true;
                true
            }
            "Reference Average" => {
                params.reference.mode = ReferenceMode::Average;
                true
            }
            "Rectification Absolute" => {
                params.rectification = RectificationMode::Absolute;
                true
            }
            "Rectification Power" => {
                params.rectification = RectificationMode::Power;
                true
            }
            _ => decode_token(token, &mut params, &mut sampling_frequency_hz, coordinates_hint),
        };

        if recognized {
            debug!(token, "Descriptor token decoded");
        } else {
            debug!(token, "Descriptor token skipped");
        }
    }

    DecodedDescriptor {
        params,
        sampling_frequency_hz,
    }
}

/// Tokens carrying values; returns whether the token was understood
fn decode_token(
    token: &str,
    params: &mut FilterParams,
    sampling_frequency_hz: &mut Option<f64>,
    coordinates_hint: Option<&Path>,
) -> bool {
    if let Some(rest) = token.strip_prefix("Band Pass ") {
        let (edges, order) = split_order(rest);
        let Some((highpass, lowpass)) = edges.split_once(" - ") else {
            return false;
        };
        let (Some(highpass), Some(lowpass)) = (parse_f64(highpass), parse_f64(lowpass)) else {
            return false;
        };
        params.butterworth.highpass_hz = highpass;
        params.butterworth.lowpass_hz = lowpass;
        if let Some((order_high, order_low)) = order.and_then(|order| order.split_once('/')) {
            if let (Ok(order_high), Ok(order_low)) = (order_high.trim().parse(), order_low.trim().parse()) {
                params.butterworth.highpass_order = order_high;
                params.butterworth.lowpass_order = order_low;
            }
        }
        return true;
    }

    if let Some(rest) = token.strip_prefix("High Pass ") {
        let (cutoff, order) = split_order(rest);
        let Some(cutoff) = parse_f64(cutoff) else {
            return false;
        };
        params.butterworth.highpass_hz = cutoff;
        if let Some(order) = order.and_then(|order| order.trim().parse().ok()) {
            params.butterworth.highpass_order = order;
        }
        return true;
    }

    if let Some(rest) = token.strip_prefix("Low Pass ") {
        let (cutoff, order) = split_order(rest);
        let Some(cutoff) = parse_f64(cutoff) else {
            return false;
        };
        params.butterworth.lowpass_hz = cutoff;
        if let Some(order) = order.and_then(|order| order.trim().parse().ok()) {
            params.butterworth.lowpass_order = order;
        }
        return true;
    }

    if let Some(rest) = token.strip_prefix("Notch ") {
        let (rest, auto_harmonics) = match rest.strip_suffix(" with Harmonics") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let frequencies: Vec<f64> = rest
            .trim_end_matches("Hz")
            .split_whitespace()
            .filter_map(parse_f64)
            .collect();
        if frequencies.is_empty() {
            return false;
        }
        params.notch.enabled = true;
        params.notch.frequencies_hz = frequencies;
        params.notch.auto_harmonics = auto_harmonics;
        return true;
    }

    if let Some(label) = token.strip_prefix("Spatial Filter ") {
        let Some(kind) = SpatialFilterKind::ALL.into_iter().find(|kind| kind.label() == label.trim()) else {
            return false;
        };
        params.spatial.kind = kind;
        match coordinates_hint {
            Some(path) => {
                params.spatial.enabled = true;
                params.spatial.coordinates_file = Some(path.to_path_buf());
            }
            None => debug!("Spatial filter named without a coordinates file, left disabled"),
        }
        return true;
    }

    if let Some(rest) = token.strip_prefix("Reference Channels") {
        params.reference.mode = ReferenceMode::Channels;
        params.reference.channels = rest.split_whitespace().filter_map(|index| index.parse().ok()).collect();
        return true;
    }

    if let Some(rest) = token.strip_prefix("Envelope of ") {
        let Some(width) = rest.strip_suffix("ms").and_then(parse_f64) else {
            return false;
        };
        params.envelope.enabled = true;
        params.envelope.width_ms = width;
        return true;
    }

    if let Some(rest) = token.strip_prefix("Thresholding") {
        if let Some(value) = value_after(rest, "showing Above ") {
            params.threshold.above_enabled = true;
            params.threshold.above_value = value;
        }
        if let Some(value) = value_after(rest, "showing Below ") {
            params.threshold.below_enabled = true;
            params.threshold.below_value = value;
        }
        return true;
    }

    if let Some(rest) = token.strip_prefix("Sampling Frequency ") {
        let Some(value) = rest.strip_suffix("Hz").and_then(parse_f64) else {
            return false;
        };
        *sampling_frequency_hz = Some(value);
        return true;
    }

    if let Some(rest) = token.strip_prefix("Minimum Frequency ") {
        let Some(value) = rest.strip_suffix("Hz").and_then(parse_f64) else {
            return false;
        };
        params.frequency_floor_hz = value;
        return true;
    }

    false
}

/// Split `"1 - 40 Hz Order 2/2"` into the part before ` Hz` and the order text
fn split_order(text: &str) -> (&str, Option<&str>) {
    let (values, tail) = match text.split_once(" Hz") {
        Some((values, tail)) => (values, tail),
        None => (text, ""),
    };
    (values, tail.trim().strip_prefix("Order "))
}

fn value_after(text: &str, marker: &str) -> Option<f64> {
    let start = text.find(marker)? + marker.len();
    text[start..].split_whitespace().next().and_then(parse_f64)
}

fn parse_f64(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bandpass_config() -> FilterConfiguration {
        FilterConfiguration {
            sampling_frequency_hz: 250.0,
            butterworth_high_hz: 1.0,
            butterworth_low_hz: 40.0,
            order_high: 2,
            order_low: 4,
            notches_enabled: true,
            notch_frequencies: vec![50.0],
            notch_auto_harmonics: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_bandpass() {
        assert_eq!(
            encode(&bandpass_config()),
            "Non-Causal, Band Pass 1 - 40 Hz Order 2/4, Notch 50 Hz with Harmonics, Sampling Frequency 250 Hz"
        );
    }

    #[test]
    fn test_encode_everything() {
        let config = FilterConfiguration {
            baseline: true,
            ranking_enabled: true,
            reference: ReferenceMode::Channels,
            reference_channels: vec![0, 3],
            rectification_mode: RectificationMode::Power,
            envelope_enabled: true,
            envelope_width_ms: 50.0,
            threshold_above_enabled: true,
            threshold_above_value: 1.5,
            threshold_below_enabled: true,
            threshold_below_value: -2.0,
            frequency_floor_hz: 0.01,
            ..bandpass_config()
        };
        assert_eq!(
            encode(&config),
            "Non-Causal, Baseline Correction, Band Pass 1 - 40 Hz Order 2/4, Notch 50 Hz with Harmonics, \
             Ranking, Reference Channels 0 3, Rectification Power, Envelope of 50 ms, \
             Thresholding showing Above 1.5 showing Below -2, Sampling Frequency 250 Hz, Minimum Frequency 0.01 Hz"
        );
    }

    #[test]
    fn test_decode_recovers_configuration() {
        let config = bandpass_config();
        assert_eq!(decode(&encode(&config), None, 0.0), config);
    }

    #[test]
    fn test_decode_uses_caller_sampling_frequency() {
        let config = decode("Causal, Low Pass 30 Hz Order 3", None, 500.0);
        assert_eq!(config.causality, Causality::Causal);
        assert_eq!(config.sampling_frequency_hz, 500.0);
        assert_eq!(config.butterworth_low_hz, 30.0);
        assert_eq!(config.order_low, 3);
        assert!(config.is_lowpass_active());
    }

    #[test]
    fn test_baseline_requires_non_causal() {
        let decoded = decode_params("Baseline Correction, Non-Causal", None);
        assert!(!decoded.params.baseline);

        let decoded = decode_params("Non-Causal, Baseline Correction", None);
        assert!(decoded.params.baseline);
    }

    #[test]
    fn test_spatial_without_hint_is_disabled() {
        let decoded = decode_params("Non-Causal, Spatial Filter Median", None);
        assert!(!decoded.params.spatial.enabled);
        assert_eq!(decoded.params.spatial.kind, SpatialFilterKind::Median);

        let decoded = decode_params("Spatial Filter Median", Some(Path::new("cap.xyz")));
        assert!(decoded.params.spatial.enabled);
        assert_eq!(decoded.params.spatial.coordinates_file.as_deref(), Some(Path::new("cap.xyz")));
    }

    #[test]
    fn test_unknown_and_malformed_tokens_are_skipped() {
        let decoded = decode_params("Non-Causal, Wavelet Denoise, High Pass fast Hz, Ranking", None);
        assert!(decoded.params.ranking);
        assert_eq!(decoded.params.butterworth.highpass_hz, 0.0);
        assert_eq!(decoded.sampling_frequency_hz, None);
    }

    #[test]
    fn test_thresholds_and_reference() {
        let decoded = decode_params(
            "Reference Channels 4 1, Thresholding showing Below -3.5, Sampling Frequency 1000 Hz",
            None,
        );
        assert_eq!(decoded.params.reference.mode, ReferenceMode::Channels);
        assert_eq!(decoded.params.reference.channels, vec![4, 1]);
        assert!(!decoded.params.threshold.above_enabled);
        assert!(decoded.params.threshold.below_enabled);
        assert_eq!(decoded.params.threshold.below_value, -3.5);
        assert_eq!(decoded.sampling_frequency_hz, Some(1000.0));
    }
}
