// src/processing/margin.rs
//! Safe margin: how many extra samples to read on each side of a window
//!
//! Filters need time to settle. The margin is the largest settling length of
//! the active frequency filters, so that samples inside the window are
//! unaffected by the buffer edges. Values are empirical upper bounds, not exact
//! impulse response lengths.

use crate::config::constants::{margin, notch};
use crate::processing::configuration::FilterConfiguration;

/// Margin in samples, 0 without a sampling frequency or a frequency filter
pub fn safe_margin(config: &FilterConfiguration) -> usize {
    if !config.has_sampling_frequency() || !config.has_frequency_filter() {
        return 0;
    }

    let sampling_frequency_hz = config.sampling_frequency_hz;
    let mut samples = 0;

    if config.is_highpass_active() {
        samples = samples.max(highpass_margin(
            sampling_frequency_hz,
            config.butterworth_high_hz,
            config.order_high,
        ));
    }

    if config.is_lowpass_active() {
        samples = samples.max(lowpass_margin(
            sampling_frequency_hz,
            config.butterworth_low_hz,
            config.order_low,
        ));
    }

    let plan = config.notch_plan();
    if let Some(lowest_hz) = plan.lowest_fundamental_hz() {
        samples = samples.max(notch_margin(
            sampling_frequency_hz,
            lowest_hz,
            plan.len(),
            config.frequency_floor_hz,
        ));
    }

    if config.is_envelope_active() {
        samples = samples.max(envelope_margin(config.envelope_window_samples()));
    }

    samples.min(margin::MAX_SAFE_MARGIN_SAMPLES)
}

/// Half a period of the cutoff per order, order capped
pub fn highpass_margin(sampling_frequency_hz: f64, cutoff_hz: f64, order: usize) -> usize {
    let order = order.min(margin::HIGHPASS_MAX_ORDER_FACTOR) as f64;
    ceil_samples(0.5 * sampling_frequency_hz / cutoff_hz * order)
}

pub fn lowpass_margin(sampling_frequency_hz: f64, cutoff_hz: f64, order: usize) -> usize {
    ceil_samples(sampling_frequency_hz / cutoff_hz * order as f64).max(margin::LOWPASS_MIN_MARGIN_SAMPLES)
}

/// The lowest notch dominates, its lower band edge bounded by the frequency floor
pub fn notch_margin(sampling_frequency_hz: f64, lowest_hz: f64, filters: usize, floor_hz: f64) -> usize {
    let edge_hz = (lowest_hz - notch::NOTCH_WIDTH_HZ / 2.0).max(floor_hz);
    let filters = filters.clamp(1, margin::NOTCH_MAX_FILTER_FACTOR) as f64;
    ceil_samples(sampling_frequency_hz / edge_hz * notch::NOTCH_ORDER as f64 * filters)
}

pub fn envelope_margin(window_samples: usize) -> usize {
    window_samples / 2
}

fn ceil_samples(samples: f64) -> usize {
    if samples.is_finite() && samples > 0.0 {
        samples.ceil().min(margin::MAX_SAFE_MARGIN_SAMPLES as f64) as usize
    } else {
        0
    }
}
