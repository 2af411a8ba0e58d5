// tests/common/mod.rs
//! Shared proptest strategies

#![allow(dead_code)]

use eeg_filter_core::config::FilterParams;
use eeg_filter_core::processing::filters::{Causality, RectificationMode};
use eeg_filter_core::processing::ReferenceMode;
use proptest::prelude::*;

pub fn sampling_frequency() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 100.0..2000.0f64, Just(250.0), Just(1000.0)]
}

fn causality() -> impl Strategy<Value = Causality> {
    prop_oneof![Just(Causality::Causal), Just(Causality::NonCausal)]
}

fn rectification() -> impl Strategy<Value = RectificationMode> {
    prop_oneof![
        Just(RectificationMode::None),
        Just(RectificationMode::Absolute),
        Just(RectificationMode::Power),
    ]
}

fn reference() -> impl Strategy<Value = ReferenceMode> {
    prop_oneof![
        Just(ReferenceMode::AsRecorded),
        Just(ReferenceMode::Average),
        Just(ReferenceMode::Channels),
    ]
}

fn cutoff(range: std::ops::Range<f64>) -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), range]
}

/// Raw parameter records, including out-of-range and inconsistent requests
pub fn filter_params() -> impl Strategy<Value = FilterParams> {
    let frequencies = (
        prop_oneof![Just(0.1), 0.001..2.0f64],
        causality(),
        any::<bool>(),
        cutoff(0.01..150.0),
        0usize..40,
        cutoff(1.0..1500.0),
        0usize..40,
    );
    let notches = (any::<bool>(), prop::collection::vec(0.5..700.0f64, 0..12), any::<bool>());
    let cross_channel = (
        any::<bool>(),
        reference(),
        prop::collection::vec(0usize..64, 0..5),
        rectification(),
    );
    let post = (
        any::<bool>(),
        0.1..500.0f64,
        any::<bool>(),
        -10.0..10.0f64,
        any::<bool>(),
        -10.0..10.0f64,
    );

    (frequencies, notches, cross_channel, post).prop_map(
        |(
            (floor, causality, baseline, highpass, order_high, lowpass, order_low),
            (notch_enabled, notch_frequencies, auto_harmonics),
            (ranking, reference, reference_channels, rectification),
            (envelope, width, above_enabled, above, below_enabled, below),
        )| {
            let mut params = FilterParams::bandpass(highpass, lowpass, order_high);
            params.frequency_floor_hz = floor;
            params.causality = causality;
            params.baseline = baseline;
            params.butterworth.lowpass_order = order_low;
            params.notch.enabled = notch_enabled;
            params.notch.frequencies_hz = notch_frequencies;
            params.notch.auto_harmonics = auto_harmonics;
            params.ranking = ranking;
            params.reference.mode = reference;
            params.reference.channels = reference_channels;
            params.rectification = rectification;
            params.envelope.enabled = envelope;
            params.envelope.width_ms = width;
            params.threshold.above_enabled = above_enabled;
            params.threshold.above_value = above;
            params.threshold.below_enabled = below_enabled;
            params.threshold.below_value = below;
            params
        },
    )
}
