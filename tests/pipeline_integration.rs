//! End-to-end tests of resolution and orchestration over real buffers

use eeg_filter_core::config::FilterParams;
use eeg_filter_core::processing::filters::{ButterworthFilter, ButterworthKind, Causality, RectificationMode};
use eeg_filter_core::processing::spatial::SpatialFilterKind;
use eeg_filter_core::processing::{
    ChannelSelection, FilterPipeline, FilterPrecedence, ReferenceMode, Stage, TimeBuffer,
};
use ndarray::Array2;
use std::f64::consts::PI;
use std::io::Write;
use tempfile::NamedTempFile;

const SAMPLING_FREQUENCY_HZ: f64 = 250.0;

fn sine_buffer(channels: usize, window: usize, margin: usize) -> TimeBuffer {
    let samples = window + 2 * margin;
    let data = Array2::from_shape_fn((channels, samples), |(c, t)| {
        let time = t as f64 / SAMPLING_FREQUENCY_HZ;
        let tone = (2.0 * PI * 10.0 * time + c as f64).sin();
        let hum = 0.5 * (2.0 * PI * 50.0 * time).sin();
        (tone + hum + 5.0 + c as f64) as f32
    });
    TimeBuffer::from_array(data, margin, window).unwrap()
}

fn full_params() -> FilterParams {
    let mut params = FilterParams::bandpass(1.0, 40.0, 2);
    params.notch.enabled = true;
    params.notch.frequencies_hz = vec![50.0];
    params.notch.auto_harmonics = true;
    params.reference.mode = ReferenceMode::Average;
    params.rectification = RectificationMode::Absolute;
    params.envelope.enabled = true;
    params.envelope.width_ms = 40.0;
    params.threshold.above_enabled = true;
    params.threshold.above_value = 0.2;
    params
}

#[test]
fn test_auxiliary_channel_is_bit_identical() {
    let pipeline = FilterPipeline::new(&full_params(), SAMPLING_FREQUENCY_HZ);
    let margin = pipeline.safe_margin();
    let mut buffer = sine_buffer(6, 500, margin);

    let aux_before = buffer.channel(5).unwrap().to_vec();
    let selection = ChannelSelection::all_valid(6).with_auxiliary([5]).without_valid([5]);
    pipeline.apply_default(&mut buffer, &selection, FilterPrecedence::ALL);

    let aux_after = buffer.channel(5).unwrap().to_vec();
    assert!(aux_before
        .iter()
        .zip(aux_after.iter())
        .all(|(a, b)| a.to_bits() == b.to_bits()));

    // The other channels did change
    assert_ne!(buffer.channel(0).unwrap().to_vec(), sine_buffer(6, 500, margin).channel(0).unwrap().to_vec());
}

#[test]
fn test_baseline_highpass_leaves_auxiliary_alone() {
    let mut params = FilterParams::default();
    params.baseline = true;
    params.butterworth.highpass_hz = 1.0;
    let pipeline = FilterPipeline::new(&params, SAMPLING_FREQUENCY_HZ);

    let mut buffer = sine_buffer(5, 250, pipeline.safe_margin());
    let before = buffer.data().clone();
    let selection = ChannelSelection::all_valid(5).with_auxiliary([3]);
    pipeline.apply_default(&mut buffer, &selection, FilterPrecedence::ALL);

    for channel in 0..5 {
        let unchanged = buffer.data().row(channel) == before.row(channel);
        assert_eq!(unchanged, channel == 3, "channel {}", channel);
    }
}

#[test]
fn test_power_rectification_runs_before_envelope() {
    let mut params = FilterParams::default();
    params.rectification = RectificationMode::Power;
    params.envelope.enabled = true;
    params.envelope.width_ms = 40.0;
    let pipeline = FilterPipeline::new(&params, SAMPLING_FREQUENCY_HZ);

    let names: Vec<&str> = pipeline.steps().iter().map(|step| step.name()).collect();
    let rectification = names.iter().position(|&name| name == "Rectification").unwrap();
    let envelope = names.iter().position(|&name| name == "Envelope").unwrap();
    assert!(rectification < envelope);
    assert!(pipeline.steps()[rectification..]
        .iter()
        .all(|step| step.stage == Stage::PostReference));

    // Zero-mean input so that rectification has negative samples to fold
    let signed = || {
        let data = Array2::from_shape_fn((4, 500), |(c, t)| {
            let time = t as f64 / SAMPLING_FREQUENCY_HZ;
            ((2.0 * PI * 10.0 * time + c as f64).sin() * (1.0 + 0.002 * t as f64)) as f32
        });
        TimeBuffer::from_array(data, 0, 500).unwrap()
    };
    let selection = ChannelSelection::all_valid(4);
    let input = signed();
    assert!(input.data().iter().any(|&v| v < -0.5));

    // Rectification alone squares every sample
    let mut rectified = signed();
    pipeline.apply_default(&mut rectified, &selection, FilterPrecedence::NON_TEMPORAL);
    for (&before, &after) in input.data().iter().zip(rectified.data().iter()) {
        assert_eq!(after, before * before);
    }

    // The envelope then smooths the squared signal
    let mut rectify_then_envelope = rectified.clone();
    pipeline.apply_default(&mut rectify_then_envelope, &selection, FilterPrecedence::TEMPORAL);

    let mut envelope_then_rectify = signed();
    pipeline.apply_default(&mut envelope_then_rectify, &selection, FilterPrecedence::TEMPORAL);
    pipeline.apply_default(&mut envelope_then_rectify, &selection, FilterPrecedence::NON_TEMPORAL);

    let mut full = signed();
    pipeline.apply_default(&mut full, &selection, FilterPrecedence::ALL);

    assert_eq!(full.data(), rectify_then_envelope.data());
    assert_ne!(full.data(), envelope_then_rectify.data());
    assert!(full.data().iter().all(|&v| v >= 0.0));
}

#[test]
fn test_spatial_filter_without_sampling_frequency() {
    let mut layout = NamedTempFile::new().unwrap();
    write!(layout, "4 1.0\n0 0 0 Fz\n1 0 0 Cz\n2 0 0 Pz\n10 0 0 Oz\n").unwrap();

    let mut params = FilterParams::bandpass(1.0, 40.0, 2);
    params.spatial.enabled = true;
    params.spatial.kind = SpatialFilterKind::Mean;
    params.spatial.coordinates_file = Some(layout.path().to_path_buf());

    let pipeline = FilterPipeline::new(&params, 0.0);
    assert_eq!(pipeline.safe_margin(), 0);
    assert!(pipeline.configuration().spatial_enabled);
    assert!(!pipeline.configuration().has_frequency_filter());

    let data = Array2::from_shape_fn((4, 3), |(c, _)| (c * 2) as f32);
    let mut buffer = TimeBuffer::from_array(data, 0, 3).unwrap();
    pipeline.apply_default(&mut buffer, &ChannelSelection::all_valid(4), FilterPrecedence::NON_TEMPORAL);

    // Fz averages with Cz only: (0 + 2) / 2
    assert_eq!(buffer.get(0, 1), Some(1.0));
    // Cz averages with Fz and Pz: (2 + 0 + 4) / 3
    assert_eq!(buffer.get(1, 2), Some(2.0));
}

#[test]
fn test_lowpass_above_nyquist_is_clipped_with_warning() {
    let params = FilterParams::bandpass(0.1, 300.0, 2);
    let pipeline = FilterPipeline::with_feedback(&params, 500.0);

    assert_eq!(pipeline.configuration().butterworth_low_hz, 250.0);
    assert_eq!(pipeline.warnings().len(), 1);
    assert!(pipeline.warnings()[0].contains("300"));

    // Silent construction computes the same configuration without feedback
    let silent = FilterPipeline::new(&params, 500.0);
    assert!(silent.warnings().is_empty());
    assert_eq!(silent.configuration(), pipeline.configuration());
}

#[test]
fn test_bandpass_order_fusion() {
    let mut params = FilterParams::bandpass(1.0, 40.0, 2);
    params.butterworth.lowpass_order = 3;
    let pipeline = FilterPipeline::new(&params, SAMPLING_FREQUENCY_HZ);

    assert_eq!(pipeline.configuration().bandpass_order(), 6);
    assert_eq!(pipeline.steps().iter().filter(|step| step.name().starts_with("Butterworth")).count(), 1);

    let kind = ButterworthKind::BandPass {
        highpass_hz: 1.0,
        lowpass_hz: 40.0,
    };
    let filter = ButterworthFilter::configure(kind, 6, Causality::NonCausal, SAMPLING_FREQUENCY_HZ).unwrap();
    assert_eq!(filter.effective_order(), 12);
}

#[test]
fn test_windowed_bandpass_removes_offset_and_hum() {
    let mut params = FilterParams::bandpass(5.0, 15.0, 2);
    params.notch.enabled = true;
    params.notch.frequencies_hz = vec![50.0];
    let pipeline = FilterPipeline::new(&params, SAMPLING_FREQUENCY_HZ);

    let margin = pipeline.safe_margin();
    assert!(margin >= 50);

    let mut buffer = sine_buffer(1, 500, margin);
    pipeline.apply_default(&mut buffer, &ChannelSelection::all_valid(1), FilterPrecedence::ALL);

    let window: Vec<f64> = buffer.window().iter().map(|&v| v as f64).collect();
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let rms = (window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / window.len() as f64).sqrt();

    assert!(mean.abs() < 0.2, "offset left: {}", mean);
    assert!(rms > 0.4 && rms < 0.75, "unexpected tone level: {}", rms);
}

#[test]
fn test_split_precedence_matches_single_call() {
    let mut params = FilterParams::bandpass(1.0, 40.0, 2);
    params.ranking = true;
    let pipeline = FilterPipeline::new(&params, SAMPLING_FREQUENCY_HZ);
    let selection = ChannelSelection::all_valid(5);

    let mut once = sine_buffer(5, 200, pipeline.safe_margin());
    pipeline.apply(&mut once, &ReferenceMode::Average, &selection, FilterPrecedence::ALL);

    let mut split = sine_buffer(5, 200, pipeline.safe_margin());
    pipeline.apply(&mut split, &ReferenceMode::Average, &selection, FilterPrecedence::TEMPORAL);
    pipeline.apply(&mut split, &ReferenceMode::Average, &selection, FilterPrecedence::NON_TEMPORAL);

    assert_eq!(once.data(), split.data());
}

#[test]
fn test_concurrent_calls_on_distinct_buffers() {
    let pipeline = FilterPipeline::new(&full_params(), SAMPLING_FREQUENCY_HZ);
    let margin = pipeline.safe_margin();
    let selection = ChannelSelection::all_valid(3);

    let mut expected = sine_buffer(3, 300, margin);
    pipeline.apply_default(&mut expected, &selection, FilterPrecedence::ALL);

    let mut a = sine_buffer(3, 300, margin);
    let mut b = sine_buffer(3, 300, margin);
    std::thread::scope(|scope| {
        scope.spawn(|| pipeline.apply_default(&mut a, &selection, FilterPrecedence::ALL));
        scope.spawn(|| pipeline.apply_default(&mut b, &selection, FilterPrecedence::ALL));
    });

    assert_eq!(a.data(), expected.data());
    assert_eq!(b.data(), expected.data());
}

#[test]
fn test_reference_override_per_call() {
    let pipeline = FilterPipeline::new(&FilterParams::default(), SAMPLING_FREQUENCY_HZ);
    let data = Array2::from_shape_fn((3, 2), |(c, _)| c as f32);

    let mut as_recorded = TimeBuffer::from_array(data.clone(), 0, 2).unwrap();
    pipeline.apply_default(&mut as_recorded, &ChannelSelection::all_valid(3), FilterPrecedence::ALL);
    assert_eq!(as_recorded.data(), &data);

    let mut averaged = TimeBuffer::from_array(data, 0, 2).unwrap();
    pipeline.apply(
        &mut averaged,
        &ReferenceMode::Average,
        &ChannelSelection::all_valid(3),
        FilterPrecedence::ALL,
    );
    assert_eq!(averaged.get(0, 0), Some(-1.0));
    assert_eq!(averaged.get(2, 1), Some(1.0));
}

#[test]
fn test_auxiliary_channel_in_valid_set_is_rereferenced() {
    let pipeline = FilterPipeline::new(&FilterParams::bandpass(1.0, 40.0, 2), SAMPLING_FREQUENCY_HZ);
    let data = Array2::from_shape_fn((3, 2), |(c, _)| c as f32);
    let mut buffer = TimeBuffer::from_array(data, 0, 2).unwrap();
    let selection = ChannelSelection::all_valid(3).with_auxiliary([2]);

    pipeline.apply(&mut buffer, &ReferenceMode::Average, &selection, FilterPrecedence::NON_TEMPORAL);

    // Mean of channels 0, 1 and 2 is 1
    assert_eq!(buffer.get(2, 0), Some(1.0));
    assert_eq!(buffer.get(0, 1), Some(-1.0));
}
