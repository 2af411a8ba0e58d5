// src/processing/filters/envelope.rs
//! Amplitude envelope: sliding maximum of |x| smoothed by a sliding mean

use super::{Causality, ChannelFilter};
use crate::config::constants::envelope;
use crate::error::{FilterError, FilterResult};
use std::collections::VecDeque;

/// Odd window length for a width in milliseconds
pub fn window_samples(width_ms: f64, sampling_frequency_hz: f64) -> usize {
    let raw = (width_ms * sampling_frequency_hz / 1000.0).round();
    let samples = if raw.is_finite() && raw > 0.0 { raw as usize } else { 0 };
    (samples | 1).max(envelope::MIN_WINDOW_SAMPLES)
}

#[derive(Debug, Clone)]
pub struct EnvelopeFilter {
    window: usize,
    causality: Causality,
}

impl EnvelopeFilter {
    pub fn configure(width_ms: f64, causality: Causality, sampling_frequency_hz: f64) -> FilterResult<Self> {
        if !sampling_frequency_hz.is_finite() || sampling_frequency_hz <= 0.0 {
            return Err(FilterError::invalid_parameter(
                "sampling_frequency_hz",
                format!("{} is not a positive frequency", sampling_frequency_hz),
            ));
        }
        if !width_ms.is_finite() || width_ms <= 0.0 {
            return Err(FilterError::invalid_parameter(
                "envelope_width_ms",
                format!("{} is not a positive width", width_ms),
            ));
        }

        Ok(Self {
            window: window_samples(width_ms, sampling_frequency_hz),
            causality,
        })
    }

    /// Window length in samples, always odd
    pub fn window(&self) -> usize {
        self.window
    }

    /// Samples needed on each side for the output to settle
    pub fn half_window(&self) -> usize {
        self.window / 2
    }

    /// Inclusive `[start, end]` of the window producing output `index`
    fn bounds(&self, index: usize, len: usize) -> (usize, usize) {
        match self.causality {
            Causality::Causal => (index.saturating_sub(self.window - 1), index),
            Causality::NonCausal => {
                let half = self.window / 2;
                (index.saturating_sub(half), (index + half).min(len - 1))
            }
        }
    }

    fn sliding_max_abs(&self, samples: &[f32]) -> Vec<f32> {
        let len = samples.len();
        let mut output = vec![0.0f32; len];
        // Indices with decreasing |x|, front is the current maximum
        let mut candidates: VecDeque<usize> = VecDeque::with_capacity(self.window);
        let mut pushed = 0;

        for (index, out) in output.iter_mut().enumerate() {
            let (start, end) = self.bounds(index, len);

            while pushed <= end {
                let magnitude = samples[pushed].abs();
                while candidates.back().map_or(false, |&back| samples[back].abs() <= magnitude) {
                    candidates.pop_back();
                }
                candidates.push_back(pushed);
                pushed += 1;
            }
            while candidates.front().map_or(false, |&front| front < start) {
                candidates.pop_front();
            }

            *out = candidates.front().map_or(0.0, |&front| samples[front].abs());
        }

        output
    }
}

impl ChannelFilter for EnvelopeFilter {
    fn apply(&self, samples: &mut [f32]) {
        let len = samples.len();
        if len == 0 {
            return;
        }

        let peaks = self.sliding_max_abs(samples);

        let mut prefix = Vec::with_capacity(len + 1);
        prefix.push(0.0f64);
        for &peak in &peaks {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + peak as f64);
        }

        for (index, sample) in samples.iter_mut().enumerate() {
            let (start, end) = self.bounds(index, len);
            let sum = prefix[end + 1] - prefix[start];
            *sample = (sum / (end + 1 - start) as f64).max(0.0) as f32;
        }
    }

    fn name(&self) -> &str {
        "Envelope"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_odd_with_minimum() {
        assert_eq!(window_samples(100.0, 250.0), 25);
        assert_eq!(window_samples(100.0, 1000.0), 101);
        assert_eq!(window_samples(1.0, 100.0), envelope::MIN_WINDOW_SAMPLES);
        assert_eq!(window_samples(0.0, 100.0), envelope::MIN_WINDOW_SAMPLES);
    }

    #[test]
    fn test_envelope_of_sine_is_near_amplitude() {
        let sf = 500.0;
        let filter = EnvelopeFilter::configure(100.0, Causality::NonCausal, sf).unwrap();

        let mut samples: Vec<f32> = (0..2000)
            .map(|i| 3.0 * (2.0 * std::f64::consts::PI * 20.0 * i as f64 / sf).sin() as f32)
            .collect();
        filter.apply(&mut samples);

        for &value in &samples[200..1800] {
            assert!(value > 2.8 && value <= 3.0 + 1e-4, "value {}", value);
        }
    }

    #[test]
    fn test_output_is_non_negative() {
        let filter = EnvelopeFilter::configure(20.0, Causality::Causal, 250.0).unwrap();
        let mut samples: Vec<f32> = (0..300).map(|i| if i % 7 == 0 { -5.0 } else { -0.5 }).collect();
        filter.apply(&mut samples);
        assert!(samples.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_causal_window_does_not_look_ahead() {
        let filter = EnvelopeFilter::configure(12.0, Causality::Causal, 250.0).unwrap();
        assert_eq!(filter.window(), 3);

        let mut samples = vec![0.0f32; 10];
        samples[5] = 9.0;
        filter.apply(&mut samples);

        assert_eq!(&samples[..5], &[0.0; 5]);
        assert!(samples[5] > 0.0);
    }

    #[test]
    fn test_invalid_width() {
        assert!(EnvelopeFilter::configure(0.0, Causality::Causal, 250.0).is_err());
        assert!(EnvelopeFilter::configure(10.0, Causality::Causal, 0.0).is_err());
    }
}
