// src/processing/filters/iir.rs
//! IIR Butterworth filters as cascades of second-order sections

use super::{Causality, ChannelFilter};
use crate::config::constants::{butterworth, frequency};
use crate::error::{FilterError, FilterResult};
use std::f64::consts::PI;

/// Second-order section, normalized so that `a0 == 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    /// Low-pass pole pair with the given damping, `k` is the prewarped cutoff
    pub fn lowpass(k: f64, damping: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 + damping * k + k2;
        Self {
            b0: k2 / norm,
            b1: 2.0 * k2 / norm,
            b2: k2 / norm,
            a1: 2.0 * (k2 - 1.0) / norm,
            a2: (1.0 - damping * k + k2) / norm,
        }
    }

    /// High-pass pole pair with the given damping
    pub fn highpass(k: f64, damping: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 + damping * k + k2;
        Self {
            b0: 1.0 / norm,
            b1: -2.0 / norm,
            b2: 1.0 / norm,
            a1: 2.0 * (k2 - 1.0) / norm,
            a2: (1.0 - damping * k + k2) / norm,
        }
    }

    /// Single real pole, low-pass
    pub fn first_order_lowpass(k: f64) -> Self {
        let norm = 1.0 + k;
        Self {
            b0: k / norm,
            b1: k / norm,
            b2: 0.0,
            a1: (k - 1.0) / norm,
            a2: 0.0,
        }
    }

    /// Single real pole, high-pass
    pub fn first_order_highpass(k: f64) -> Self {
        let norm = 1.0 + k;
        Self {
            b0: 1.0 / norm,
            b1: -1.0 / norm,
            b2: 0.0,
            a1: (k - 1.0) / norm,
            a2: 0.0,
        }
    }

    /// Band-stop centered on `center_hz` with quality `q`
    pub fn band_stop(center_hz: f64, q: f64, sampling_frequency_hz: f64) -> Self {
        let omega = 2.0 * PI * center_hz / sampling_frequency_hz;
        let alpha = omega.sin() / (2.0 * q);
        let cos_omega = omega.cos();
        let norm = 1.0 + alpha;

        Self {
            b0: 1.0 / norm,
            b1: -2.0 * cos_omega / norm,
            b2: 1.0 / norm,
            a1: -2.0 * cos_omega / norm,
            a2: (1.0 - alpha) / norm,
        }
    }

    /// Run over the samples front to back, from rest (Direct Form II transposed)
    pub fn process_forward(&self, samples: &mut [f32]) {
        let (mut z1, mut z2) = (0.0f64, 0.0f64);
        for sample in samples.iter_mut() {
            let x = *sample as f64;
            let y = self.b0 * x + z1;
            z1 = self.b1 * x - self.a1 * y + z2;
            z2 = self.b2 * x - self.a2 * y;
            *sample = y as f32;
        }
    }

    /// Run over the samples back to front, from rest
    pub fn process_backward(&self, samples: &mut [f32]) {
        let (mut z1, mut z2) = (0.0f64, 0.0f64);
        for sample in samples.iter_mut().rev() {
            let x = *sample as f64;
            let y = self.b0 * x + z1;
            z1 = self.b1 * x - self.a1 * y + z2;
            z2 = self.b2 * x - self.a2 * y;
            *sample = y as f32;
        }
    }

    /// Magnitude response at `freq_hz`
    pub fn gain_at(&self, freq_hz: f64, sampling_frequency_hz: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sampling_frequency_hz;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// Run a cascade once (causal) or forward then backward (zero phase)
pub fn filter_sections(sections: &[Biquad], causality: Causality, samples: &mut [f32]) {
    for section in sections {
        section.process_forward(samples);
    }

    if causality == Causality::NonCausal {
        for section in sections.iter().rev() {
            section.process_backward(samples);
        }
    }
}

/// Pass band of a Butterworth filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButterworthKind {
    LowPass { cutoff_hz: f64 },
    HighPass { cutoff_hz: f64 },
    /// High-pass edge then low-pass edge
    BandPass { highpass_hz: f64, lowpass_hz: f64 },
}

/// Configured Butterworth filter
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    kind: ButterworthKind,
    order: usize,
    causality: Causality,
    sections: Vec<Biquad>,
    name: String,
}

impl ButterworthFilter {
    /// Design the filter
    ///
    /// A band-pass of order `2k` is a high-pass of order `k` followed by a
    /// low-pass of order `k`, so its order must be even.
    pub fn configure(
        kind: ButterworthKind,
        order: usize,
        causality: Causality,
        sampling_frequency_hz: f64,
    ) -> FilterResult<Self> {
        if !sampling_frequency_hz.is_finite() || sampling_frequency_hz <= 0.0 {
            return Err(FilterError::invalid_parameter(
                "sampling_frequency_hz",
                format!("{} is not a positive frequency", sampling_frequency_hz),
            ));
        }

        let side_order = match kind {
            ButterworthKind::BandPass { .. } => {
                if order % 2 != 0 {
                    return Err(FilterError::invalid_parameter(
                        "order",
                        format!("band-pass order must be even, got {}", order),
                    ));
                }
                order / 2
            }
            _ => order,
        };

        if !(butterworth::MIN_ORDER..=butterworth::MAX_ORDER).contains(&side_order) {
            return Err(FilterError::invalid_parameter(
                "order",
                format!("{} is outside {}..={}", order, butterworth::MIN_ORDER, butterworth::MAX_ORDER),
            ));
        }

        let sections = match kind {
            ButterworthKind::LowPass { cutoff_hz } => {
                let k = prewarp(cutoff_hz, sampling_frequency_hz)?;
                lowpass_sections(side_order, k)
            }
            ButterworthKind::HighPass { cutoff_hz } => {
                let k = prewarp(cutoff_hz, sampling_frequency_hz)?;
                highpass_sections(side_order, k)
            }
            ButterworthKind::BandPass { highpass_hz, lowpass_hz } => {
                if highpass_hz >= lowpass_hz {
                    return Err(FilterError::invalid_parameter(
                        "cutoff_hz",
                        format!("band edges inverted: {} >= {}", highpass_hz, lowpass_hz),
                    ));
                }
                let mut sections = highpass_sections(side_order, prewarp(highpass_hz, sampling_frequency_hz)?);
                sections.extend(lowpass_sections(side_order, prewarp(lowpass_hz, sampling_frequency_hz)?));
                sections
            }
        };

        let name = match kind {
            ButterworthKind::LowPass { cutoff_hz } => format!("Butterworth low-pass {} Hz", cutoff_hz),
            ButterworthKind::HighPass { cutoff_hz } => format!("Butterworth high-pass {} Hz", cutoff_hz),
            ButterworthKind::BandPass { highpass_hz, lowpass_hz } => {
                format!("Butterworth band-pass {}-{} Hz", highpass_hz, lowpass_hz)
            }
        };

        Ok(Self {
            kind,
            order,
            causality,
            sections,
            name,
        })
    }

    pub fn kind(&self) -> ButterworthKind {
        self.kind
    }

    /// Design order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Attenuation order actually achieved, doubled by a zero-phase run
    pub fn effective_order(&self) -> usize {
        self.order * self.causality.passes()
    }

    pub fn causality(&self) -> Causality {
        self.causality
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Magnitude response of one pass at `freq_hz`
    pub fn gain_at(&self, freq_hz: f64, sampling_frequency_hz: f64) -> f64 {
        self.sections
            .iter()
            .map(|section| section.gain_at(freq_hz, sampling_frequency_hz))
            .product()
    }
}

impl ChannelFilter for ButterworthFilter {
    fn apply(&self, samples: &mut [f32]) {
        filter_sections(&self.sections, self.causality, samples);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Bilinear prewarp, cutoff kept strictly below Nyquist
fn prewarp(cutoff_hz: f64, sampling_frequency_hz: f64) -> FilterResult<f64> {
    if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 {
        return Err(FilterError::invalid_parameter(
            "cutoff_hz",
            format!("{} is not a positive frequency", cutoff_hz),
        ));
    }

    let nyquist = sampling_frequency_hz / 2.0;
    let cutoff = cutoff_hz.min(nyquist * frequency::MAX_NORMALIZED_CUTOFF);
    Ok((PI * cutoff / sampling_frequency_hz).tan())
}

fn damping(pair: usize, order: usize) -> f64 {
    2.0 * ((2 * pair - 1) as f64 * PI / (2 * order) as f64).sin()
}

fn lowpass_sections(order: usize, k: f64) -> Vec<Biquad> {
    let mut sections: Vec<Biquad> = (1..=order / 2)
        .map(|pair| Biquad::lowpass(k, damping(pair, order)))
        .collect();
    if order % 2 == 1 {
        sections.push(Biquad::first_order_lowpass(k));
    }
    sections
}

fn highpass_sections(order: usize, k: f64) -> Vec<Biquad> {
    let mut sections: Vec<Biquad> = (1..=order / 2)
        .map(|pair| Biquad::highpass(k, damping(pair, order)))
        .collect();
    if order % 2 == 1 {
        sections.push(Biquad::first_order_highpass(k));
    }
    sections
}
