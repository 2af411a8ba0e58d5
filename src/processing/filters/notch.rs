// src/processing/filters/notch.rs
//! Notch filters for powerline interference and its harmonics

use super::iir::{filter_sections, Biquad, ButterworthFilter, ButterworthKind};
use super::{Causality, ChannelFilter};
use crate::config::constants::notch;
use crate::error::{FilterError, FilterResult};
use tracing::debug;

/// How a single notch target is realized
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotchKind {
    /// Narrow band-stop centered on the target
    BandStop,
    /// The target sits on the Nyquist edge, a low-pass below it is used instead
    EdgeLowPass { cutoff_hz: f64 },
}

/// One harmonic of one fundamental
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotchTarget {
    pub fundamental_hz: f64,
    /// 1 for the fundamental itself
    pub harmonic: usize,
    pub frequency_hz: f64,
    pub kind: NotchKind,
}

/// Ordered list of notch targets derived from the requested fundamentals
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotchPlan {
    targets: Vec<NotchTarget>,
}

impl NotchPlan {
    /// Expand fundamentals into harmonics
    ///
    /// The fundamental is always kept. With `auto_harmonics`, harmonic `h` follows
    /// while `h·f` stays at or below Nyquist and, when a low-pass edge is given,
    /// at or below `edge + 2·f`. A last harmonic whose stop band reaches Nyquist is
    /// replaced by a low-pass one notch width below it.
    pub fn build(
        fundamentals: &[f64],
        auto_harmonics: bool,
        nyquist_hz: f64,
        lowpass_edge_hz: Option<f64>,
    ) -> Self {
        let mut targets: Vec<NotchTarget> = Vec::new();

        for &fundamental in fundamentals {
            if !fundamental.is_finite() || fundamental <= 0.0 {
                continue;
            }

            let harmonics = Self::harmonics_for(fundamental, auto_harmonics, nyquist_hz, lowpass_edge_hz);
            let last = harmonics.len().saturating_sub(1);

            for (index, harmonic) in harmonics.into_iter().enumerate() {
                let frequency_hz = harmonic as f64 * fundamental;
                let at_edge = frequency_hz + notch::NOTCH_WIDTH_HZ / 2.0 >= nyquist_hz;

                let kind = if index == last && at_edge {
                    let cutoff_hz = frequency_hz - notch::NOTCH_WIDTH_HZ;
                    if cutoff_hz <= 0.0 {
                        debug!(frequency_hz, "Notch target too close to Nyquist, skipped");
                        continue;
                    }
                    NotchKind::EdgeLowPass { cutoff_hz }
                } else {
                    NotchKind::BandStop
                };

                let duplicate = targets.iter().any(|existing| match (existing.kind, kind) {
                    (NotchKind::BandStop, NotchKind::BandStop) => {
                        (existing.frequency_hz - frequency_hz).abs() < notch::DUPLICATE_TOLERANCE_HZ
                    }
                    (NotchKind::EdgeLowPass { cutoff_hz: a }, NotchKind::EdgeLowPass { cutoff_hz: b }) => {
                        (a - b).abs() < notch::DUPLICATE_TOLERANCE_HZ
                    }
                    _ => false,
                });

                if !duplicate {
                    targets.push(NotchTarget {
                        fundamental_hz: fundamental,
                        harmonic,
                        frequency_hz,
                        kind,
                    });
                }
            }
        }

        Self { targets }
    }

    /// Harmonic numbers kept for one fundamental, before edge substitution
    pub fn harmonics_for(
        fundamental: f64,
        auto_harmonics: bool,
        nyquist_hz: f64,
        lowpass_edge_hz: Option<f64>,
    ) -> Vec<usize> {
        let mut harmonics = vec![1];
        if !auto_harmonics || fundamental.is_nan() || fundamental <= 0.0 || !nyquist_hz.is_finite() {
            return harmonics;
        }

        for harmonic in 2.. {
            let frequency_hz = harmonic as f64 * fundamental;
            if frequency_hz > nyquist_hz {
                break;
            }
            if let Some(edge) = lowpass_edge_hz {
                if frequency_hz > edge + notch::HARMONIC_GUARD_FUNDAMENTALS * fundamental {
                    break;
                }
            }
            harmonics.push(harmonic);
        }

        harmonics
    }

    pub fn targets(&self) -> &[NotchTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Lowest fundamental present in the plan
    pub fn lowest_fundamental_hz(&self) -> Option<f64> {
        self.targets
            .iter()
            .map(|target| target.fundamental_hz)
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// All notch targets of a configuration run as one cascade
#[derive(Debug, Clone)]
pub struct NotchBank {
    plan: NotchPlan,
    causality: Causality,
    sections: Vec<Biquad>,
}

impl NotchBank {
    /// Build one section per band-stop, a [`notch::NOTCH_ORDER`] low-pass per edge target
    pub fn configure(plan: &NotchPlan, causality: Causality, sampling_frequency_hz: f64) -> FilterResult<Self> {
        if !sampling_frequency_hz.is_finite() || sampling_frequency_hz <= 0.0 {
            return Err(FilterError::invalid_parameter(
                "sampling_frequency_hz",
                format!("{} is not a positive frequency", sampling_frequency_hz),
            ));
        }

        let nyquist = sampling_frequency_hz / 2.0;
        let mut sections = Vec::with_capacity(plan.len());

        for target in plan.targets() {
            match target.kind {
                NotchKind::BandStop => {
                    if target.frequency_hz <= 0.0 || target.frequency_hz >= nyquist {
                        return Err(FilterError::invalid_parameter(
                            "notch_frequency_hz",
                            format!("{} Hz is outside (0, {}) Hz", target.frequency_hz, nyquist),
                        ));
                    }
                    let q = target.frequency_hz / notch::NOTCH_WIDTH_HZ;
                    sections.push(Biquad::band_stop(target.frequency_hz, q, sampling_frequency_hz));
                }
                NotchKind::EdgeLowPass { cutoff_hz } => {
                    let lowpass = ButterworthFilter::configure(
                        ButterworthKind::LowPass { cutoff_hz },
                        notch::NOTCH_ORDER,
                        causality,
                        sampling_frequency_hz,
                    )?;
                    sections.extend_from_slice(lowpass.sections());
                }
            }
        }

        Ok(Self {
            plan: plan.clone(),
            causality,
            sections,
        })
    }

    pub fn plan(&self) -> &NotchPlan {
        &self.plan
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Magnitude response of one pass at `freq_hz`
    pub fn gain_at(&self, freq_hz: f64, sampling_frequency_hz: f64) -> f64 {
        self.sections
            .iter()
            .map(|section| section.gain_at(freq_hz, sampling_frequency_hz))
            .product()
    }
}

impl ChannelFilter for NotchBank {
    fn apply(&self, samples: &mut [f32]) {
        filter_sections(&self.sections, self.causality, samples);
    }

    fn name(&self) -> &str {
        "Notch bank"
    }
}
