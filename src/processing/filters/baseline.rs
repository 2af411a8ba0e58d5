// src/processing/filters/baseline.rs
//! DC removal over the whole span

use super::ChannelFilter;

/// Subtracts the mean of the span from every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineFilter;

impl BaselineFilter {
    pub fn new() -> Self {
        Self
    }
}

impl ChannelFilter for BaselineFilter {
    fn apply(&self, samples: &mut [f32]) {
        if samples.is_empty() {
            return;
        }

        let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / samples.len() as f64;
        for sample in samples.iter_mut() {
            *sample = (*sample as f64 - mean) as f32;
        }
    }

    fn name(&self) -> &str {
        "Baseline correction"
    }
}
