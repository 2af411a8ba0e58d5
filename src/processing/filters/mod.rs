// src/processing/filters/mod.rs
//! Primitive filters run by the pipeline
//!
//! A primitive is configured once and then applied any number of times. It
//! keeps no state between calls: every `apply` starts from rest over the span
//! it is given, so the same filter can serve every worker of a parallel region.

pub mod baseline;
pub mod envelope;
pub mod iir;
pub mod notch;
pub mod pointwise;

pub use baseline::BaselineFilter;
pub use envelope::EnvelopeFilter;
pub use iir::{Biquad, ButterworthFilter, ButterworthKind};
pub use notch::{NotchBank, NotchKind, NotchPlan, NotchTarget};
pub use pointwise::{RectificationMode, Rectifier, Thresholder};

use crate::processing::buffer::ChannelSelection;
use crate::processing::reference::ReferenceMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of time a filter may look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Causality {
    /// Past samples only, single forward pass
    Causal,
    /// Forward then backward pass, zero phase
    #[default]
    NonCausal,
}

impl Causality {
    /// Number of passes over the data
    pub fn passes(self) -> usize {
        match self {
            Causality::Causal => 1,
            Causality::NonCausal => 2,
        }
    }
}

/// Filter over one channel's contiguous time series
pub trait ChannelFilter: Send + Sync + fmt::Debug {
    /// Filter the samples in place
    fn apply(&self, samples: &mut [f32]);

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Per-call inputs a by-time filter may need besides the column itself
#[derive(Debug, Clone, Copy)]
pub struct ColumnContext<'a> {
    /// Channel roles for this call
    pub selection: &'a ChannelSelection,
    /// Reference requested by the caller for this call
    pub reference: &'a ReferenceMode,
}

/// Filter over all channels at one time instant
pub trait ColumnFilter: Send + Sync + fmt::Debug {
    /// Sequential setup, run before the by-time region is entered
    fn prepare(&self) {}

    /// Whether this call would change anything
    fn is_active(&self, _context: &ColumnContext<'_>) -> bool {
        true
    }

    /// Filter one column in place
    ///
    /// `column` is the worker's private copy of the time sample, one value per
    /// channel. `scratch` is a worker-owned vector the filter may use freely.
    fn apply(&self, column: &mut [f32], scratch: &mut Vec<f32>, context: &ColumnContext<'_>);

    /// Short name used in logs
    fn name(&self) -> &str;
}
