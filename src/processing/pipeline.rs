// src/processing/pipeline.rs
//! Filter orchestration over a multichannel time buffer
//!
//! The resolved chain runs in contiguous regions: consecutive by-channel
//! filters share one parallel pass over the channels, consecutive by-time
//! filters share one parallel pass over the time samples. Regions run in
//! chain order, so each one sees the complete output of the previous one.

use crate::config::filter_params::FilterParams;
use crate::processing::buffer::{ChannelSelection, TimeBuffer};
use crate::processing::configuration::FilterConfiguration;
use crate::processing::descriptor;
use crate::processing::filters::{ChannelFilter, ColumnContext, ColumnFilter};
use crate::processing::margin;
use crate::processing::partition::{for_each_channel, for_each_time_sample};
use crate::processing::reference::ReferenceMode;
use crate::processing::resolver::{resolve, Resolution};
use std::ops::BitOr;
use std::path::Path;
use tracing::{debug_span, trace};

#[cfg(feature = "performance_monitoring")]
use std::time::Instant;
#[cfg(feature = "performance_monitoring")]
use tracing::debug;

/// Which families of filters an `apply` call runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterPrecedence(u8);

impl FilterPrecedence {
    pub const NONE: FilterPrecedence = FilterPrecedence(0);
    /// Filters that look along time (Butterworth, notch, envelope, baseline)
    pub const TEMPORAL: FilterPrecedence = FilterPrecedence(0b01);
    /// Filters that look across channels at one instant
    pub const NON_TEMPORAL: FilterPrecedence = FilterPrecedence(0b10);
    pub const ALL: FilterPrecedence = FilterPrecedence(0b11);

    pub fn contains(self, other: FilterPrecedence) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: FilterPrecedence) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for FilterPrecedence {
    fn default() -> Self {
        FilterPrecedence::ALL
    }
}

impl BitOr for FilterPrecedence {
    type Output = FilterPrecedence;

    fn bitor(self, rhs: FilterPrecedence) -> FilterPrecedence {
        FilterPrecedence(self.0 | rhs.0)
    }
}

/// Position of a filter relative to re-referencing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreReferenceTemporal,
    PreReferenceNonTemporal,
    PostReference,
}

/// How a filter traverses the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    ByChannel,
    ByTime,
}

#[derive(Debug)]
pub enum StageFilter {
    Channel(Box<dyn ChannelFilter>),
    Column(Box<dyn ColumnFilter>),
}

/// One configured filter of the chain
#[derive(Debug)]
pub struct FilterStep {
    pub stage: Stage,
    /// Precedence flag that enables this step
    pub gate: FilterPrecedence,
    pub filter: StageFilter,
}

impl FilterStep {
    pub fn channel(stage: Stage, gate: FilterPrecedence, filter: impl ChannelFilter + 'static) -> Self {
        Self {
            stage,
            gate,
            filter: StageFilter::Channel(Box::new(filter)),
        }
    }

    pub fn column(stage: Stage, gate: FilterPrecedence, filter: impl ColumnFilter + 'static) -> Self {
        Self {
            stage,
            gate,
            filter: StageFilter::Column(Box::new(filter)),
        }
    }

    pub fn name(&self) -> &str {
        match &self.filter {
            StageFilter::Channel(filter) => filter.name(),
            StageFilter::Column(filter) => filter.name(),
        }
    }

    pub fn partition(&self) -> Partition {
        match self.filter {
            StageFilter::Channel(_) => Partition::ByChannel,
            StageFilter::Column(_) => Partition::ByTime,
        }
    }
}

/// Resolved configuration together with its ready-to-run filter chain
///
/// A pipeline is immutable once built. Changing parameters or the sampling
/// frequency means building a new one; `apply` can be called concurrently on
/// distinct buffers.
#[derive(Debug)]
pub struct FilterPipeline {
    /// Parameters as requested, before any clipping
    requested: FilterParams,
    feedback: bool,
    configuration: FilterConfiguration,
    steps: Vec<FilterStep>,
    warnings: Vec<String>,
}

impl FilterPipeline {
    /// Silent resolution of `params`
    pub fn new(params: &FilterParams, sampling_frequency_hz: f64) -> Self {
        Self::resolved(params.clone(), sampling_frequency_hz, false)
    }

    /// Resolution that keeps its warnings for display, see [`FilterPipeline::warnings`]
    pub fn with_feedback(params: &FilterParams, sampling_frequency_hz: f64) -> Self {
        Self::resolved(params.clone(), sampling_frequency_hz, true)
    }

    fn resolved(requested: FilterParams, sampling_frequency_hz: f64, feedback: bool) -> Self {
        let resolution = resolve(&requested, sampling_frequency_hz, !feedback);
        Self {
            requested,
            feedback,
            configuration: resolution.configuration,
            steps: resolution.chain,
            warnings: resolution.warnings,
        }
    }

    /// Wrap an existing resolution
    ///
    /// Its configuration stands in for the request, and later re-resolutions
    /// are silent.
    pub fn from_resolution(resolution: Resolution) -> Self {
        Self {
            requested: FilterParams::from(&resolution.configuration),
            feedback: false,
            configuration: resolution.configuration,
            steps: resolution.chain,
            warnings: resolution.warnings,
        }
    }

    /// Rebuild from a descriptor string
    pub fn from_descriptor(text: &str, coordinates_hint: Option<&Path>, sampling_frequency_hz: f64) -> Self {
        let decoded = descriptor::decode_params(text, coordinates_hint);
        let sampling_frequency_hz = decoded.sampling_frequency_hz.unwrap_or(sampling_frequency_hz);
        Self::new(&decoded.params, sampling_frequency_hz)
    }

    /// Same request, re-resolved at another sampling frequency
    ///
    /// Resolution starts again from the requested parameters, so values
    /// clipped at the previous rate come back when the new rate allows them.
    pub fn with_sampling_frequency(&self, sampling_frequency_hz: f64) -> Self {
        Self::resolved(self.requested.clone(), sampling_frequency_hz, self.feedback)
    }

    /// Parameters this pipeline was requested with
    pub fn requested(&self) -> &FilterParams {
        &self.requested
    }

    pub fn configuration(&self) -> &FilterConfiguration {
        &self.configuration
    }

    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Samples to read on each side of the window, see [`margin::safe_margin`]
    pub fn safe_margin(&self) -> usize {
        margin::safe_margin(&self.configuration)
    }

    pub fn descriptor(&self) -> String {
        descriptor::encode(&self.configuration)
    }

    /// Filter `buffer` in place
    ///
    /// The temporal and post-reference stages skip auxiliary channels.
    /// Re-referencing writes every channel of `selection.valid`, so an
    /// auxiliary channel left in the valid set is shifted by the reference
    /// like any other. Only the steps whose gate
    /// intersects `precedence` run; `reference` replaces the configured
    /// reference for this call. Margin samples are filtered like the rest,
    /// callers read the window through [`TimeBuffer::window`].
    pub fn apply(
        &self,
        buffer: &mut TimeBuffer,
        reference: &ReferenceMode,
        selection: &ChannelSelection,
        precedence: FilterPrecedence,
    ) {
        let span = debug_span!(
            "filter_pipeline.apply",
            channels = buffer.num_channels(),
            samples = buffer.num_samples(),
            precedence = ?precedence
        );
        let _entered = span.enter();

        #[cfg(feature = "performance_monitoring")]
        let started = Instant::now();

        if buffer.num_channels() == 0 || buffer.num_samples() == 0 {
            return;
        }

        let context = ColumnContext { selection, reference };
        let active: Vec<&FilterStep> = self
            .steps
            .iter()
            .filter(|step| precedence.intersects(step.gate))
            .filter(|step| match &step.filter {
                StageFilter::Channel(_) => true,
                StageFilter::Column(filter) => filter.is_active(&context),
            })
            .collect();

        let mut start = 0;
        while start < active.len() {
            let partition = active[start].partition();
            let end = active[start..]
                .iter()
                .position(|step| step.partition() != partition)
                .map_or(active.len(), |offset| start + offset);

            run_region(buffer, &active[start..end], partition, &context);
            start = end;
        }

        #[cfg(feature = "performance_monitoring")]
        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            steps = active.len(),
            "Filter pipeline applied"
        );
    }

    /// [`FilterPipeline::apply`] with the configured reference
    ///
    /// Configured reference channels stand in when `selection` names none.
    pub fn apply_default(&self, buffer: &mut TimeBuffer, selection: &ChannelSelection, precedence: FilterPrecedence) {
        let reference = self.configuration.reference;

        if selection.reference.is_empty() && !self.configuration.reference_channels.is_empty() {
            let selection = selection
                .clone()
                .with_reference(self.configuration.reference_channels.iter().copied());
            self.apply(buffer, &reference, &selection, precedence);
        } else {
            self.apply(buffer, &reference, selection, precedence);
        }
    }
}

fn run_region(buffer: &mut TimeBuffer, region: &[&FilterStep], partition: Partition, context: &ColumnContext<'_>) {
    trace!(
        partition = ?partition,
        filters = ?region.iter().map(|step| step.name()).collect::<Vec<_>>(),
        "Running filter region"
    );

    match partition {
        Partition::ByChannel => {
            let filters: Vec<&dyn ChannelFilter> = region
                .iter()
                .filter_map(|step| match &step.filter {
                    StageFilter::Channel(filter) => Some(&**filter),
                    StageFilter::Column(_) => None,
                })
                .collect();

            for_each_channel(buffer.data_mut(), &context.selection.auxiliary, |_, samples| {
                for filter in &filters {
                    filter.apply(samples);
                }
            });
        }
        Partition::ByTime => {
            let filters: Vec<&dyn ColumnFilter> = region
                .iter()
                .filter_map(|step| match &step.filter {
                    StageFilter::Column(filter) => Some(&**filter),
                    StageFilter::Channel(_) => None,
                })
                .collect();

            for filter in &filters {
                filter.prepare();
            }

            for_each_time_sample(buffer.data_mut(), |_, column, scratch| {
                for filter in &filters {
                    filter.apply(column, scratch, context);
                }
            });
        }
    }
}
