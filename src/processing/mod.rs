// src/processing/mod.rs
//! Multichannel filtering: primitives, resolution, margins and orchestration

pub mod buffer;
pub mod configuration;
pub mod descriptor;
pub mod filters;
pub mod margin;
pub mod partition;
pub mod pipeline;
pub mod ranking;
pub mod reference;
pub mod resolver;
pub mod spatial;

pub use buffer::{ChannelSelection, ChannelSet, TimeBuffer};
pub use configuration::FilterConfiguration;
pub use descriptor::{decode, decode_params, encode, DecodedDescriptor};
pub use filters::{Causality, ChannelFilter, ColumnContext, ColumnFilter, RectificationMode};
pub use margin::safe_margin;
pub use pipeline::{FilterPipeline, FilterPrecedence, FilterStep, Partition, Stage, StageFilter};
pub use ranking::RankingFilter;
pub use reference::{ReferenceMode, Rereference};
pub use resolver::{resolve, Resolution};
pub use spatial::{Electrode, SpatialFilter, SpatialFilterKind};
