// src/processing/reference.rs
//! Re-referencing of every time sample

use crate::processing::buffer::ChannelSet;
use crate::processing::filters::{ColumnContext, ColumnFilter};
use serde::{Deserialize, Serialize};

/// Reference the data is expressed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// Leave the recording reference in place
    #[default]
    AsRecorded,
    /// Common average of the valid channels
    Average,
    /// Mean of an explicit channel set
    Channels,
}

fn mean_of(column: &[f32], channels: &ChannelSet) -> Option<f64> {
    let (sum, count) = channels
        .iter()
        .take_while(|&channel| channel < column.len())
        .fold((0.0f64, 0usize), |(sum, count), channel| (sum + column[channel] as f64, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Subtracts the reference chosen by the caller from every valid channel
#[derive(Debug, Clone, Copy, Default)]
pub struct Rereference;

impl Rereference {
    pub fn new() -> Self {
        Self
    }

    /// Reference value of one column, `None` when there is nothing to subtract
    pub fn reference_value(column: &[f32], context: &ColumnContext<'_>) -> Option<f64> {
        match context.reference {
            ReferenceMode::AsRecorded => None,
            ReferenceMode::Average => mean_of(column, &context.selection.valid),
            ReferenceMode::Channels => mean_of(column, &context.selection.reference),
        }
    }
}

impl ColumnFilter for Rereference {
    fn is_active(&self, context: &ColumnContext<'_>) -> bool {
        match context.reference {
            ReferenceMode::AsRecorded => false,
            ReferenceMode::Average => !context.selection.valid.is_empty(),
            ReferenceMode::Channels => !context.selection.reference.is_empty(),
        }
    }

    fn apply(&self, column: &mut [f32], _scratch: &mut Vec<f32>, context: &ColumnContext<'_>) {
        let Some(reference) = Self::reference_value(column, context) else {
            return;
        };

        let len = column.len();
        for channel in context.selection.valid.iter().take_while(|&channel| channel < len) {
            column[channel] = (column[channel] as f64 - reference) as f32;
        }
    }

    fn name(&self) -> &str {
        "Re-reference"
    }
}
