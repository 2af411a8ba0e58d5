// src/processing/filters/pointwise.rs
//! Instantaneous per-sample transforms: rectification and thresholding

use super::{ColumnContext, ColumnFilter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectificationMode {
    #[default]
    None,
    /// |x|
    Absolute,
    /// x²
    Power,
}

impl RectificationMode {
    pub fn rectify(self, value: f32) -> f32 {
        match self {
            RectificationMode::None => value,
            RectificationMode::Absolute => value.abs(),
            RectificationMode::Power => value * value,
        }
    }
}

/// Rectifies every non-auxiliary channel
#[derive(Debug, Clone, Copy)]
pub struct Rectifier {
    mode: RectificationMode,
}

impl Rectifier {
    pub fn new(mode: RectificationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> RectificationMode {
        self.mode
    }
}

impl ColumnFilter for Rectifier {
    fn is_active(&self, _context: &ColumnContext<'_>) -> bool {
        self.mode != RectificationMode::None
    }

    fn apply(&self, column: &mut [f32], _scratch: &mut Vec<f32>, context: &ColumnContext<'_>) {
        for (channel, value) in column.iter_mut().enumerate() {
            if !context.selection.auxiliary.contains(channel) {
                *value = self.mode.rectify(*value);
            }
        }
    }

    fn name(&self) -> &str {
        "Rectification"
    }
}

/// Zeroes samples outside the kept range
///
/// With only `above`, values below it are zeroed. With only `below`, values
/// above it are zeroed. With both, a value survives if it is at or above
/// `above` or at or below `below`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholder {
    above: Option<f32>,
    below: Option<f32>,
}

impl Thresholder {
    pub fn new(above: Option<f32>, below: Option<f32>) -> Self {
        Self { above, below }
    }

    pub fn threshold(&self, value: f32) -> f32 {
        let keep = match (self.above, self.below) {
            (Some(above), Some(below)) => value >= above || value <= below,
            (Some(above), None) => value >= above,
            (None, Some(below)) => value <= below,
            (None, None) => true,
        };
        if keep {
            value
        } else {
            0.0
        }
    }
}

impl ColumnFilter for Thresholder {
    fn is_active(&self, _context: &ColumnContext<'_>) -> bool {
        self.above.is_some() || self.below.is_some()
    }

    fn apply(&self, column: &mut [f32], _scratch: &mut Vec<f32>, context: &ColumnContext<'_>) {
        for (channel, value) in column.iter_mut().enumerate() {
            if !context.selection.auxiliary.contains(channel) {
                *value = self.threshold(*value);
            }
        }
    }

    fn name(&self) -> &str {
        "Thresholding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::buffer::ChannelSelection;
    use crate::processing::reference::ReferenceMode;

    #[test]
    fn test_rectification_modes() {
        assert_eq!(RectificationMode::None.rectify(-2.0), -2.0);
        assert_eq!(RectificationMode::Absolute.rectify(-2.0), 2.0);
        assert_eq!(RectificationMode::Power.rectify(-2.0), 4.0);
    }

    #[test]
    fn test_rectifier_skips_auxiliary() {
        let selection = ChannelSelection::all_valid(3).with_auxiliary([1]);
        let reference = ReferenceMode::AsRecorded;
        let context = ColumnContext { selection: &selection, reference: &reference };

        let mut column = vec![-1.0f32, -2.0, -3.0];
        Rectifier::new(RectificationMode::Absolute).apply(&mut column, &mut Vec::new(), &context);
        assert_eq!(column, vec![1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_threshold_rules() {
        let above = Thresholder::new(Some(1.0), None);
        assert_eq!(above.threshold(0.5), 0.0);
        assert_eq!(above.threshold(1.5), 1.5);

        let below = Thresholder::new(None, Some(-1.0));
        assert_eq!(below.threshold(0.5), 0.0);
        assert_eq!(below.threshold(-1.5), -1.5);

        let both = Thresholder::new(Some(1.0), Some(-1.0));
        assert_eq!(both.threshold(0.0), 0.0);
        assert_eq!(both.threshold(2.0), 2.0);
        assert_eq!(both.threshold(-2.0), -2.0);
    }

    #[test]
    fn test_inactive_thresholder() {
        let selection = ChannelSelection::all_valid(1);
        let reference = ReferenceMode::AsRecorded;
        let context = ColumnContext { selection: &selection, reference: &reference };
        assert!(!Thresholder::new(None, None).is_active(&context));
    }
}
