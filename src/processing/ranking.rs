// src/processing/ranking.rs
//! Per-sample ranking across channels

use crate::processing::filters::{ColumnContext, ColumnFilter};

/// Replaces each non-auxiliary channel by its normalized rank in `[0, 1]`
///
/// Ties share the average of their ranks. A lone channel gets 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingFilter;

impl RankingFilter {
    pub fn new() -> Self {
        Self
    }
}

impl ColumnFilter for RankingFilter {
    fn apply(&self, column: &mut [f32], scratch: &mut Vec<f32>, context: &ColumnContext<'_>) {
        let auxiliary = &context.selection.auxiliary;

        scratch.clear();
        scratch.extend(
            column
                .iter()
                .enumerate()
                .filter(|(channel, _)| !auxiliary.contains(*channel))
                .map(|(_, &value)| value),
        );
        scratch.sort_by(|a, b| a.total_cmp(b));

        let count = scratch.len();
        if count == 0 {
            return;
        }

        for (channel, value) in column.iter_mut().enumerate() {
            if auxiliary.contains(channel) {
                continue;
            }
            if count == 1 {
                *value = 0.5;
                continue;
            }

            let below = scratch.partition_point(|v| v.total_cmp(value).is_lt());
            let through = scratch.partition_point(|v| v.total_cmp(value).is_le());
            let rank = (below + through - 1) as f64 / 2.0;
            *value = (rank / (count - 1) as f64) as f32;
        }
    }

    fn name(&self) -> &str {
        "Ranking"
    }
}
