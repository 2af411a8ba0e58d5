// src/processing/partition.rs
//! The two data-parallel partitionings of a channel×time array
//!
//! Each worker receives an exclusive view of its partition, so workers never
//! write to the same memory.

use crate::processing::buffer::ChannelSet;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};

/// Run `op` on every channel not in `skip`, one channel per task
///
/// `op` receives the channel index and the channel's full time series.
pub fn for_each_channel<F>(data: &mut Array2<f32>, skip: &ChannelSet, op: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    data.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(channel, mut row)| {
            if skip.contains(channel) {
                return;
            }

            match row.as_slice_mut() {
                Some(samples) => op(channel, samples),
                None => {
                    // Non-contiguous storage: filter a copy and write it back
                    let mut samples = row.to_vec();
                    op(channel, &mut samples);
                    row.iter_mut().zip(samples).for_each(|(dst, src)| *dst = src);
                }
            }
        });
}

/// Run `op` on every time sample, one column per task
///
/// `op` receives the time index, a private copy of the column (one value per
/// channel) that is written back afterwards, and a worker-owned scratch vector.
pub fn for_each_time_sample<F>(data: &mut Array2<f32>, op: F)
where
    F: Fn(usize, &mut [f32], &mut Vec<f32>) + Send + Sync,
{
    let num_channels = data.nrows();

    data.axis_iter_mut(Axis(1))
        .into_par_iter()
        .enumerate()
        .for_each_init(
            || (Vec::with_capacity(num_channels), Vec::with_capacity(num_channels)),
            |(column_copy, scratch), (time, mut column)| {
                column_copy.clear();
                column_copy.extend(column.iter().copied());

                op(time, column_copy.as_mut_slice(), scratch);

                column
                    .iter_mut()
                    .zip(column_copy.iter())
                    .for_each(|(dst, &src)| *dst = src);
            },
        );
}
