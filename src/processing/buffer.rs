// src/processing/buffer.rs
//! Channel×time sample storage and per-call channel roles

use crate::error::{FilterError, FilterResult};
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

/// Growable bitset over channel indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSet {
    words: Vec<u64>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding `0..count`
    pub fn all(count: usize) -> Self {
        (0..count).collect()
    }

    pub fn insert(&mut self, channel: usize) {
        let word = channel / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (channel % 64);
    }

    pub fn remove(&mut self, channel: usize) {
        if let Some(word) = self.words.get_mut(channel / 64) {
            *word &= !(1u64 << (channel % 64));
        }
    }

    pub fn contains(&self, channel: usize) -> bool {
        self.words
            .get(channel / 64)
            .map_or(false, |word| word & (1u64 << (channel % 64)) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Members in increasing order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            (0..64).filter(move |bit| word & (1u64 << bit) != 0).map(move |bit| index * 64 + bit)
        })
    }
}

impl FromIterator<usize> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = ChannelSet::new();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

impl Extend<usize> for ChannelSet {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        for channel in iter {
            self.insert(channel);
        }
    }
}

/// Channel roles supplied with every `apply` call
///
/// Auxiliary channels are left untouched by temporal filters, rectification,
/// envelope and thresholding. Spatial filtering and re-referencing use the
/// valid set, so an auxiliary channel takes part in them unless the caller
/// also leaves it out of `valid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSelection {
    pub auxiliary: ChannelSet,
    /// Channels that are re-referenced and averaged into an average reference
    pub valid: ChannelSet,
    /// Explicit reference channels
    pub reference: ChannelSet,
}

impl ChannelSelection {
    /// Every channel valid, no auxiliary, no explicit reference
    pub fn all_valid(num_channels: usize) -> Self {
        Self {
            auxiliary: ChannelSet::new(),
            valid: ChannelSet::all(num_channels),
            reference: ChannelSet::new(),
        }
    }

    pub fn with_auxiliary(mut self, channels: impl IntoIterator<Item = usize>) -> Self {
        self.auxiliary.extend(channels);
        self
    }

    pub fn with_reference(mut self, channels: impl IntoIterator<Item = usize>) -> Self {
        self.reference.extend(channels);
        self
    }

    /// Drop channels from the valid set
    pub fn without_valid(mut self, channels: impl IntoIterator<Item = usize>) -> Self {
        for channel in channels {
            self.valid.remove(channel);
        }
        self
    }
}

/// Channel-major sample block with a margin on both sides of the requested window
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBuffer {
    data: Array2<f32>,
    margin_offset: usize,
    window_len: usize,
}

impl TimeBuffer {
    /// Zeroed buffer of `window_len + 2·margin` samples per channel
    pub fn with_margin(num_channels: usize, window_len: usize, margin: usize) -> Self {
        Self {
            data: Array2::zeros((num_channels, window_len + 2 * margin)),
            margin_offset: margin,
            window_len,
        }
    }

    /// Wrap existing samples, the window starting at `margin_offset`
    pub fn from_array(data: Array2<f32>, margin_offset: usize, window_len: usize) -> FilterResult<Self> {
        let required = margin_offset + window_len;
        if required > data.ncols() {
            return Err(FilterError::BufferShape {
                reason: "window extends past the end of the buffer".to_string(),
                expected: required,
                actual: data.ncols(),
            });
        }

        Ok(Self {
            data,
            margin_offset,
            window_len,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }

    /// Total samples per channel, margins included
    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn margin_offset(&self) -> usize {
        self.margin_offset
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Sample `time` of the window, `None` when out of bounds
    pub fn get(&self, channel: usize, time: usize) -> Option<f32> {
        if time >= self.window_len {
            return None;
        }
        self.data.get((channel, self.margin_offset + time)).copied()
    }

    /// Write sample `time` of the window
    pub fn set(&mut self, channel: usize, time: usize, value: f32) -> FilterResult<()> {
        if time >= self.window_len {
            return Err(FilterError::BufferShape {
                reason: "time index outside the window".to_string(),
                expected: self.window_len,
                actual: time,
            });
        }

        let num_channels = self.num_channels();
        match self.data.get_mut((channel, self.margin_offset + time)) {
            Some(sample) => {
                *sample = value;
                Ok(())
            }
            None => Err(FilterError::BufferShape {
                reason: "channel index outside the buffer".to_string(),
                expected: num_channels,
                actual: channel,
            }),
        }
    }

    /// Full span of one channel, margins included
    pub fn channel(&self, channel: usize) -> Option<ArrayView1<'_, f32>> {
        (channel < self.num_channels()).then(|| self.data.row(channel))
    }

    pub fn channel_mut(&mut self, channel: usize) -> Option<ArrayViewMut1<'_, f32>> {
        if channel < self.num_channels() {
            Some(self.data.row_mut(channel))
        } else {
            None
        }
    }

    /// Requested window, margins excluded
    pub fn window(&self) -> ArrayView2<'_, f32> {
        self.data
            .slice(s![.., self.margin_offset..self.margin_offset + self.window_len])
    }

    pub fn window_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        let (start, end) = (self.margin_offset, self.margin_offset + self.window_len);
        self.data.slice_mut(s![.., start..end])
    }

    /// Whole storage, margins included
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f32> {
        &mut self.data
    }

    /// Drop the margins
    pub fn into_window(self) -> Array2<f32> {
        let (start, end) = (self.margin_offset, self.margin_offset + self.window_len);
        self.data.slice_move(s![.., start..end])
    }
}
