// src/processing/spatial.rs
//! Spatial filter smoothing each electrode with its geometric neighbors
//!
//! Electrode positions come from an `.xyz` file: a header line holding the
//! electrode count (optionally followed by the head radius), then one
//! `x y z name` line per electrode, in channel order.

use crate::config::constants::spatial;
use crate::error::{FilterError, FilterResult};
use crate::processing::filters::{ColumnContext, ColumnFilter};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// How an electrode is combined with its neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialFilterKind {
    Mean,
    Median,
    /// Mean after dropping the lowest and highest septile
    #[default]
    InterseptileWeightedMean,
}

impl SpatialFilterKind {
    pub const ALL: [SpatialFilterKind; 3] = [
        SpatialFilterKind::Mean,
        SpatialFilterKind::Median,
        SpatialFilterKind::InterseptileWeightedMean,
    ];

    /// Human readable name, also used in filter descriptors
    pub fn label(self) -> &'static str {
        match self {
            SpatialFilterKind::Mean => "Mean",
            SpatialFilterKind::Median => "Median",
            SpatialFilterKind::InterseptileWeightedMean => "Interseptile Weighted Mean",
        }
    }

    /// Combine an electrode (first value) with its neighbors; `values` is reordered
    pub fn combine(self, values: &mut [f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }

        match self {
            SpatialFilterKind::Mean => mean(values),
            SpatialFilterKind::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 1 {
                    values[mid]
                } else {
                    (values[mid - 1] + values[mid]) / 2.0
                }
            }
            SpatialFilterKind::InterseptileWeightedMean => {
                values.sort_by(|a, b| a.total_cmp(b));
                let septile = values.len() / 7;
                mean(&values[septile..values.len() - septile])
            }
        }
    }
}

fn mean(values: &[f32]) -> f32 {
    (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32
}

/// Electrode position
#[derive(Debug, Clone, PartialEq)]
pub struct Electrode {
    pub name: String,
    pub position: [f64; 3],
}

impl Electrode {
    fn distance(&self, other: &Electrode) -> f64 {
        self.position
            .iter()
            .zip(other.position.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

/// Parse the content of an `.xyz` coordinate file
pub fn parse_coordinates(content: &str) -> Result<Vec<Electrode>, String> {
    let mut lines = content.lines().map(str::trim).filter(|line| !line.is_empty());

    let header = lines.next().ok_or_else(|| "empty file".to_string())?;
    let count: usize = header
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| format!("invalid header '{}'", header))?;
    if count == 0 {
        return Err("no electrodes declared".to_string());
    }

    let mut electrodes = Vec::with_capacity(count);
    for (index, line) in lines.take(count).enumerate() {
        let mut tokens = line.split_whitespace();
        let mut position = [0.0f64; 3];
        for axis in position.iter_mut() {
            *axis = tokens
                .next()
                .and_then(|token| token.parse().ok())
                .ok_or_else(|| format!("invalid coordinates on electrode {}: '{}'", index + 1, line))?;
        }
        let name = tokens.next().map_or_else(|| format!("e{}", index + 1), str::to_string);
        electrodes.push(Electrode { name, position });
    }

    if electrodes.len() < count {
        return Err(format!("expected {} electrodes, found {}", count, electrodes.len()));
    }

    Ok(electrodes)
}

/// Neighbors of each electrode, closest first
///
/// An electrode's neighbors are the others within [`spatial::NEIGHBOR_DISTANCE_FACTOR`]
/// times its nearest-neighbor distance, at most [`spatial::MAX_NEIGHBORS`].
pub fn build_neighbors(electrodes: &[Electrode]) -> Vec<Vec<usize>> {
    electrodes
        .par_iter()
        .enumerate()
        .map(|(index, electrode)| {
            let mut distances: Vec<(usize, f64)> = electrodes
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != index)
                .map(|(other, candidate)| (other, electrode.distance(candidate)))
                .collect();
            distances.sort_by(|a, b| a.1.total_cmp(&b.1));

            let Some(&(_, nearest)) = distances.first() else {
                return Vec::new();
            };
            let limit = nearest * spatial::NEIGHBOR_DISTANCE_FACTOR;

            distances
                .into_iter()
                .take_while(|&(_, distance)| distance <= limit)
                .take(spatial::MAX_NEIGHBORS)
                .map(|(other, _)| other)
                .collect()
        })
        .collect()
}

/// Spatial filter bound to one electrode layout
#[derive(Debug)]
pub struct SpatialFilter {
    kind: SpatialFilterKind,
    coordinates_file: PathBuf,
    electrodes: Vec<Electrode>,
    neighbors: OnceLock<Vec<Vec<usize>>>,
}

impl SpatialFilter {
    /// Load electrode positions; the neighbor table is built later by [`ColumnFilter::prepare`]
    pub fn from_file(path: impl AsRef<Path>, kind: SpatialFilterKind) -> FilterResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FilterError::coordinates(path.display().to_string(), e.to_string()))?;
        let electrodes = parse_coordinates(&content)
            .map_err(|reason| FilterError::coordinates(path.display().to_string(), reason))?;

        debug!(path = %path.display(), electrodes = electrodes.len(), "Electrode coordinates loaded");

        Ok(Self {
            kind,
            coordinates_file: path.to_path_buf(),
            electrodes,
            neighbors: OnceLock::new(),
        })
    }

    pub fn kind(&self) -> SpatialFilterKind {
        self.kind
    }

    pub fn coordinates_file(&self) -> &Path {
        &self.coordinates_file
    }

    pub fn electrodes(&self) -> &[Electrode] {
        &self.electrodes
    }

    pub fn neighbors(&self) -> &[Vec<usize>] {
        self.neighbors.get_or_init(|| build_neighbors(&self.electrodes))
    }
}

impl ColumnFilter for SpatialFilter {
    fn prepare(&self) {
        self.neighbors();
    }

    fn apply(&self, column: &mut [f32], scratch: &mut Vec<f32>, context: &ColumnContext<'_>) {
        let neighbors = self.neighbors();

        scratch.clear();
        scratch.extend_from_slice(column);

        let mut values = [0.0f32; spatial::MAX_NEIGHBORS + 1];
        for (electrode, hood) in neighbors.iter().enumerate().take(column.len()) {
            if hood.is_empty() || context.selection.auxiliary.contains(electrode) {
                continue;
            }

            values[0] = scratch[electrode];
            let mut count = 1;
            for &neighbor in hood.iter().filter(|&&n| n < scratch.len()) {
                values[count] = scratch[neighbor];
                count += 1;
            }

            column[electrode] = self.kind.combine(&mut values[..count]);
        }
    }

    fn name(&self) -> &str {
        "Spatial filter"
    }
}
