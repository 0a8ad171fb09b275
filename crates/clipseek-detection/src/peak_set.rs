// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

/// Round seconds to two decimals.
pub fn round_offset(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Ascending match offsets in seconds, no two closer than the minimum
/// neighbour distance they were built with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeakSet(Vec<f64>);

impl PeakSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Sort `offsets` and keep only those at least `min_distance` seconds
    /// after the previously kept one; each cluster keeps its earliest offset.
    pub fn from_offsets(mut offsets: Vec<f64>, min_distance: f64) -> Self {
        offsets.sort_by(f64::total_cmp);

        let mut kept: Vec<f64> = Vec::with_capacity(offsets.len());
        for offset in offsets {
            match kept.last() {
                Some(&last) if offset - last < min_distance => {}
                _ => kept.push(offset),
            }
        }
        Self(kept)
    }

    /// Convert trace indices to rounded seconds, then de-duplicate.
    pub fn from_indices(indices: &[usize], sample_rate: u32, min_distance: f64) -> Self {
        let rate = sample_rate.max(1) as f64;
        let offsets = indices
            .iter()
            .map(|&i| round_offset(i as f64 / rate))
            .collect();
        Self::from_offsets(offsets, min_distance)
    }

    pub fn single(offset: f64) -> Self {
        Self(vec![offset])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
