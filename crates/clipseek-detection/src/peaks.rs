// SPDX-License-Identifier: GPL-3.0-or-later

//! Prominence-based peak picking over a correlation trace.
//!
//! Local maxima and their topographic prominences are computed once per
//! trace; each threshold tried by the adaptive search is then only a filter.

use crate::CorrelationTrace;

/// Result of one peak search at a given prominence threshold.
#[derive(Debug, Clone, PartialEq)]
pub enum PeakSearch {
    /// Sample indices of peaks clearing the threshold, ascending.
    Found(Vec<usize>),
    /// The threshold is unusable for this trace: not finite, or taller than
    /// the trace's whole dynamic range.
    Degenerate,
}

/// Local maxima of a trace together with their prominences.
#[derive(Debug, Clone)]
pub struct PeakProfile {
    indices: Vec<usize>,
    prominences: Vec<f64>,
    dynamic_range: f64,
}

impl PeakProfile {
    pub fn new(trace: &CorrelationTrace) -> Self {
        let scores = trace.scores();
        let indices = local_maxima(scores);
        let prominences = indices.iter().map(|&i| prominence(scores, i)).collect();
        let dynamic_range = match (trace.max_value(), trace.min_value()) {
            (Some(max), Some(min)) => max - min,
            _ => f64::NAN,
        };

        Self {
            indices,
            prominences,
            dynamic_range,
        }
    }

    /// Number of local maxima regardless of prominence.
    pub fn candidates(&self) -> usize {
        self.indices.len()
    }

    /// Peaks whose prominence is at least `min_prominence`.
    pub fn search(&self, min_prominence: f64) -> PeakSearch {
        if !min_prominence.is_finite()
            || !self.dynamic_range.is_finite()
            || min_prominence > self.dynamic_range
        {
            return PeakSearch::Degenerate;
        }

        PeakSearch::Found(
            self.indices
                .iter()
                .zip(&self.prominences)
                .filter(|(_, p)| **p >= min_prominence)
                .map(|(&i, _)| i)
                .collect(),
        )
    }
}

/// Strict local maxima. A flat top counts once, at its middle sample
/// (rounded down); plateaus touching either border are not peaks.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Height of a peak above the higher of its two bases. Each base is the
/// lowest sample between the peak and the nearest taller sample (or border)
/// on that side.
fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    for &v in x[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &x[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}
