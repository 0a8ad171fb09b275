// SPDX-License-Identifier: GPL-3.0-or-later

//! Adaptive offset search.
//!
//! The engine correlates a window of the "find" signal against the "within"
//! signal and picks prominent peaks. When a target count is given, the
//! prominence threshold is nudged up or down until the de-duplicated peak
//! count matches or the try budget runs out.

use clipseek_audio::{AudioSignal, Result};
use clipseek_config::DetectionConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::peaks::{PeakProfile, PeakSearch};
use crate::plot;
use crate::{round_offset, CorrelationTrace, PeakSet};

/// Shrink factor when more than [`FAST_SHRINK_SHORTFALL`] peaks are missing.
const SHRINK_FAST: f64 = 0.80;
const SHRINK_SLOW: f64 = 0.95;
const GROW: f64 = 1.01;
/// Shrink factor after a degenerate search.
const DEGENERATE_SHRINK: f64 = 0.8;
const FAST_SHRINK_SHORTFALL: usize = 5;

/// Caller-facing knobs of one offset search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Scales the highest correlation score into the starting prominence
    /// threshold. Larger values yield fewer matches.
    pub multiplier: f64,
    /// Seconds of the find signal used as the correlation probe.
    pub window_secs: u32,
    /// Desired match count. `None` returns every peak above the starting
    /// threshold, `1` returns the single best match, `< 1` returns nothing.
    pub number: Option<i64>,
    /// Upper bound on threshold adjustments.
    pub max_tries: u32,
    /// Render the correlation trace to an SVG file.
    pub plot: bool,
}

impl SearchParams {
    pub fn new(multiplier: f64) -> Self {
        Self {
            multiplier,
            window_secs: 2,
            number: None,
            max_tries: 80,
            plot: false,
        }
    }

    /// Defaults for window and try budget taken from configuration.
    pub fn with_defaults(multiplier: f64, config: &DetectionConfig) -> Self {
        Self {
            window_secs: config.default_window_secs,
            max_tries: config.default_max_tries,
            ..Self::new(multiplier)
        }
    }

    pub fn window_secs(mut self, window_secs: u32) -> Self {
        self.window_secs = window_secs;
        self
    }

    pub fn number(mut self, number: Option<i64>) -> Self {
        self.number = number;
        self
    }

    pub fn max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    pub fn plot(mut self, plot: bool) -> Self {
        self.plot = plot;
        self
    }

    /// True when the target count short-circuits to an empty result.
    pub fn is_invalid_target(&self) -> bool {
        matches!(self.number, Some(n) if n < 1)
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The peak count matched the target.
    Converged,
    /// The try budget ran out; the last peak list is returned as-is.
    Exhausted,
    /// No target count: every peak clearing the starting threshold.
    AllAboveThreshold,
    /// Target of one: the global maximum of the trace.
    BestMatch,
    /// Target below one: nothing searched.
    InvalidTarget,
    /// The probe did not fit inside the signal.
    EmptyTrace,
}

/// Offsets found by one search plus how the search got there.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub offsets: PeakSet,
    /// Threshold adjustments performed.
    pub attempts: u32,
    pub outcome: SearchOutcome,
}

impl Detection {
    fn empty(outcome: SearchOutcome) -> Self {
        Self {
            offsets: PeakSet::empty(),
            attempts: 0,
            outcome,
        }
    }
}

/// Locate every occurrence of `find` inside `within`.
///
/// `find` is resampled to `within`'s rate and cut to `params.window_secs`
/// before correlating. Only resampling can fail; every search outcome,
/// including an empty one, is returned as a [`Detection`].
#[instrument(skip_all, fields(multiplier = params.multiplier, number = ?params.number))]
pub fn detect(
    within: &AudioSignal,
    find: &AudioSignal,
    params: &SearchParams,
    config: &DetectionConfig,
) -> Result<Detection> {
    if params.is_invalid_target() {
        warn!(
            target: "detection",
            number = ?params.number,
            "requested peak count is below one, returning no offsets"
        );
        return Ok(Detection::empty(SearchOutcome::InvalidTarget));
    }

    let find = find.resampled(within.sample_rate())?;
    let probe = find.prefix(params.window_secs);
    let trace = CorrelationTrace::compute(within.samples(), probe, within.sample_rate());
    debug!(
        target: "detection",
        trace_len = trace.len(),
        probe_len = probe.len(),
        sample_rate = within.sample_rate(),
        "computed correlation trace"
    );

    if params.plot {
        plot::render_for(&trace, find.source(), &config.plot_dir);
    }

    Ok(search_trace(&trace, params, config.min_peak_distance_secs))
}

/// Run the search on a precomputed trace.
pub fn search_trace(
    trace: &CorrelationTrace,
    params: &SearchParams,
    min_distance: f64,
) -> Detection {
    if params.is_invalid_target() {
        warn!(target: "detection", number = ?params.number, "requested peak count is below one");
        return Detection::empty(SearchOutcome::InvalidTarget);
    }

    let Some(best) = trace.argmax() else {
        warn!(target: "detection", "probe longer than the signal, nothing to correlate");
        return Detection::empty(SearchOutcome::EmptyTrace);
    };

    match params.number {
        Some(1) => Detection {
            offsets: PeakSet::single(round_offset(trace.offset_secs(best))),
            attempts: 0,
            outcome: SearchOutcome::BestMatch,
        },
        number => adaptive_search(
            trace,
            number.map(|n| n as usize),
            params.multiplier,
            params.max_tries,
            min_distance,
        ),
    }
}

/// Hill-climb the prominence threshold towards `target` peaks.
fn adaptive_search(
    trace: &CorrelationTrace,
    target: Option<usize>,
    multiplier: f64,
    max_tries: u32,
    min_distance: f64,
) -> Detection {
    let profile = PeakProfile::new(trace);
    let mut prominence = trace.max_value().unwrap_or(0.0) * multiplier;
    let mut attempts = 0u32;

    loop {
        let indices = match profile.search(prominence) {
            PeakSearch::Found(indices) => indices,
            PeakSearch::Degenerate => {
                if attempts >= max_tries {
                    warn!(target: "detection", attempts, "max try number reached with a degenerate threshold");
                    return Detection {
                        offsets: PeakSet::empty(),
                        attempts,
                        outcome: SearchOutcome::Exhausted,
                    };
                }
                debug!(target: "detection", attempts, prominence, "degenerate threshold, lowering");
                prominence *= DEGENERATE_SHRINK;
                attempts += 1;
                continue;
            }
        };

        let offsets = PeakSet::from_indices(&indices, trace.sample_rate(), min_distance);

        let Some(target) = target else {
            return Detection {
                offsets,
                attempts,
                outcome: SearchOutcome::AllAboveThreshold,
            };
        };

        if offsets.len() == target {
            info!(target: "detection", number = target, offsets = ?offsets.as_slice(), "found specified number of offsets");
            return Detection {
                offsets,
                attempts,
                outcome: SearchOutcome::Converged,
            };
        }

        if attempts >= max_tries {
            warn!(
                target: "detection",
                attempts,
                wanted = target,
                got = offsets.len(),
                offsets = ?offsets.as_slice(),
                "max try number reached, returning the last offsets"
            );
            return Detection {
                offsets,
                attempts,
                outcome: SearchOutcome::Exhausted,
            };
        }

        debug!(
            target: "detection",
            attempt = attempts,
            wanted = target,
            got = offsets.len(),
            prominence,
            "peak count off target"
        );
        prominence = adjust_prominence(prominence, target, offsets.len());
        attempts += 1;
    }
}

/// Next threshold after finding `found` peaks while wanting `target`.
fn adjust_prominence(prominence: f64, target: usize, found: usize) -> f64 {
    if target > found {
        if target - found > FAST_SHRINK_SHORTFALL {
            prominence * SHRINK_FAST
        } else {
            prominence * SHRINK_SLOW
        }
    } else {
        prominence * GROW
    }
}
