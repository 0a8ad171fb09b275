// SPDX-License-Identifier: GPL-3.0-or-later

//! Offset detection.
//!
//! Given two decoded signals, find the timestamps in the longer one where
//! the shorter one starts. Correlation runs in the frequency domain; peaks
//! are then picked by prominence with an adaptive threshold.

pub mod correlation;
pub mod peak_set;
pub mod peaks;
pub mod plot;
pub mod search;

pub use correlation::CorrelationTrace;
pub use peak_set::{round_offset, PeakSet};
pub use peaks::{PeakProfile, PeakSearch};
pub use plot::{plot_path, render_trace};
pub use search::{detect, search_trace, Detection, SearchOutcome, SearchParams};
