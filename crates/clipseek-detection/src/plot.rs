// SPDX-License-Identifier: GPL-3.0-or-later

//! SVG rendering of correlation traces for visual inspection.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::CorrelationTrace;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 400.0;
const MARGIN: f64 = 40.0;
/// Min/max buckets drawn at most; each bucket contributes two points.
const MAX_BUCKETS: usize = 1000;

/// Where a trace for `find` is written: `<plot_dir>/offsets_<stem>.svg`.
pub fn plot_path(plot_dir: &Path, find: Option<&Path>) -> PathBuf {
    let stem = find
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "find".to_string());
    plot_dir.join(format!("offsets_{stem}.svg"))
}

/// Render the trace next to the other plots. Failures are logged only.
pub(crate) fn render_for(trace: &CorrelationTrace, find: Option<&Path>, plot_dir: &Path) {
    let path = plot_path(plot_dir, find);
    let name = find
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "find".to_string());
    let title = format!("Offsets of {name}");

    match render_trace(trace, &title, &path) {
        Ok(()) => info!(target: "detection", path = %path.display(), "wrote correlation plot"),
        Err(err) => warn!(
            target: "detection",
            path = %path.display(),
            error = %err,
            "failed to write correlation plot"
        ),
    }
}

/// Write `trace` as a time-vs-score polyline SVG.
pub fn render_trace(trace: &CorrelationTrace, title: &str, path: &Path) -> io::Result<()> {
    fs::write(path, svg_document(trace, title))
}

fn svg_document(trace: &CorrelationTrace, title: &str) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-family="sans-serif" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        escape_xml(title)
    );

    let duration = trace.offset_secs(trace.len());
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="12">time (s), 0 to {duration:.2}</text>"#,
        WIDTH / 2.0,
        HEIGHT - 10.0
    );

    let points = polyline_points(trace);
    if !points.is_empty() {
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="steelblue" stroke-width="1" points="{points}"/>"#
        );
    }
    svg.push_str("</svg>\n");
    svg
}

/// Min/max envelope of the trace scaled into the plot area.
fn polyline_points(trace: &CorrelationTrace) -> String {
    let scores = trace.scores();
    let (Some(max), Some(min)) = (trace.max_value(), trace.min_value()) else {
        return String::new();
    };
    let range = if max > min { max - min } else { 1.0 };
    let bucket = scores.len().div_ceil(MAX_BUCKETS).max(1);
    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let x_of = |i: usize| MARGIN + plot_w * i as f64 / scores.len().max(1) as f64;
    let y_of = |v: f64| MARGIN + plot_h * (1.0 - (v - min) / range);

    let mut points = String::new();
    for (n, chunk) in scores.chunks(bucket).enumerate() {
        let lo = chunk.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = chunk.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let x = x_of(n * bucket);
        let _ = write!(points, "{x:.1},{:.1} {x:.1},{:.1} ", y_of(lo), y_of(hi));
    }
    points.truncate(points.trim_end().len());
    points
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
