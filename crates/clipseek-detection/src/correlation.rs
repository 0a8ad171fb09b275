// SPDX-License-Identifier: GPL-3.0-or-later

use realfft::{FftError, RealFftPlanner};
use tracing::warn;

/// Smallest FFT block used for overlap-save.
const MIN_BLOCK: usize = 4096;

/// Cross-correlation scores of a probe slid across a longer signal.
///
/// Only offsets where the probe fits entirely inside the signal are scored
/// ("valid" mode), so `len == signal.len() - probe.len() + 1`. Index `i`
/// corresponds to `i / sample_rate` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationTrace {
    scores: Vec<f64>,
    sample_rate: u32,
}

impl CorrelationTrace {
    /// Wrap precomputed scores.
    pub fn from_scores(scores: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            scores,
            sample_rate,
        }
    }

    /// Correlate `probe` against `signal` through the frequency domain.
    ///
    /// The signal is processed in overlap-save blocks sized from the probe,
    /// so memory stays bounded for hour-long recordings. An empty probe, or
    /// one longer than the signal, yields an empty trace.
    pub fn compute(signal: &[f32], probe: &[f32], sample_rate: u32) -> Self {
        if probe.is_empty() || probe.len() > signal.len() {
            return Self::from_scores(Vec::new(), sample_rate);
        }

        match correlate_valid(signal, probe) {
            Ok(scores) => Self::from_scores(scores, sample_rate),
            Err(err) => {
                warn!(target: "detection", error = %err, "correlation failed");
                Self::from_scores(Vec::new(), sample_rate)
            }
        }
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Index of the highest score; the first one on ties.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.scores.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn max_value(&self) -> Option<f64> {
        self.argmax().map(|i| self.scores[i])
    }

    pub fn min_value(&self) -> Option<f64> {
        self.scores.iter().copied().reduce(f64::min)
    }

    /// Seconds represented by a score index.
    pub fn offset_secs(&self, index: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        index as f64 / self.sample_rate as f64
    }
}

/// FFT length for a signal of `n` samples and a probe of `m`.
fn block_len(n: usize, m: usize) -> usize {
    let whole = (n + m - 1).next_power_of_two().max(2);
    (4 * m).next_power_of_two().max(MIN_BLOCK).min(whole)
}

/// Overlap-save correlation. Each block of `size` signal samples yields
/// `size - m + 1` scores free of circular wrap-around.
fn correlate_valid(signal: &[f32], probe: &[f32]) -> Result<Vec<f64>, FftError> {
    let (n, m) = (signal.len(), probe.len());
    let valid = n - m + 1;
    let size = block_len(n, m);
    let step = size - m + 1;

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut input = forward.make_input_vec();
    let mut probe_spectrum = forward.make_output_vec();
    fill(&mut input, probe);
    forward.process(&mut input, &mut probe_spectrum)?;

    let mut spectrum = forward.make_output_vec();
    let mut output = inverse.make_output_vec();
    let last = spectrum.len() - 1;
    let scale = 1.0 / size as f64;
    let mut scores = Vec::with_capacity(valid);

    for start in (0..valid).step_by(step) {
        fill(&mut input, &signal[start..n.min(start + size)]);
        forward.process(&mut input, &mut spectrum)?;
        for (s, p) in spectrum.iter_mut().zip(&probe_spectrum) {
            *s *= p.conj();
        }
        spectrum[0].im = 0.0;
        spectrum[last].im = 0.0;
        inverse.process(&mut spectrum, &mut output)?;

        let count = step.min(valid - start);
        scores.extend(output[..count].iter().map(|v| v * scale));
    }
    Ok(scores)
}

fn fill(buffer: &mut [f64], samples: &[f32]) {
    let (head, tail) = buffer.split_at_mut(samples.len());
    for (dst, &src) in head.iter_mut().zip(samples) {
        *dst = src as f64;
    }
    tail.fill(0.0);
}
