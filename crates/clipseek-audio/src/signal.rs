// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::{AudioError, Result};

const RESAMPLE_CHUNK: usize = 1024;

/// Mono audio samples at a fixed sample rate. Immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
    source: Option<PathBuf>,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            source: None,
        }
    }

    /// Remember which file the samples were decoded from.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// The first `seconds` of the signal, or all of it when shorter.
    pub fn prefix(&self, seconds: u32) -> &[f32] {
        let wanted = seconds as usize * self.sample_rate as usize;
        &self.samples[..wanted.min(self.samples.len())]
    }

    /// Convert to `target_rate`. Returns a plain copy when the rates already match.
    pub fn resampled(&self, target_rate: u32) -> Result<AudioSignal> {
        if target_rate == 0 || self.sample_rate == 0 {
            return Err(AudioError::Resample(format!(
                "cannot resample between {} Hz and {} Hz",
                self.sample_rate, target_rate
            )));
        }

        if target_rate == self.sample_rate || self.samples.is_empty() {
            return Ok(AudioSignal {
                samples: self.samples.clone(),
                sample_rate: target_rate,
                source: self.source.clone(),
            });
        }

        debug!(
            target: "audio",
            from = self.sample_rate,
            to = target_rate,
            samples = self.samples.len(),
            "resampling signal"
        );

        let samples = resample(&self.samples, self.sample_rate, target_rate)?;
        Ok(AudioSignal {
            samples,
            sample_rate: target_rate,
            source: self.source.clone(),
        })
    }
}

fn new_resampler(ratio: f64) -> Result<SincFixedIn<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        oversampling_factor: 64,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| AudioError::Resample(e.to_string()))
}

fn process_chunk(
    resampler: &mut SincFixedIn<f32>,
    chunk: &[f32],
    output: &mut Vec<f32>,
) -> Result<()> {
    let mut block = chunk.to_vec();
    block.resize(RESAMPLE_CHUNK, 0.0);
    let processed = resampler
        .process(&[block], None)
        .map_err(|e| AudioError::Resample(e.to_string()))?;
    output.extend_from_slice(&processed[0]);
    Ok(())
}

/// Output samples by which a fresh resampler lags its input.
///
/// Measured with an impulse through an identically configured resampler,
/// since `output_delay()` overstates the latency of `SincFixedIn`.
fn measure_delay(ratio: f64) -> Result<usize> {
    let mut resampler = new_resampler(ratio)?;
    let position = RESAMPLE_CHUNK / 2;
    let mut impulse = vec![0.0f32; RESAMPLE_CHUNK];
    impulse[position] = 1.0;

    let horizon = ((RESAMPLE_CHUNK as f64) * ratio).ceil() as usize
        + 2 * resampler.output_delay()
        + RESAMPLE_CHUNK;
    let mut output = Vec::with_capacity(horizon + RESAMPLE_CHUNK);
    process_chunk(&mut resampler, &impulse, &mut output)?;
    while output.len() < horizon {
        process_chunk(&mut resampler, &[], &mut output)?;
    }

    let peak = output
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let lag = peak as f64 - position as f64 * ratio;
    Ok(lag.round().max(0.0) as usize)
}

fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    let ratio = output_rate as f64 / input_rate as f64;
    let delay = measure_delay(ratio)?;
    let mut resampler = new_resampler(ratio)?;

    let expected = (input.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    for chunk in input.chunks(RESAMPLE_CHUNK) {
        process_chunk(&mut resampler, chunk, &mut output)?;
    }

    // Flush the filter delay with silence.
    while output.len() < expected + delay {
        process_chunk(&mut resampler, &[], &mut output)?;
    }

    debug!(target: "audio", delay, ratio, "trimmed resampler latency");
    Ok(output[delay..delay + expected].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, seconds: f32) -> Vec<f32> {
        let count = (rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_prefix_truncates_to_window() {
        let signal = AudioSignal::new(vec![0.0; 100], 10);
        assert_eq!(signal.prefix(2).len(), 20);
        assert_eq!(signal.prefix(50).len(), 100);
        assert_eq!(signal.prefix(0).len(), 0);
    }

    #[test]
    fn test_duration() {
        let signal = AudioSignal::new(vec![0.0; 22_050], 44_100);
        assert!((signal.duration_secs() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let signal = AudioSignal::new(vec![0.1, 0.2, 0.3], 8_000).with_source("a.wav");
        let out = signal.resampled(8_000).unwrap();
        assert_eq!(out, signal);
    }

    #[test]
    fn test_resample_changes_length_by_ratio() {
        let signal = AudioSignal::new(sine(440.0, 16_000, 1.0), 16_000);
        let out = signal.resampled(8_000).unwrap();
        assert_eq!(out.sample_rate(), 8_000);
        assert_eq!(out.len(), 8_000);
    }

    #[test]
    fn test_resample_preserves_timing() {
        // A single click should land at the same time after resampling.
        let mut samples = vec![0.0f32; 16_000];
        samples[8_000] = 1.0;
        let out = AudioSignal::new(samples, 16_000).resampled(8_000).unwrap();
        let peak = out
            .samples()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak as i64 - 4_000).abs() <= 2, "peak at {peak}");
    }

    /// Index of the loudest output sample after resampling a click at `click`.
    fn click_position(len: usize, click: usize, from: u32, to: u32) -> usize {
        let mut samples = vec![0.0f32; len];
        samples[click] = 1.0;
        let out = AudioSignal::new(samples, from).resampled(to).unwrap();
        out.samples()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_upsampling_preserves_timing() {
        let peak = click_position(44_100, 11_025, 22_050, 44_100);
        assert!((peak as i64 - 22_050).abs() <= 2, "peak at {peak}");
    }

    #[test]
    fn test_non_integer_ratio_preserves_timing() {
        // 16000 * 44100 / 48000 = 14700 exactly.
        let peak = click_position(48_000, 16_000, 48_000, 44_100);
        assert!((peak as i64 - 14_700).abs() <= 2, "peak at {peak}");
    }

    #[test]
    fn test_resample_zero_rate_rejected() {
        let signal = AudioSignal::new(vec![0.0; 10], 0);
        assert!(signal.resampled(8_000).is_err());
    }
}
