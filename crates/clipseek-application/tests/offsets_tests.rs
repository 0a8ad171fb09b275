// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::path::Path;

use clipseek_application::{offset_finder, Detector, OffsetFinder, SignalDetector};
use clipseek_audio::{check_tool, Fingerprint, Fingerprinter};
use clipseek_config::{AppConfig, DetectionConfig};
use clipseek_detection::{SearchOutcome, SearchParams};
use clipseek_infrastructure::{FileOffsetCache, MemoryOffsetCache};
use tempfile::TempDir;

const RATE: u32 = 8_000;

struct ByteFingerprinter;

impl Fingerprinter for ByteFingerprinter {
    fn fingerprint(&self, source: &Path) -> clipseek_audio::Result<Fingerprint> {
        Ok(Fingerprint::of_bytes(&fs::read(source)?))
    }
}

fn noise(len: usize, mut state: u64) -> Vec<f32> {
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 40) as f32 / (1u64 << 24) as f32 - 0.5
        })
        .collect()
}

fn write_wav(path: &Path, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

/// Writes a 10 s recording with a 0.5 s noise clip at 2.0 s and 6.5 s.
fn fixture(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let clip = noise(RATE as usize / 2, 0x9E37_79B9_7F4A_7C15);
    let mut long = vec![0.0f32; RATE as usize * 10];
    for offset in [2.0f32, 6.5] {
        let start = (offset * RATE as f32) as usize;
        long[start..start + clip.len()].copy_from_slice(&clip);
    }

    let within = dir.join("broadcast.wav");
    let find = dir.join("jingle.wav");
    write_wav(&within, &long);
    write_wav(&find, &clip);
    (within, find)
}

fn assert_offsets(got: &[f64], want: &[f64]) {
    assert_eq!(got.len(), want.len(), "got {got:?}, want {want:?}");
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() <= 0.05, "got {got:?}, want {want:?}");
    }
}

#[test]
fn test_signal_detector_on_wav_files() {
    let dir = TempDir::new().unwrap();
    let (within, find) = fixture(dir.path());

    let detector = SignalDetector::new(None, DetectionConfig::default());
    let params = SearchParams::new(0.5).window_secs(1).number(Some(2));
    let detection = detector.detect(&within, &find, &params).unwrap();

    assert_offsets(detection.offsets.as_slice(), &[2.0, 6.5]);
    assert_eq!(detection.outcome, SearchOutcome::Converged);
}

#[test]
fn test_cached_lookup_on_wav_files() {
    let dir = TempDir::new().unwrap();
    let (within, find) = fixture(dir.path());
    let cache_path = dir.path().join("cache.bin");

    let mut finder = OffsetFinder::new(
        ByteFingerprinter,
        SignalDetector::new(None, DetectionConfig::default()),
        FileOffsetCache::new(&cache_path),
    );
    let params = SearchParams::new(0.5).window_secs(1).number(Some(2));

    let fresh = finder.find_offsets_cached(&within, &find, &params).unwrap();
    let cached = finder.find_offsets_cached(&within, &find, &params).unwrap();

    assert_offsets(fresh.as_slice(), &[2.0, 6.5]);
    assert_eq!(fresh, cached);
    assert_eq!(finder.cache().load().unwrap().len(), 1);
}

#[test]
fn test_missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    let (within, _) = fixture(dir.path());

    let finder = OffsetFinder::new(
        ByteFingerprinter,
        SignalDetector::new(None, DetectionConfig::default()),
        MemoryOffsetCache::new(),
    );
    let err = finder
        .find_offsets(&within, &dir.path().join("nope.wav"), &SearchParams::new(0.5))
        .unwrap_err();

    assert!(err.to_string().contains("nope.wav"), "unexpected: {err}");
}

#[test]
fn test_default_finder_end_to_end() {
    if !check_tool("ffmpeg").available {
        eprintln!("ffmpeg not available, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let (within, find) = fixture(dir.path());

    let mut config = AppConfig::default();
    config.cache.path = dir.path().join("offsets.bin");
    let mut finder = offset_finder(&config).unwrap();

    let params = SearchParams::new(0.5).window_secs(1).number(Some(2));
    let offsets = finder.find_offsets_cached(&within, &find, &params).unwrap();

    assert_offsets(offsets.as_slice(), &[2.0, 6.5]);
    assert!(config.cache.path.exists());
}
