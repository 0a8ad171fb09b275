// SPDX-License-Identifier: GPL-3.0-or-later

//! These tests drive a real ffmpeg binary and return early when none is installed.

use std::ffi::OsStr;
use std::path::Path;

use clipseek_audio::{check_tool, fingerprint, load_signal, AudioError, MediaEngine};
use clipseek_config::EngineConfig;
use tempfile::TempDir;

fn ffmpeg_engine() -> Option<MediaEngine> {
    if !check_tool("ffmpeg").available {
        eprintln!("ffmpeg not available, skipping");
        return None;
    }
    MediaEngine::new(&EngineConfig::default()).ok()
}

fn write_tone(path: &Path, rate: u32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let count = (rate as f32 * seconds) as usize;
    for i in 0..count {
        let t = i as f32 / rate as f32;
        let value = (2.0 * std::f32::consts::PI * 330.0 * t).sin() * 0.4;
        writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_fingerprint_stable_across_containers() {
    let Some(engine) = ffmpeg_engine() else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("tone.wav");
    let flac = dir.path().join("tone.flac");
    write_tone(&wav, 44_100, 1.0);

    engine
        .run([
            OsStr::new("-y"),
            OsStr::new("-i"),
            wav.as_os_str(),
            OsStr::new("-metadata"),
            OsStr::new("title=different container"),
            flac.as_os_str(),
        ])
        .unwrap();

    let from_wav = fingerprint(&engine, &wav).unwrap();
    let from_flac = fingerprint(&engine, &flac).unwrap();
    assert_eq!(from_wav, from_flac);
    assert!(from_wav.validate().is_ok());
}

#[test]
fn test_fingerprint_differs_for_different_audio() {
    let Some(engine) = ffmpeg_engine() else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let short = dir.path().join("short.wav");
    let long = dir.path().join("long.wav");
    write_tone(&short, 44_100, 0.5);
    write_tone(&long, 44_100, 1.0);

    assert_ne!(
        fingerprint(&engine, &short).unwrap(),
        fingerprint(&engine, &long).unwrap()
    );
}

#[test]
fn test_fingerprint_undecodable_source_fails() {
    let Some(engine) = ffmpeg_engine() else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let junk = dir.path().join("junk.mp4");
    std::fs::write(&junk, b"not a media file").unwrap();

    let err = fingerprint(&engine, &junk).unwrap_err();
    assert!(matches!(err, AudioError::ToolFailed { .. }), "unexpected: {err}");
}

#[test]
fn test_extract_audio_and_load_through_engine() {
    let Some(engine) = ffmpeg_engine() else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("tone.wav");
    write_tone(&wav, 22_050, 1.0);

    let extracted = engine
        .extract_audio(&wav, &dir.path().join("canonical.wav"))
        .unwrap();
    let signal = load_signal(&extracted, Some(&engine)).unwrap();
    assert_eq!(signal.sample_rate(), 44_100);
    assert!((signal.duration_secs() - 1.0).abs() < 0.05);
}
