// SPDX-License-Identifier: GPL-3.0-or-later

//! Decoding audio files into mono [`AudioSignal`]s.
//!
//! WAV, FLAC and MP3 are decoded in-process with symphonia. Anything else
//! (video containers, exotic codecs) is first converted to a temporary WAV by
//! the media engine, when one is available, and then decoded the same way.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, warn};

use crate::tools::ensure_readable;
use crate::{AudioError, AudioSignal, MediaEngine, Result};

/// Load `path` as a mono signal at its native sample rate.
///
/// When in-process decoding fails and `engine` is given, the audio track is
/// extracted through the engine first. Errors from either path propagate.
#[instrument(skip_all, fields(file = %path.display()))]
pub fn load_signal(path: &Path, engine: Option<&MediaEngine>) -> Result<AudioSignal> {
    ensure_readable(path)?;

    match decode_file(path) {
        Ok(signal) => Ok(signal),
        Err(AudioError::Decode(reason)) => {
            let Some(engine) = engine else {
                return Err(AudioError::Decode(reason));
            };
            warn!(target: "audio", %reason, "in-process decode failed, extracting through media engine");

            let scratch = tempfile::Builder::new()
                .prefix("clipseek-decode-")
                .tempdir()?;
            let wav = engine.extract_native_wav(path, &scratch.path().join("audio.wav"))?;
            Ok(decode_file(&wav)?.with_source(path))
        }
        Err(other) => Err(other),
    }
}

/// Decode a file symphonia understands, mixing all channels down to mono.
pub fn decode_file(path: &Path) -> Result<AudioSignal> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("failed to probe stream: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("no audio tracks found".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("failed to create decoder: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("error reading packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(target: "audio", error = e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("failed to decode frame: {e}"))),
        };

        let spec = *decoded.spec();
        if spec.rate > 0 {
            sample_rate = spec.rate;
        }
        let channels = spec.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        samples.extend(
            buf.samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if sample_rate == 0 {
        return Err(AudioError::Decode("unknown sample rate".to_string()));
    }

    debug!(
        target: "audio",
        sample_count = samples.len(),
        sample_rate,
        "decoded audio"
    );

    Ok(AudioSignal::new(samples, sample_rate).with_source(path))
}
