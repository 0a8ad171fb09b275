// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::{AudioError, MediaEngine, Result};

/// Content hash of a source's decoded audio stream.
///
/// The digest is SHA-256 over the canonical PCM produced by the media
/// engine, hex-encoded. Only samples are hashed, so two containers carrying
/// the same waveform (same decode parameters) share a fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub hash: String,
}

impl Fingerprint {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Hash raw PCM bytes directly.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::new(hex::encode(Sha256::digest(bytes)))
    }

    /// A valid fingerprint is 64 lowercase hex characters.
    pub fn validate(&self) -> Result<()> {
        if self.hash.is_empty() {
            return Err(AudioError::InvalidFingerprint(
                "fingerprint hash is empty".to_string(),
            ));
        }

        if self.hash.len() != 64 {
            return Err(AudioError::InvalidFingerprint(format!(
                "expected 64 hex characters, got {}",
                self.hash.len()
            )));
        }

        if !self
            .hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(AudioError::InvalidFingerprint(
                "fingerprint contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hash)
    }
}

/// Anything able to turn a media path into a [`Fingerprint`].
pub trait Fingerprinter {
    fn fingerprint(&self, source: &Path) -> Result<Fingerprint>;
}

impl Fingerprinter for MediaEngine {
    fn fingerprint(&self, source: &Path) -> Result<Fingerprint> {
        fingerprint(self, source)
    }
}

/// Extract `source`'s audio to a temporary PCM file, hash it, and remove the
/// temporary file.
///
/// Decode failures from the engine propagate unchanged. The temporary
/// directory is removed on drop; an abnormal exit can leave it behind.
#[instrument(skip_all, fields(source = %source.display()))]
pub fn fingerprint(engine: &MediaEngine, source: &Path) -> Result<Fingerprint> {
    let scratch = tempfile::Builder::new()
        .prefix("clipseek-hash-")
        .tempdir()?;
    let pcm_path = scratch.path().join("audio.pcm");

    engine.extract_raw_pcm(source, &pcm_path)?;

    let mut hasher = Sha256::new();
    let mut reader = File::open(&pcm_path)?;
    let bytes = io::copy(&mut reader, &mut hasher)?;
    let fingerprint = Fingerprint::new(hex::encode(hasher.finalize()));

    debug!(target: "audio", bytes, hash = %fingerprint, "fingerprinted audio");
    Ok(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_bytes_is_deterministic() {
        let a = Fingerprint::of_bytes(b"\x00\x01\x02\x03");
        let b = Fingerprint::of_bytes(b"\x00\x01\x02\x03");
        assert_eq!(a, b);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_of_bytes_known_digest() {
        let fp = Fingerprint::of_bytes(b"");
        assert_eq!(
            fp.hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_different_bytes_differ() {
        assert_ne!(Fingerprint::of_bytes(b"a"), Fingerprint::of_bytes(b"b"));
    }

    #[test]
    fn test_validation_empty_hash() {
        assert!(Fingerprint::new("").validate().is_err());
    }

    #[test]
    fn test_validation_wrong_length() {
        assert!(Fingerprint::new("abc123").validate().is_err());
    }

    #[test]
    fn test_validation_uppercase_rejected() {
        let fp = Fingerprint::new("E".repeat(64));
        assert!(fp.validate().is_err());
    }

    #[test]
    fn test_fingerprint_missing_source() {
        let engine = MediaEngine::with_program("ffmpeg", &Default::default());
        let err = fingerprint(&engine, Path::new("/nonexistent/source.mp4")).unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound { .. }));
    }
}
