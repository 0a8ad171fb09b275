// SPDX-License-Identifier: GPL-3.0-or-later

//! Audio plumbing for offset search.
//!
//! This crate provides functionality for:
//! - Driving the external ffmpeg binary (extraction, canonical PCM)
//! - Content fingerprints of a source's decoded audio stream
//! - Decoding sources into mono [`AudioSignal`]s and resampling them

pub mod decode;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod signal;
pub mod tools;

pub use decode::{decode_file, load_signal};
pub use engine::MediaEngine;
pub use error::{AudioError, Result};
pub use fingerprint::{fingerprint, Fingerprint, Fingerprinter};
pub use signal::AudioSignal;
pub use tools::{check_tool, ensure_readable, get_tool_path, ToolInfo};
