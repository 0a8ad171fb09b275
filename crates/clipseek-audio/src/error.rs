// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AudioError>;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("path {} is not readable: {reason}", path.display())]
    NotReadable { path: PathBuf, reason: String },

    #[error("Audio decoding error: {0}")]
    Decode(String),

    #[error("Resampling error: {0}")]
    Resample(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
