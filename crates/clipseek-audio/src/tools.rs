// SPDX-License-Identifier: GPL-3.0-or-later

//! External tool detection.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::{AudioError, Result};

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's version banner.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Check whether a tool runs, using ffmpeg-style `-version` probing.
pub fn check_tool(name: &str) -> ToolInfo {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => ToolInfo {
            name: name.to_string(),
            available: true,
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: which::which(name).ok(),
        },
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Resolve a tool, preferring a configured path over a PATH lookup.
pub fn get_tool_path(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    which::which(name).map_err(|_| AudioError::ToolNotFound {
        tool: name.to_string(),
    })
}

/// Fail early when a source path cannot be opened for reading.
pub fn ensure_readable(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(AudioError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    File::open(path).map_err(|e| AudioError::NotReadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}
