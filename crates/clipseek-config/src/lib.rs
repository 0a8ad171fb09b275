// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Verbosity handed to the external media engine through `-loglevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineLogLevel {
    /// Only fatal errors reach stderr.
    Fatal,
    #[default]
    Warning,
    Debug,
}

impl EngineLogLevel {
    pub fn as_arg(&self) -> &'static str {
        match self {
            EngineLogLevel::Fatal => "fatal",
            EngineLogLevel::Warning => "warning",
            EngineLogLevel::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Explicit ffmpeg binary. Falls back to a PATH lookup when unset.
    pub ffmpeg_path: Option<PathBuf>,
    pub log_level: EngineLogLevel,
    /// Ask ffmpeg to write its own `-report` log file next to the working directory.
    pub save_reports: bool,
    /// Sample rate of the canonical PCM form used for fingerprinting.
    pub extract_sample_rate: u32,
    pub extract_channels: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            log_level: EngineLogLevel::Warning,
            save_reports: false,
            extract_sample_rate: 44_100,
            extract_channels: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Two offsets closer than this (in seconds) collapse into the earlier one.
    pub min_peak_distance_secs: f64,
    pub default_window_secs: u32,
    pub default_max_tries: u32,
    pub plot_dir: PathBuf,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_peak_distance_secs: 1.0,
            default_window_secs: 2,
            default_max_tries: 80,
            plot_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("cached_offset_searches.bin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub detection: DetectionConfig,
    pub cache: CacheConfig,
    pub telemetry: TelemetryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: CLIPSEEK_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("CLIPSEEK_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
