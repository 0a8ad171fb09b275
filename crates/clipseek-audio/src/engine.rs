// SPDX-License-Identifier: GPL-3.0-or-later

//! Subprocess wrapper around the external ffmpeg binary.
//!
//! Every invocation blocks until ffmpeg exits. A non-zero exit status is
//! reported as [`AudioError::ToolFailed`] with ffmpeg's stderr attached;
//! nothing is retried.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

use clipseek_config::EngineConfig;
use tracing::{debug, info, instrument};

use crate::tools::{ensure_readable, get_tool_path};
use crate::{AudioError, Result};

const FFMPEG: &str = "ffmpeg";

/// Handle on a resolved ffmpeg binary plus the flags every call shares.
#[derive(Debug, Clone)]
pub struct MediaEngine {
    program: PathBuf,
    config: EngineConfig,
}

impl MediaEngine {
    /// Resolve ffmpeg from the configured path or PATH.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let program = get_tool_path(FFMPEG, config.ffmpeg_path.as_deref())?;
        debug!(target: "audio", program = %program.display(), "resolved media engine");
        Ok(Self::with_program(program, config))
    }

    /// Use an explicit binary without any lookup.
    pub fn with_program(program: impl Into<PathBuf>, config: &EngineConfig) -> Self {
        Self {
            program: program.into(),
            config: config.clone(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Global flags placed ahead of the per-call arguments.
    fn global_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            self.config.log_level.as_arg().into(),
        ];
        if self.config.save_reports {
            args.push("-report".into());
        }
        args
    }

    /// Full argument list for a call, global flags first.
    pub fn build_args<I, S>(&self, args: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut all = self.global_args();
        all.extend(args.into_iter().map(Into::into));
        all
    }

    /// Run ffmpeg with the given arguments and wait for it to exit.
    pub fn run<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args = self.build_args(args);
        let rendered = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        info!(target: "audio", command = %format!("{} {}", self.program.display(), rendered), "running media engine");

        let started = Instant::now();
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| AudioError::tool_failed(FFMPEG, format!("failed to spawn: {e}")))?;

        let elapsed = started.elapsed().as_secs_f64();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::tool_failed(
                FFMPEG,
                format!("exited with status {}: {}", output.status, stderr.trim()),
            ));
        }

        info!(target: "audio", elapsed_secs = %format!("{elapsed:.2}"), "media engine finished");
        Ok(output)
    }

    /// Extract the audio track of `input` into a 16-bit PCM WAV at the
    /// configured canonical rate and channel count.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub fn extract_audio(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        ensure_readable(input)?;
        let rate = self.config.extract_sample_rate.to_string();
        let channels = self.config.extract_channels.to_string();
        self.run([
            OsString::from("-y"),
            "-i".into(),
            input.into(),
            "-vn".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ar".into(),
            rate.into(),
            "-ac".into(),
            channels.into(),
            output.into(),
        ])?;
        Ok(output.to_path_buf())
    }

    /// Same canonical form as [`extract_audio`](Self::extract_audio) but as
    /// headerless `s16le`: no container header or tags reach the output.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub fn extract_raw_pcm(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        ensure_readable(input)?;
        let rate = self.config.extract_sample_rate.to_string();
        let channels = self.config.extract_channels.to_string();
        self.run([
            OsString::from("-y"),
            "-i".into(),
            input.into(),
            "-vn".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ar".into(),
            rate.into(),
            "-ac".into(),
            channels.into(),
            "-f".into(),
            "s16le".into(),
            output.into(),
        ])?;
        Ok(output.to_path_buf())
    }

    /// Decode the audio track of `input` into a WAV that keeps the source
    /// sample rate and channel layout.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub fn extract_native_wav(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        ensure_readable(input)?;
        self.run([
            OsString::from("-y"),
            "-i".into(),
            input.into(),
            "-vn".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            output.into(),
        ])?;
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipseek_config::EngineLogLevel;

    fn engine(config: EngineConfig) -> MediaEngine {
        MediaEngine::with_program("ffmpeg", &config)
    }

    #[test]
    fn test_global_args_follow_log_level() {
        let config = EngineConfig {
            log_level: EngineLogLevel::Fatal,
            ..EngineConfig::default()
        };
        let args = engine(config).build_args(["-i", "in.wav"]);
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["-hide_banner", "-nostdin", "-loglevel", "fatal", "-i", "in.wav"]
        );
    }

    #[test]
    fn test_report_flag_appended_when_enabled() {
        let config = EngineConfig {
            save_reports: true,
            ..EngineConfig::default()
        };
        let args = engine(config).build_args(Vec::<OsString>::new());
        assert!(args.iter().any(|a| a == "-report"));
    }

    #[test]
    fn test_spawn_failure_is_tool_failed() {
        let engine = MediaEngine::with_program(
            "/nonexistent/ffmpeg_12345",
            &EngineConfig::default(),
        );
        let err = engine.run(["-version"]).unwrap_err();
        assert!(err.to_string().contains("failed to spawn"), "unexpected: {err}");
    }

    #[test]
    fn test_extract_rejects_missing_input() {
        let engine = engine(EngineConfig::default());
        let err = engine
            .extract_audio(Path::new("/nonexistent/input.mp4"), Path::new("out.wav"))
            .unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound { .. }));
    }
}
