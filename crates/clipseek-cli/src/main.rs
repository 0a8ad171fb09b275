// SPDX-License-Identifier: GPL-3.0-or-later
mod cli;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use clipseek_application::{offset_finder, Detector, SignalDetector};
use clipseek_audio::{check_tool, fingerprint, MediaEngine};
use clipseek_config::{load as load_config, AppConfig};
use clipseek_detection::{PeakSet, SearchOutcome, SearchParams};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::cli::{Cli, Commands};

const STARTUP_LOG_LEVEL: &str = "info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Debug, Serialize)]
struct FindReport<'a> {
    within: &'a Path,
    find: &'a Path,
    offsets: PeakSet,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<SearchOutcome>,
}

#[derive(Debug, Serialize)]
struct FingerprintReport {
    path: PathBuf,
    hash: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = init_tracing();
    let config = load_config(cli.config.as_deref())?;
    apply_log_level(filter.as_ref(), &config.telemetry.log_level)?;

    match cli.command {
        Commands::Find {
            within,
            find,
            multiplier,
            window,
            number,
            max_tries,
            plot,
            no_cache,
        } => {
            let params = search_params(&config, multiplier, window, number, max_tries, plot);
            run_find(&config, &within, &find, &params, no_cache)
        }
        Commands::Fingerprint { paths } => run_fingerprint(&config, &paths),
        Commands::Tools => run_tools(),
    }
}

/// Installs the subscriber ahead of config loading so its events are kept.
///
/// Returns a reload handle unless `RUST_LOG` chose the filter, in which case
/// the configured level is ignored.
fn init_tracing() -> Option<FilterHandle> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);
    let (env_filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(STARTUP_LOG_LEVEL), false),
    };
    let (env_filter, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
    (!from_env).then_some(handle)
}

fn apply_log_level(handle: Option<&FilterHandle>, level: &str) -> Result<()> {
    if let Some(handle) = handle {
        handle.reload(EnvFilter::new(level))?;
    }
    Ok(())
}

fn search_params(
    config: &AppConfig,
    multiplier: f64,
    window: Option<u32>,
    number: Option<i64>,
    max_tries: Option<u32>,
    plot: bool,
) -> SearchParams {
    let defaults = SearchParams::with_defaults(multiplier, &config.detection);
    SearchParams {
        window_secs: window.unwrap_or(defaults.window_secs),
        max_tries: max_tries.unwrap_or(defaults.max_tries),
        ..defaults
    }
    .number(number)
    .plot(plot)
}

fn run_find(
    config: &AppConfig,
    within: &Path,
    find: &Path,
    params: &SearchParams,
    no_cache: bool,
) -> Result<()> {
    let report = if no_cache || !config.cache.enabled {
        // Without the cache nothing needs fingerprinting, so ffmpeg is optional.
        let engine = match MediaEngine::new(&config.engine) {
            Ok(engine) => Some(engine),
            Err(err) => {
                warn!(target: "cli", error = %err, "media engine unavailable, decoding in-process only");
                None
            }
        };
        let detector = SignalDetector::new(engine, config.detection.clone());
        let detection = detector.detect(within, find, params)?;
        FindReport {
            within,
            find,
            offsets: detection.offsets,
            cached: false,
            attempts: Some(detection.attempts),
            outcome: Some(detection.outcome),
        }
    } else {
        let mut finder = offset_finder(config)?;
        FindReport {
            within,
            find,
            offsets: finder.find_offsets_cached(within, find, params)?,
            cached: true,
            attempts: None,
            outcome: None,
        }
    };

    info!(target: "cli", offsets = ?report.offsets.as_slice(), "search complete");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_fingerprint(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let engine = MediaEngine::new(&config.engine)?;
    let reports = paths
        .iter()
        .map(|path| {
            Ok(FingerprintReport {
                path: path.clone(),
                hash: fingerprint(&engine, path)?.hash,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn run_tools() -> Result<()> {
    let tool = check_tool("ffmpeg");
    let status = if tool.available { "ok" } else { "missing" };

    print!("{} {}", status, tool.name);
    if let Some(ref version) = tool.version {
        print!(" ({version})");
    }
    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }
    println!();

    if !tool.available {
        bail!("required tool ffmpeg is not available");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_arguments_parse() {
        let cli = Cli::try_parse_from([
            "clipseek",
            "find",
            "--within",
            "show.mp4",
            "--find",
            "jingle.wav",
            "--multiplier",
            "0.6",
            "--number",
            "-1",
            "--plot",
        ])
        .unwrap();

        match cli.command {
            Commands::Find {
                multiplier,
                number,
                window,
                plot,
                no_cache,
                ..
            } => {
                assert_eq!(multiplier, 0.6);
                assert_eq!(number, Some(-1));
                assert_eq!(window, None);
                assert!(plot);
                assert!(!no_cache);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_find_requires_multiplier() {
        let result = Cli::try_parse_from(["clipseek", "find", "--within", "a", "--find", "b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["clipseek", "tools", "--config", "clipseek.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("clipseek.toml")));
    }

    #[test]
    fn test_configured_level_replaces_startup_filter() {
        let (filter, handle) = reload::Layer::new(EnvFilter::new(STARTUP_LOG_LEVEL));
        let _subscriber = tracing_subscriber::registry().with(filter);

        apply_log_level(Some(&handle), "clipseek=debug").unwrap();

        let current = handle.with_current(|filter| filter.to_string()).unwrap();
        assert!(current.contains("clipseek") && current.contains("debug"), "{current}");
    }

    #[test]
    fn test_search_params_fall_back_to_config() {
        let mut config = AppConfig::default();
        config.detection.default_window_secs = 4;
        config.detection.default_max_tries = 20;

        let params = search_params(&config, 0.5, None, Some(3), None, false);
        assert_eq!(params.window_secs, 4);
        assert_eq!(params.max_tries, 20);
        assert_eq!(params.number, Some(3));

        let params = search_params(&config, 0.5, Some(1), None, Some(5), true);
        assert_eq!(params.window_secs, 1);
        assert_eq!(params.max_tries, 5);
        assert!(params.plot);
    }
}
