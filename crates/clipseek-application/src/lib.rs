// SPDX-License-Identifier: GPL-3.0-or-later
use clipseek_audio::MediaEngine;
use clipseek_config::AppConfig;
use clipseek_infrastructure::FileOffsetCache;
use tracing::info;

pub mod detector;
pub mod offsets;

pub use detector::{Detector, SignalDetector};
pub use offsets::{OffsetError, OffsetFinder, OffsetResult};

/// Finder wired to ffmpeg, in-process decoding and the on-disk cache.
pub type DefaultOffsetFinder = OffsetFinder<MediaEngine, SignalDetector, FileOffsetCache>;

/// Build the production finder from configuration.
///
/// Fails with `ToolNotFound` when no ffmpeg binary can be resolved, since
/// every cached lookup fingerprints its inputs through it.
pub fn offset_finder(config: &AppConfig) -> OffsetResult<DefaultOffsetFinder> {
    let engine = MediaEngine::new(&config.engine)?;
    let detector = SignalDetector::new(Some(engine.clone()), config.detection.clone());
    let cache = FileOffsetCache::from_config(&config.cache);

    info!(
        target: "offsets",
        engine = %engine.program().display(),
        cache = %cache.path().display(),
        "offset finder initialized"
    );
    Ok(OffsetFinder::new(engine, detector, cache))
}
