// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use clipseek_audio::{load_signal, MediaEngine, Result};
use clipseek_config::DetectionConfig;
use clipseek_detection::{detect, Detection, SearchParams};
use tracing::instrument;

/// Runs an offset search between two media files.
pub trait Detector {
    fn detect(&self, within: &Path, find: &Path, params: &SearchParams) -> Result<Detection>;
}

/// Decodes both files and runs the correlation search on them.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    engine: Option<MediaEngine>,
    config: DetectionConfig,
}

impl SignalDetector {
    /// `engine` is only used for sources the in-process decoder cannot read.
    pub fn new(engine: Option<MediaEngine>, config: DetectionConfig) -> Self {
        Self { engine, config }
    }
}

impl Detector for SignalDetector {
    #[instrument(skip_all, fields(within = %within.display(), find = %find.display()))]
    fn detect(&self, within: &Path, find: &Path, params: &SearchParams) -> Result<Detection> {
        let within_signal = load_signal(within, self.engine.as_ref())?;
        let find_signal = load_signal(find, self.engine.as_ref())?;
        detect(&within_signal, &find_signal, params, &self.config)
    }
}
