// SPDX-License-Identifier: GPL-3.0-or-later

//! Offset lookup service.
//!
//! Composes three collaborators:
//! 1. A [`Fingerprinter`] producing content hashes of both inputs
//! 2. An [`OffsetCache`] keyed by those hashes plus the search parameters
//! 3. A [`Detector`] that runs the actual search on a cache miss

use std::path::Path;

use clipseek_audio::{AudioError, Fingerprinter};
use clipseek_detection::{Detection, PeakSet, SearchParams};
use clipseek_infrastructure::{CacheError, CacheKey, OffsetCache};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::Detector;

/// Errors that can occur while looking up offsets
#[derive(Debug, Error)]
pub enum OffsetError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type for offset lookups
pub type OffsetResult<T> = Result<T, OffsetError>;

/// Finds where one recording occurs inside another, remembering past answers.
pub struct OffsetFinder<F, D, C> {
    fingerprinter: F,
    detector: D,
    cache: C,
}

impl<F, D, C> OffsetFinder<F, D, C>
where
    F: Fingerprinter,
    D: Detector,
    C: OffsetCache,
{
    pub fn new(fingerprinter: F, detector: D, cache: C) -> Self {
        Self {
            fingerprinter,
            detector,
            cache,
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Run the search directly, bypassing the cache.
    pub fn detect(&self, within: &Path, find: &Path, params: &SearchParams) -> OffsetResult<Detection> {
        Ok(self.detector.detect(within, find, params)?)
    }

    /// Offsets in seconds at which `find` starts inside `within`, uncached.
    pub fn find_offsets(
        &self,
        within: &Path,
        find: &Path,
        params: &SearchParams,
    ) -> OffsetResult<PeakSet> {
        Ok(self.detect(within, find, params)?.offsets)
    }

    /// Like [`find_offsets`](Self::find_offsets), but consults the cache first.
    ///
    /// # Arguments
    ///
    /// * `within` - The longer recording to search in
    /// * `find` - The clip to look for
    /// * `params` - Search parameters; all of them except `plot` form the cache key
    ///
    /// # Returns
    ///
    /// * `Ok(PeakSet)` - Cached offsets on a hit, fresh offsets on a miss
    /// * `Err(OffsetError::Audio)` - Fingerprinting or detection failed
    /// * `Err(OffsetError::Cache)` - The cache could not be read or rewritten
    #[instrument(skip_all, fields(within = %within.display(), find = %find.display()))]
    pub fn find_offsets_cached(
        &mut self,
        within: &Path,
        find: &Path,
        params: &SearchParams,
    ) -> OffsetResult<PeakSet> {
        let hash_within = self.fingerprinter.fingerprint(within)?;
        let hash_find = self.fingerprinter.fingerprint(find)?;
        debug!(
            target: "offsets",
            hash_within = %hash_within,
            hash_find = %hash_find,
            "fingerprinted inputs"
        );

        let key = CacheKey::new(hash_within, hash_find, params);
        if let Some(offsets) = self.cache.lookup(&key)? {
            info!(target: "offsets", offsets = ?offsets.as_slice(), "cache hit");
            return Ok(offsets);
        }

        let detection = self.detector.detect(within, find, params)?;
        info!(
            target: "offsets",
            offsets = ?detection.offsets.as_slice(),
            attempts = detection.attempts,
            outcome = ?detection.outcome,
            "cache miss, search finished"
        );

        self.cache.insert(key, detection.offsets.clone())?;
        Ok(detection.offsets)
    }
}
