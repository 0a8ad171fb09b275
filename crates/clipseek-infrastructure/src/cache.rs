// SPDX-License-Identifier: GPL-3.0-or-later

use chrono::{DateTime, Utc};
use clipseek_audio::Fingerprint;
use clipseek_detection::{PeakSet, SearchParams};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Everything that identifies one offset search.
///
/// Matching is exact: the multiplier compares by bit pattern, so values
/// that print the same but differ in the last bit are distinct keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash_within: Fingerprint,
    pub hash_find: Fingerprint,
    pub multiplier: f64,
    pub window_secs: u32,
    pub number: Option<i64>,
    pub max_tries: u32,
}

impl CacheKey {
    pub fn new(hash_within: Fingerprint, hash_find: Fingerprint, params: &SearchParams) -> Self {
        Self {
            hash_within,
            hash_find,
            multiplier: params.multiplier,
            window_secs: params.window_secs,
            number: params.number,
            max_tries: params.max_tries,
        }
    }

    pub fn matches(&self, other: &CacheKey) -> bool {
        self.hash_within == other.hash_within
            && self.hash_find == other.hash_find
            && self.multiplier.to_bits() == other.multiplier.to_bits()
            && self.window_secs == other.window_secs
            && self.number == other.number
            && self.max_tries == other.max_tries
    }
}

/// A stored search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub offsets: PeakSet,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: CacheKey, offsets: PeakSet) -> Self {
        Self {
            key,
            offsets,
            created_at: Utc::now(),
        }
    }
}

/// Storage for finished offset searches.
pub trait OffsetCache {
    /// Offsets of the first entry whose key matches.
    fn lookup(&self, key: &CacheKey) -> Result<Option<PeakSet>>;

    /// Record a result. Entries are never evicted.
    fn insert(&mut self, key: CacheKey, offsets: PeakSet) -> Result<()>;
}

/// Process-local cache; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryOffsetCache {
    entries: Vec<CacheEntry>,
}

impl MemoryOffsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }
}

impl OffsetCache for MemoryOffsetCache {
    fn lookup(&self, key: &CacheKey) -> Result<Option<PeakSet>> {
        Ok(find_entry(&self.entries, key))
    }

    fn insert(&mut self, key: CacheKey, offsets: PeakSet) -> Result<()> {
        self.entries.push(CacheEntry::new(key, offsets));
        Ok(())
    }
}

pub(crate) fn find_entry(entries: &[CacheEntry], key: &CacheKey) -> Option<PeakSet> {
    entries
        .iter()
        .find(|entry| entry.key.matches(key))
        .map(|entry| entry.offsets.clone())
}
