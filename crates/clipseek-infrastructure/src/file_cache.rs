// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use clipseek_config::CacheConfig;
use clipseek_detection::PeakSet;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::cache::{find_entry, CacheEntry, CacheKey, OffsetCache};
use crate::{CacheError, Result};

/// Bumped whenever `CacheEntry` changes shape.
pub const CACHE_FORMAT: u32 = 1;

/// Leading bytes of every cache file this crate writes.
const MAGIC: &[u8; 8] = b"CLIPSEEK";

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    format: u32,
    entries: Vec<CacheEntry>,
}

/// Offset cache persisted as a single bincode file.
///
/// Every lookup reads the whole file; every insert rewrites it through a
/// sibling temp file and an atomic rename. There is no locking, so two
/// processes inserting at once may lose one of the two entries.
#[derive(Debug, Clone)]
pub struct FileOffsetCache {
    path: PathBuf,
}

impl FileOffsetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored entries. A missing, empty or outdated cache reads as empty.
    ///
    /// A file without the cache header belongs to something else and is
    /// reported as [`CacheError::Foreign`], so it is never overwritten.
    pub fn load(&self) -> Result<Vec<CacheEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(target: "cache", path = %self.path.display(), "no cache file yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(CacheError::io(&self.path, err)),
        };

        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let Some(payload) = bytes.strip_prefix(MAGIC.as_slice()) else {
            return Err(CacheError::Foreign {
                path: self.path.clone(),
            });
        };

        match bincode::deserialize::<CacheFile>(payload) {
            Ok(file) if file.format == CACHE_FORMAT => Ok(file.entries),
            Ok(file) => {
                warn!(
                    target: "cache",
                    path = %self.path.display(),
                    found = file.format,
                    expected = CACHE_FORMAT,
                    "cache format changed, starting empty"
                );
                Ok(Vec::new())
            }
            Err(err) => {
                warn!(
                    target: "cache",
                    path = %self.path.display(),
                    error = %err,
                    "cache file unreadable, starting empty"
                );
                Ok(Vec::new())
            }
        }
    }

    fn store(&self, entries: Vec<CacheEntry>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        let file = CacheFile {
            format: CACHE_FORMAT,
            entries,
        };

        let tmp = NamedTempFile::new_in(&dir).map_err(|e| CacheError::io(&dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            writer
                .write_all(MAGIC)
                .map_err(|e| CacheError::io(tmp.path(), e))?;
            bincode::serialize_into(&mut writer, &file)?;
            writer.flush().map_err(|e| CacheError::io(tmp.path(), e))?;
        }
        tmp.persist(&self.path)?;

        debug!(
            target: "cache",
            path = %self.path.display(),
            entries = file.entries.len(),
            "cache written"
        );
        Ok(())
    }
}

impl OffsetCache for FileOffsetCache {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn lookup(&self, key: &CacheKey) -> Result<Option<PeakSet>> {
        let hit = find_entry(&self.load()?, key);
        if hit.is_some() {
            info!(target: "cache", "using cached offsets");
        }
        Ok(hit)
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn insert(&mut self, key: CacheKey, offsets: PeakSet) -> Result<()> {
        let mut entries = self.load()?;
        entries.push(CacheEntry::new(key, offsets));
        self.store(entries)
    }
}
