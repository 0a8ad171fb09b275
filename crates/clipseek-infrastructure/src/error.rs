// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Failures of the persisted offset cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cache: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("failed to replace cache file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("{path} is not an offset cache, refusing to overwrite it")]
    Foreign { path: PathBuf },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
