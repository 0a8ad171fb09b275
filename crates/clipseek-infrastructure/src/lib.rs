// SPDX-License-Identifier: GPL-3.0-or-later
pub mod cache;
pub mod error;
pub mod file_cache;

pub use cache::{CacheEntry, CacheKey, MemoryOffsetCache, OffsetCache};
pub use error::{CacheError, Result};
pub use file_cache::{FileOffsetCache, CACHE_FORMAT};
