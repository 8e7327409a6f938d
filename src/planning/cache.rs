//! Query cache for the search engine.
//!
//! Successful searches are memoized by quantized (start, goal) cell pair.
//! Each entry remembers the exact set of regions its search visited, so a
//! region change invalidates precisely the entries that could be stale.
//! Failures are never cached; a later call may succeed once the world
//! changes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::world::{BlockPos, RegionId};

use super::astar::Path;

struct CacheEntry {
    path: Path,
    regions: HashSet<RegionId>,
}

/// Concurrency-safe path cache.
///
/// Read and written concurrently with traversal; keyed, not positional,
/// state.
pub struct PathCache {
    entries: RwLock<HashMap<(BlockPos, BlockPos), CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a cached path for a (start, goal) cell pair.
    pub fn lookup(&self, start: BlockPos, goal: BlockPos) -> Option<Path> {
        let entries = self.entries.read();
        match entries.get(&(start, goal)) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.path.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Memoize a successful search result.
    pub fn store(&self, start: BlockPos, goal: BlockPos, path: Path, regions: HashSet<RegionId>) {
        self.entries
            .write()
            .insert((start, goal), CacheEntry { path, regions });
    }

    /// Purge every entry whose search visited the changed region.
    /// Returns the number of entries removed.
    pub fn invalidate_region(&self, region: RegionId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.regions.contains(&region));
        before - entries.len()
    }

    /// (hits, misses) counters.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}
