//! Search engine entry point: cache-aware path finding.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::world::{BlockPos, RegionId, Vec3, WorldView};

use super::astar::{AStarConfig, AStarPlanner, Path};
use super::cache::PathCache;
use super::optimizer::PathOptimizer;

/// Cache-aware path finder.
///
/// Composes the planner, the string-pulling optimizer, and the query
/// cache. When wired to the world's change feed, pending region changes
/// are drained into cache invalidations before each query.
pub struct PathFinder<W: WorldView> {
    world: Arc<W>,
    planner: AStarPlanner,
    optimizer: PathOptimizer,
    cache: PathCache,
    changes: Option<Receiver<RegionId>>,
}

impl<W: WorldView> PathFinder<W> {
    /// Create a path finder over a world.
    pub fn new(world: Arc<W>, config: AStarConfig) -> Self {
        Self {
            world,
            planner: AStarPlanner::new(config),
            optimizer: PathOptimizer::new(),
            cache: PathCache::new(),
            changes: None,
        }
    }

    /// Wire the world's region change feed into cache invalidation.
    pub fn with_change_feed(mut self, changes: Receiver<RegionId>) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Find a path between two world positions.
    ///
    /// Serves from the cache when an equivalent query was answered since
    /// the last relevant world change; otherwise searches, optimizes, and
    /// memoizes. `None` is a normal negative result.
    pub fn find_path(&self, start: Vec3, goal: Vec3) -> Option<Path> {
        self.drain_world_changes();

        let key_start = BlockPos::containing(start);
        let key_goal = BlockPos::containing(goal);

        if let Some(path) = self.cache.lookup(key_start, key_goal) {
            tracing::debug!(
                "Cache hit for ({}, {}, {}) -> ({}, {}, {})",
                key_start.x,
                key_start.y,
                key_start.z,
                key_goal.x,
                key_goal.y,
                key_goal.z
            );
            return Some(path);
        }

        let route = self.planner.plan(self.world.as_ref(), start, goal)?;
        let path = self.optimizer.optimize(self.world.as_ref(), route.path);

        self.cache
            .store(key_start, key_goal, path.clone(), route.visited_regions);

        Some(path)
    }

    /// Invalidate cached results that may have traversed a changed region.
    pub fn invalidate_region(&self, region: RegionId) {
        let purged = self.cache.invalidate_region(region);
        if purged > 0 {
            tracing::debug!(
                "Region ({}, {}) change purged {} cached paths",
                region.x,
                region.z,
                purged
            );
        }
    }

    /// Cache (hits, misses) counters.
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    fn drain_world_changes(&self) {
        if let Some(changes) = &self.changes {
            while let Ok(region) = changes.try_recv() {
                self.invalidate_region(region);
            }
        }
    }
}
