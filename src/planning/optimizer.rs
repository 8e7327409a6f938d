//! Path post-processing: string pulling.
//!
//! Raw search output follows the lattice cell by cell. This pass greedily
//! drops interior waypoints wherever the line of sight between the last
//! kept waypoint and a later one is clear, leaving only the decision
//! points. The waypoint count never increases.

use crate::world::WorldView;

use super::astar::Path;

/// Greedy line-of-sight waypoint reducer.
pub struct PathOptimizer;

impl PathOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// Drop interior waypoints covered by a clear line of sight.
    ///
    /// A waypoint is removed only when the segment from the last kept
    /// waypoint to the waypoint after it is unobstructed, so no removal can
    /// ever route the path through a solid cell.
    pub fn optimize<W: WorldView>(&self, world: &W, path: Path) -> Path {
        if path.waypoints.len() <= 2 {
            return path;
        }

        let raw = &path.waypoints;
        let mut kept = Vec::with_capacity(raw.len());
        kept.push(raw[0]);
        let mut anchor = 0;

        for i in 1..raw.len() - 1 {
            if world.is_path_clear(raw[anchor], raw[i + 1]) {
                // raw[i] is redundant: its neighbors see each other
                continue;
            }
            kept.push(raw[i]);
            anchor = i;
        }

        kept.push(raw[raw.len() - 1]);

        tracing::debug!(
            "String pulling: {} -> {} waypoints",
            raw.len(),
            kept.len()
        );

        Path::from_waypoints(kept)
    }
}

impl Default for PathOptimizer {
    fn default() -> Self {
        Self::new()
    }
}
