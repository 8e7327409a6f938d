//! Voxel grid storage and the world query interface.
//!
//! The navigation core only ever sees the world through [`WorldView`]:
//! per-cell block samples plus a line-of-sight query. [`VoxelWorld`] is the
//! in-memory implementation, a sparse block store that publishes region
//! change notifications for cache invalidation.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Mutex, RwLock};

use super::block::{Block, BlockKind};
use super::geom::{BlockPos, RegionId, Vec3};

/// World query interface consumed by the navigation core.
///
/// `block_at` returns `None` for cells the client has no information about
/// (unloaded or never observed); callers treat unknown cells as empty space
/// that offers no support.
pub trait WorldView: Send + Sync {
    /// Sample the block occupying a cell, `None` if unknown.
    fn block_at(&self, pos: BlockPos) -> Option<Block>;

    /// Check that the straight segment between two points crosses no solid
    /// cell. Walks every cell the segment visits, in the manner of a
    /// Bresenham line check extended to three axes.
    fn is_path_clear(&self, from: Vec3, to: Vec3) -> bool {
        let solid = |cell: BlockPos| self.block_at(cell).is_some_and(|b| b.is_solid());

        let mut cell = BlockPos::containing(from);
        let end = BlockPos::containing(to);

        if solid(cell) {
            return false;
        }

        let d = to - from;
        let (step_x, mut t_max_x, t_delta_x) = axis_setup(from.x, cell.x, d.x);
        let (step_y, mut t_max_y, t_delta_y) = axis_setup(from.y, cell.y, d.y);
        let (step_z, mut t_max_z, t_delta_z) = axis_setup(from.z, cell.z, d.z);

        // The traversal crosses exactly one cell boundary per iteration
        let max_steps = cell.manhattan_distance(&end) + 3;
        for _ in 0..max_steps {
            if cell == end {
                return true;
            }

            if t_max_x <= t_max_y && t_max_x <= t_max_z {
                cell.x += step_x;
                t_max_x += t_delta_x;
            } else if t_max_y <= t_max_z {
                cell.y += step_y;
                t_max_y += t_delta_y;
            } else {
                cell.z += step_z;
                t_max_z += t_delta_z;
            }

            if solid(cell) {
                return false;
            }
        }

        cell == end
    }
}

/// Per-axis traversal setup: step direction, parameter of the first cell
/// boundary crossing, and parameter advance per crossed cell.
#[inline]
fn axis_setup(origin: f32, cell: i32, delta: f32) -> (i32, f32, f32) {
    if delta > 0.0 {
        let step = 1;
        let t_max = ((cell as f32 + 1.0) - origin) / delta;
        (step, t_max, 1.0 / delta)
    } else if delta < 0.0 {
        let step = -1;
        let t_max = (origin - cell as f32) / -delta;
        (step, t_max, 1.0 / -delta)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}

/// Sparse in-memory voxel world.
///
/// Cells not present in the store are unknown (`block_at` returns `None`).
/// Structural edits publish the affected region on the change feed.
pub struct VoxelWorld {
    blocks: RwLock<HashMap<BlockPos, Block>>,
    change_subs: Mutex<Vec<Sender<RegionId>>>,
}

impl VoxelWorld {
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            change_subs: Mutex::new(Vec::new()),
        }
    }

    /// Place a block, publishing a region change if the cell actually changed.
    /// Setting `Air` clears the cell back to empty space.
    pub fn set_block(&self, pos: BlockPos, kind: BlockKind) {
        let previous = {
            let mut blocks = self.blocks.write();
            if kind == BlockKind::Air {
                blocks.remove(&pos)
            } else {
                blocks.insert(pos, Block::new(kind))
            }
        };

        let changed = match previous {
            Some(block) => block.kind != kind,
            None => kind != BlockKind::Air,
        };
        if changed {
            self.notify(pos.region());
        }
    }

    /// Fill an inclusive box of cells with one block kind.
    /// Each touched region is published once.
    pub fn fill(&self, min: BlockPos, max: BlockPos, kind: BlockKind) {
        let mut regions = Vec::new();
        {
            let mut blocks = self.blocks.write();
            for x in min.x..=max.x {
                for y in min.y..=max.y {
                    for z in min.z..=max.z {
                        let pos = BlockPos::new(x, y, z);
                        if kind == BlockKind::Air {
                            blocks.remove(&pos);
                        } else {
                            blocks.insert(pos, Block::new(kind));
                        }
                        let region = pos.region();
                        if !regions.contains(&region) {
                            regions.push(region);
                        }
                    }
                }
            }
        }
        for region in regions {
            self.notify(region);
        }
    }

    /// Subscribe to region change notifications.
    pub fn subscribe_changes(&self) -> Receiver<RegionId> {
        let (tx, rx) = unbounded();
        self.change_subs.lock().push(tx);
        rx
    }

    /// Number of known (non-air) cells.
    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }

    fn notify(&self, region: RegionId) {
        self.change_subs
            .lock()
            .retain(|tx| tx.send(region).is_ok());
    }
}

impl Default for VoxelWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldView for VoxelWorld {
    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        self.blocks.read().get(&pos).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let world = VoxelWorld::new();
        let pos = BlockPos::new(1, 64, -3);

        assert!(world.block_at(pos).is_none());

        world.set_block(pos, BlockKind::Stone);
        assert!(world.block_at(pos).unwrap().is_solid());

        world.set_block(pos, BlockKind::Air);
        assert!(world.block_at(pos).is_none());
    }

    #[test]
    fn test_path_clear_open_space() {
        let world = VoxelWorld::new();
        world.fill(
            BlockPos::new(-5, 63, -5),
            BlockPos::new(15, 63, 15),
            BlockKind::Stone,
        );

        let from = Vec3::new(0.5, 64.0, 0.5);
        let to = Vec3::new(10.5, 64.0, 10.5);
        assert!(world.is_path_clear(from, to));
    }

    #[test]
    fn test_path_blocked_by_wall() {
        let world = VoxelWorld::new();
        // Wall across the z=5 row at the segment's elevation
        world.fill(
            BlockPos::new(-5, 64, 5),
            BlockPos::new(15, 65, 5),
            BlockKind::Stone,
        );

        let from = Vec3::new(0.5, 64.0, 0.5);
        let to = Vec3::new(0.5, 64.0, 10.5);
        assert!(!world.is_path_clear(from, to));
    }

    #[test]
    fn test_change_feed_reports_edited_region() {
        let world = VoxelWorld::new();
        let changes = world.subscribe_changes();

        world.set_block(BlockPos::new(20, 64, -20), BlockKind::Dirt);
        assert_eq!(changes.try_recv().unwrap(), RegionId::new(1, -2));

        // Rewriting the same kind is not a structural change
        world.set_block(BlockPos::new(20, 64, -20), BlockKind::Dirt);
        assert!(changes.try_recv().is_err());
    }
}
