//! A* path search over the block lattice.
//!
//! Searches the unit-spaced lattice of standable cells: horizontal moves in
//! eight directions with an optional single-step climb or drop. The cost
//! model penalizes vertical and diagonal moves and poor footing, while the
//! heuristic stays plain Manhattan distance. The heuristic is therefore not
//! admissible once the multipliers exceed 1.0; the search trades optimality
//! for speed and returns fast, usually-good paths. That trade-off is
//! intentional.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::world::{BlockPos, RegionId, Vec3, WorldView};

/// Tolerance when comparing path costs.
const COST_EPSILON: f32 = 1e-4;

/// Configuration for the A* planner.
#[derive(Clone, Debug)]
pub struct AStarConfig {
    /// Maximum node expansions before giving up
    pub node_budget: usize,
    /// Distance from the goal at which the search succeeds
    pub goal_radius: f32,
    /// Cost multiplier for moves with a vertical component
    pub vertical_factor: f32,
    /// Cost multiplier for horizontally diagonal moves
    pub diagonal_factor: f32,
    /// Footing multiplier when the destination stands on liquid
    pub liquid_factor: f32,
    /// Footing multiplier when the destination stands on nothing solid
    pub airborne_factor: f32,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            node_budget: 10_000,
            goal_radius: 1.0,
            vertical_factor: 1.5,
            diagonal_factor: 1.1,
            liquid_factor: 2.0,
            airborne_factor: 5.0,
        }
    }
}

/// Result of path planning.
#[derive(Clone, Debug)]
pub struct Path {
    /// Waypoints in world coordinates, start to goal
    pub waypoints: Vec<Vec3>,
    /// Total path length in world units
    pub length: f32,
}

impl Path {
    /// Build a path from waypoints, computing its length.
    pub fn from_waypoints(waypoints: Vec<Vec3>) -> Self {
        let length = waypoints
            .windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum();
        Self { waypoints, length }
    }
}

/// A successful search: the path plus the regions its search visited,
/// recorded for cache invalidation.
#[derive(Clone, Debug)]
pub struct PlannedRoute {
    pub path: Path,
    pub visited_regions: HashSet<RegionId>,
}

/// Search node. Nodes live in an arena owned by one search call and refer
/// to their predecessor by index, so a superseded parent can never dangle.
#[derive(Clone, Copy, Debug)]
struct Node {
    pos: BlockPos,
    g: f32,
    h: f32,
    parent: Option<u32>,
}

impl Node {
    #[inline]
    fn f(&self) -> f32 {
        self.g + self.h
    }
}

/// Heap entry referencing an arena node.
#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    f: f32,
    idx: u32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lower f = higher priority)
        other.f.partial_cmp(&self.f).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The 8 horizontal neighbor offsets.
const HORIZONTAL: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// A* path planner.
pub struct AStarPlanner {
    config: AStarConfig,
}

impl AStarPlanner {
    /// Create a new planner with configuration.
    pub fn new(config: AStarConfig) -> Self {
        Self { config }
    }

    /// Create a new planner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AStarConfig::default())
    }

    /// Plan a path between two world positions.
    ///
    /// Returns `None` when the goal is unreachable within the node budget.
    /// Failures are a normal negative result, not an error.
    pub fn plan<W: WorldView>(&self, world: &W, start: Vec3, goal: Vec3) -> Option<PlannedRoute> {
        if !start.is_finite() || !goal.is_finite() {
            tracing::warn!("Rejecting search with non-finite endpoint");
            return None;
        }

        let start_cell = BlockPos::containing(start);
        let goal_cell = BlockPos::containing(goal);

        let mut nodes: Vec<Node> = Vec::new();
        let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
        let mut best: HashMap<BlockPos, u32> = HashMap::new();
        let mut visited_regions: HashSet<RegionId> = HashSet::new();

        // The start cell is admitted unconditionally: the agent is there
        nodes.push(Node {
            pos: start_cell,
            g: 0.0,
            h: heuristic(start_cell, goal_cell),
            parent: None,
        });
        best.insert(start_cell, 0);
        open.push(OpenEntry {
            f: nodes[0].f(),
            idx: 0,
        });

        let mut expansions = 0usize;

        while let Some(entry) = open.pop() {
            let current = nodes[entry.idx as usize];

            // A relaxed node was re-queued with a lower f; this entry is stale
            if entry.f > current.f() + COST_EPSILON {
                continue;
            }

            expansions += 1;
            if expansions > self.config.node_budget {
                tracing::warn!(
                    "Search exceeded node budget ({}) from ({:.1}, {:.1}, {:.1})",
                    self.config.node_budget,
                    start.x,
                    start.y,
                    start.z
                );
                return None;
            }

            visited_regions.insert(current.pos.region());

            if current.pos.standing_pos().distance(&goal) <= self.config.goal_radius {
                let path = reconstruct(&nodes, entry.idx);
                return Some(PlannedRoute {
                    path,
                    visited_regions,
                });
            }

            for &(dx, dz) in &HORIZONTAL {
                for dy in -1..=1 {
                    let next = BlockPos::new(
                        current.pos.x + dx,
                        current.pos.y + dy,
                        current.pos.z + dz,
                    );
                    visited_regions.insert(next.region());

                    if !is_standable(world, next) {
                        continue;
                    }

                    let edge = self.edge_cost(world, next, dx, dy, dz);
                    let tentative_g = current.g + edge;

                    match best.get(&next).copied() {
                        Some(idx) if nodes[idx as usize].g <= tentative_g + COST_EPSILON => {}
                        Some(idx) => {
                            // Cheaper route to a known cell: update in place and
                            // re-queue. No closed-set purge is needed; the old
                            // heap entry goes stale and is skipped on pop.
                            let node = &mut nodes[idx as usize];
                            node.g = tentative_g;
                            node.parent = Some(entry.idx);
                            let f = node.f();
                            open.push(OpenEntry { f, idx });
                        }
                        None => {
                            let idx = nodes.len() as u32;
                            let node = Node {
                                pos: next,
                                g: tentative_g,
                                h: heuristic(next, goal_cell),
                                parent: Some(entry.idx),
                            };
                            open.push(OpenEntry { f: node.f(), idx });
                            nodes.push(node);
                            best.insert(next, idx);
                        }
                    }
                }
            }
        }

        tracing::warn!(
            "No path: open set exhausted after {} expansions toward ({:.1}, {:.1}, {:.1})",
            expansions,
            goal.x,
            goal.y,
            goal.z
        );
        None
    }

    /// Cost of stepping into `next`: Euclidean step length scaled for
    /// vertical adjustment, diagonal movement, and the footing under the
    /// destination.
    fn edge_cost<W: WorldView>(&self, world: &W, next: BlockPos, dx: i32, dy: i32, dz: i32) -> f32 {
        let mut cost = ((dx * dx + dy * dy + dz * dz) as f32).sqrt();
        if dy != 0 {
            cost *= self.config.vertical_factor;
        }
        if dx != 0 && dz != 0 {
            cost *= self.config.diagonal_factor;
        }
        cost * self.terrain_factor(world, next)
    }

    /// Footing multiplier from the block under a destination cell.
    fn terrain_factor<W: WorldView>(&self, world: &W, cell: BlockPos) -> f32 {
        match world.block_at(cell.down()) {
            Some(below) if below.is_solid() => 1.0,
            Some(below) if below.is_liquid() => self.config.liquid_factor,
            _ => self.config.airborne_factor,
        }
    }
}

/// Whether an agent can legally occupy a cell: the cell and the one above
/// it clear for headroom, the one below solid for support.
#[inline]
fn is_standable<W: WorldView>(world: &W, cell: BlockPos) -> bool {
    let solid = |c: BlockPos| world.block_at(c).is_some_and(|b| b.is_solid());
    !solid(cell) && !solid(cell.up()) && solid(cell.down())
}

/// Manhattan distance heuristic.
#[inline]
fn heuristic(from: BlockPos, to: BlockPos) -> f32 {
    from.manhattan_distance(&to) as f32
}

/// Walk predecessor indices back to the root, then reverse.
fn reconstruct(nodes: &[Node], goal_idx: u32) -> Path {
    let mut waypoints = Vec::new();
    let mut idx = Some(goal_idx);

    while let Some(i) = idx {
        let node = &nodes[i as usize];
        waypoints.push(node.pos.standing_pos());
        idx = node.parent;
    }

    waypoints.reverse();
    Path::from_waypoints(waypoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BlockKind, VoxelWorld};

    fn flat_world(radius: i32, floor_y: i32) -> VoxelWorld {
        let world = VoxelWorld::new();
        world.fill(
            BlockPos::new(-radius, floor_y, -radius),
            BlockPos::new(radius, floor_y, radius),
            BlockKind::Grass,
        );
        world
    }

    #[test]
    fn test_flat_floor_path() {
        let world = flat_world(20, 63);
        let planner = AStarPlanner::with_defaults();

        let start = Vec3::new(0.0, 64.0, 0.0);
        let goal = Vec3::new(5.0, 64.0, 5.0);

        let route = planner.plan(&world, start, goal).expect("path on open floor");
        let path = &route.path;

        assert!(!path.waypoints.is_empty());
        assert!(path.waypoints.first().unwrap().distance(&start) <= 1.0);
        assert!(path.waypoints.last().unwrap().distance(&goal) <= 1.0);
        // Waypoint count grows no faster than linearly with distance
        let distance = start.distance(&goal);
        assert!(path.waypoints.len() <= (distance.ceil() as usize) * 2 + 2);
    }

    #[test]
    fn test_wall_gap_forces_route() {
        let world = flat_world(20, 63);
        // Wall across z = 5 at walking height, with a single gap at x = 3
        for x in -20..=20 {
            if x == 3 {
                continue;
            }
            world.set_block(BlockPos::new(x, 64, 5), BlockKind::Stone);
            world.set_block(BlockPos::new(x, 65, 5), BlockKind::Stone);
        }

        let planner = AStarPlanner::with_defaults();
        let start = Vec3::new(0.5, 64.0, 0.5);
        let goal = Vec3::new(0.5, 64.0, 10.5);

        let route = planner.plan(&world, start, goal).expect("path through gap");
        let through_gap = route
            .path
            .waypoints
            .iter()
            .any(|wp| BlockPos::containing(*wp) == BlockPos::new(3, 64, 5));
        assert!(through_gap, "every successful path must use the gap");
    }

    #[test]
    fn test_unreachable_goal_returns_none() {
        let world = flat_world(10, 63);
        // Goal cell filled solid: no headroom, and no neighbor can reach it
        let goal_cell = BlockPos::new(4, 64, 4);
        world.set_block(goal_cell, BlockKind::Stone);
        world.set_block(goal_cell.up(), BlockKind::Stone);
        // Seal the ring around it as well
        for dx in -1..=1 {
            for dz in -1..=1 {
                world.set_block(BlockPos::new(4 + dx, 64, 4 + dz), BlockKind::Stone);
                world.set_block(BlockPos::new(4 + dx, 65, 4 + dz), BlockKind::Stone);
            }
        }

        let planner = AStarPlanner::new(AStarConfig {
            goal_radius: 0.5,
            ..Default::default()
        });
        let start = Vec3::new(-5.0, 64.0, -5.0);
        let goal = goal_cell.standing_pos();

        assert!(planner.plan(&world, start, goal).is_none());
    }

    #[test]
    fn test_node_budget_bounds_work() {
        let world = flat_world(40, 63);
        let planner = AStarPlanner::new(AStarConfig {
            node_budget: 10,
            ..Default::default()
        });

        // Goal floats far above the floor; unreachable, so the budget
        // terminates the search
        let start = Vec3::new(0.0, 64.0, 0.0);
        let goal = Vec3::new(0.0, 90.0, 0.0);

        assert!(planner.plan(&world, start, goal).is_none());
    }

    #[test]
    fn test_single_step_climb() {
        let world = flat_world(10, 63);
        // A one-block step up at z >= 3
        world.fill(
            BlockPos::new(-10, 64, 3),
            BlockPos::new(10, 64, 10),
            BlockKind::Dirt,
        );

        let planner = AStarPlanner::with_defaults();
        let start = Vec3::new(0.5, 64.0, 0.5);
        let goal = Vec3::new(0.5, 65.0, 8.5);

        let route = planner.plan(&world, start, goal).expect("climbable step");
        let top = route.path.waypoints.last().unwrap();
        assert!((top.y - 65.0).abs() < 0.5);
    }

    #[test]
    fn test_terrain_factor_values() {
        let world = VoxelWorld::new();
        world.set_block(BlockPos::new(0, 63, 0), BlockKind::Stone);
        world.set_block(BlockPos::new(1, 63, 0), BlockKind::Water);

        let planner = AStarPlanner::with_defaults();
        let on_stone = planner.terrain_factor(&world, BlockPos::new(0, 64, 0));
        let on_water = planner.terrain_factor(&world, BlockPos::new(1, 64, 0));
        let on_air = planner.terrain_factor(&world, BlockPos::new(2, 64, 0));

        assert!((on_stone - 1.0).abs() < 1e-6);
        assert!((on_water - 2.0).abs() < 1e-6);
        assert!((on_air - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_visited_regions_cover_path() {
        let world = flat_world(20, 63);
        let planner = AStarPlanner::with_defaults();

        let route = planner
            .plan(&world, Vec3::new(0.5, 64.0, 0.5), Vec3::new(10.5, 64.0, 0.5))
            .unwrap();

        for wp in &route.path.waypoints {
            let region = BlockPos::containing(*wp).region();
            assert!(route.visited_regions.contains(&region));
        }
    }
}
