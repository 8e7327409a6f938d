//! # MargaNav
//!
//! Navigation core for an autonomous agent in a block-based voxel world:
//! path search over a dynamic, partially-known 3D grid, a movement
//! executor that advances the agent waypoint by waypoint, and an
//! orchestrator that supervises traversal and continuous following.
//!
//! ## Overview
//!
//! - **Search engine** ([`planning`]): A* over the lattice of standable
//!   cells, with string pulling and a region-invalidated query cache.
//! - **Movement executor** ([`movement`]): cancellable per-waypoint
//!   advancement behind an actuation seam.
//! - **Orchestrator** ([`navigation`]): `navigate_to`, `follow_entity`,
//!   `stop_navigation`, lifecycle events.
//!
//! The world itself is a collaborator: the core consumes it through the
//! narrow [`world::WorldView`] and [`world::EntityRegistry`] interfaces.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marga_nav::{
//!     AgentState, AStarConfig, DirectActuator, MotionConfig, MotionController,
//!     Navigator, NavigatorConfig, PathFinder, Vec3, VoxelWorld, EntityRegistry,
//! };
//!
//! let world = Arc::new(VoxelWorld::new());
//! let changes = world.subscribe_changes();
//! let agent = Arc::new(AgentState::new(Vec3::new(0.5, 64.0, 0.5)));
//! let finder = Arc::new(
//!     PathFinder::new(Arc::clone(&world), AStarConfig::default()).with_change_feed(changes),
//! );
//! let motion = MotionController::new(
//!     MotionConfig::default(),
//!     Arc::clone(&agent),
//!     Arc::new(DirectActuator),
//! );
//! let navigator = Navigator::new(
//!     NavigatorConfig::default(),
//!     agent,
//!     finder,
//!     motion,
//!     Arc::new(EntityRegistry::new()),
//! );
//!
//! navigator.navigate_to_default(Vec3::new(10.5, 64.0, 10.5));
//! ```

pub mod config;
pub mod error;
pub mod movement;
pub mod navigation;
pub mod planning;
pub mod shared;
pub mod world;

pub use config::MargaConfig;
pub use error::{MargaError, Result};
pub use movement::{Actuator, DirectActuator, MotionConfig, MotionController, MoveOutcome};
pub use navigation::{NavEvent, NavState, Navigator, NavigatorConfig};
pub use planning::{AStarConfig, AStarPlanner, Path, PathCache, PathFinder, PathOptimizer};
pub use shared::{ActivityGuard, AgentState, CancelToken};
pub use world::{
    Block, BlockKind, BlockPos, EntityId, EntityRegistry, RegionId, Vec3, VoxelWorld, WorldView,
};
