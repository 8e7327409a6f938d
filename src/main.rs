//! MargaNav - Navigation controller demo
//!
//! Builds a small walled arena, navigates the controlled agent across it,
//! then follows a scripted moving entity for a few seconds. Lifecycle
//! events are logged from a subscriber thread, the way a full client would
//! observe them.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use marga_nav::{
    AgentState, BlockKind, BlockPos, DirectActuator, EntityId, EntityRegistry, MargaConfig,
    MotionController, NavEvent, Navigator, PathFinder, Result, Vec3, VoxelWorld,
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marga_nav=info".parse().unwrap()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        MargaConfig::load(config_path)?
    } else if Path::new("marga.toml").exists() {
        info!("Loading configuration from marga.toml");
        MargaConfig::load(Path::new("marga.toml"))?
    } else {
        info!("Using default configuration");
        MargaConfig::default()
    };

    info!("MargaNav v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Search budget: {} expansions, follow poll: {}ms",
        config.search.node_budget, config.navigation.follow_poll_ms
    );

    // Build the demo arena and wire the collaborators together
    let world = Arc::new(VoxelWorld::new());
    build_arena(&world);
    info!("Arena built: {} blocks", world.block_count());

    let changes = world.subscribe_changes();
    let finder =
        Arc::new(PathFinder::new(Arc::clone(&world), config.astar()).with_change_feed(changes));

    let start = Vec3::new(0.5, 64.0, 0.5);
    let agent = Arc::new(AgentState::new(start));
    let entities = Arc::new(EntityRegistry::new());

    let motion = MotionController::new(config.motion(), Arc::clone(&agent), Arc::new(DirectActuator));
    let navigator = Arc::new(Navigator::new(
        config.navigator(),
        Arc::clone(&agent),
        Arc::clone(&finder),
        motion,
        Arc::clone(&entities),
    ));

    // Observe lifecycle events from a separate thread
    let events = navigator.subscribe();
    let event_logger = thread::Builder::new()
        .name("events".into())
        .spawn(move || {
            for event in events {
                match event {
                    NavEvent::PathStarted { destination } => info!(
                        "Path started toward ({:.1}, {:.1}, {:.1})",
                        destination.x, destination.y, destination.z
                    ),
                    NavEvent::WaypointReached { waypoint } => info!(
                        "Waypoint reached ({:.1}, {:.1}, {:.1})",
                        waypoint.x, waypoint.y, waypoint.z
                    ),
                    NavEvent::PathCompleted { destination } => info!(
                        "Path completed at ({:.1}, {:.1}, {:.1})",
                        destination.x, destination.y, destination.z
                    ),
                    NavEvent::PathFailed => warn!("Path failed"),
                }
            }
        })
        .expect("Failed to spawn event thread");

    // Traverse the arena: the wall at z = 8 forces the route through its gap
    let goal = Vec3::new(0.5, 64.0, 14.5);
    info!("Navigating across the arena...");
    if navigator.navigate_to_default(goal) {
        let pos = navigator.position();
        info!("Arrived at ({:.1}, {:.1}, {:.1})", pos.x, pos.y, pos.z);
    } else {
        warn!("Traversal did not complete");
    }

    let (hits, misses) = finder.cache_stats();
    info!("Search cache: {} hits, {} misses", hits, misses);

    // Follow a scripted entity drifting across the arena
    let runner = EntityId(7);
    entities.upsert(runner, Vec3::new(3.5, 64.0, 14.5));

    let script_entities = Arc::clone(&entities);
    let script = thread::Builder::new()
        .name("script".into())
        .spawn(move || {
            for step in 0..24 {
                let x = 3.5 + step as f32 * 0.5;
                script_entities.upsert(runner, Vec3::new(x, 64.0, 14.5));
                thread::sleep(Duration::from_millis(250));
            }
        })
        .expect("Failed to spawn script thread");

    info!("Following entity {} for a few seconds...", runner.0);
    let follow_navigator = Arc::clone(&navigator);
    let follow = thread::spawn(move || follow_navigator.follow_entity_default(runner));

    thread::sleep(Duration::from_secs(5));
    navigator.stop_navigation();
    let _ = follow.join();
    let _ = script.join();

    let pos = navigator.position();
    info!(
        "Follow ended at ({:.1}, {:.1}, {:.1}), {} entities tracked",
        pos.x,
        pos.y,
        pos.z,
        entities.len()
    );

    // Dropping the last navigator handle disconnects the event feed
    drop(navigator);
    let _ = event_logger.join();

    info!("MargaNav finished");
    Ok(())
}

/// Flat 48x48 floor with a wall across z = 8, one gap at x = 5.
fn build_arena(world: &VoxelWorld) {
    world.fill(
        BlockPos::new(-24, 63, -24),
        BlockPos::new(24, 63, 24),
        BlockKind::Grass,
    );

    for x in -24..=24 {
        if x == 5 {
            continue;
        }
        world.set_block(BlockPos::new(x, 64, 8), BlockKind::Stone);
        world.set_block(BlockPos::new(x, 65, 8), BlockKind::Stone);
    }
}
