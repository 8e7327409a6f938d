//! Navigation orchestrator.
//!
//! Owns the current path and drives the movement executor waypoint by
//! waypoint, replanning through the search engine when a waypoint proves
//! unreachable. Exactly one navigation activity runs per agent: starting a
//! new one supersedes the previous one through the activity guard's
//! generation counter and waits out its teardown before touching shared
//! state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::RwLock;

use crate::movement::{MotionController, MoveOutcome};
use crate::planning::PathFinder;
use crate::shared::{ActivityGuard, AgentState, CancelToken};
use crate::world::{EntityId, EntityRegistry, Vec3, WorldView};

use super::events::{EventBus, NavEvent};

/// Navigation activity currently owned by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavState {
    /// No activity
    Idle,
    /// Walking a path toward a fixed destination
    Traversing,
    /// Continuously re-navigating to stay near a moving entity
    Following,
}

/// Configuration for the navigator.
#[derive(Clone, Debug)]
pub struct NavigatorConfig {
    /// Arrival tolerance for the final goal
    pub default_tolerance: f32,
    /// Arrival tolerance for intermediate waypoints
    pub waypoint_tolerance: f32,
    /// Preferred distance to keep from a followed entity
    pub follow_distance: f32,
    /// Extra slack before following re-triggers navigation
    pub follow_margin: f32,
    /// Follow poll interval in milliseconds
    pub follow_poll_ms: u64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            default_tolerance: 0.5,
            waypoint_tolerance: 0.5,
            follow_distance: 3.0,
            follow_margin: 2.0,
            follow_poll_ms: 500,
        }
    }
}

/// How one traversal ended.
enum Traversal {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Clone, Copy, Debug)]
struct NavStatus {
    state: NavState,
    target: Option<Vec3>,
    remaining: usize,
}

impl Default for NavStatus {
    fn default() -> Self {
        Self {
            state: NavState::Idle,
            target: None,
            remaining: 0,
        }
    }
}

/// Navigation orchestrator for one controlled agent.
pub struct Navigator<W: WorldView> {
    config: NavigatorConfig,
    agent: Arc<AgentState>,
    finder: Arc<PathFinder<W>>,
    motion: MotionController,
    entities: Arc<EntityRegistry>,
    guard: Arc<ActivityGuard>,
    events: EventBus,
    status: RwLock<NavStatus>,
}

impl<W: WorldView> Navigator<W> {
    /// Create a navigator over the given collaborators.
    pub fn new(
        config: NavigatorConfig,
        agent: Arc<AgentState>,
        finder: Arc<PathFinder<W>>,
        motion: MotionController,
        entities: Arc<EntityRegistry>,
    ) -> Self {
        Self {
            config,
            agent,
            finder,
            motion,
            entities,
            guard: Arc::new(ActivityGuard::new()),
            events: EventBus::new(),
            status: RwLock::new(NavStatus::default()),
        }
    }

    /// Subscribe to navigation lifecycle events.
    pub fn subscribe(&self) -> Receiver<NavEvent> {
        self.events.subscribe()
    }

    /// Current navigation activity.
    pub fn state(&self) -> NavState {
        self.status.read().state
    }

    /// Whether any navigation activity is in flight.
    pub fn is_navigating(&self) -> bool {
        self.status.read().state != NavState::Idle
    }

    /// Destination of the current activity, if any.
    pub fn current_target(&self) -> Option<Vec3> {
        self.status.read().target
    }

    /// Waypoints left on the current path.
    pub fn remaining_waypoints(&self) -> usize {
        self.status.read().remaining
    }

    /// The agent's published position.
    pub fn position(&self) -> Vec3 {
        self.agent.position()
    }

    /// Navigate to a destination, superseding any in-flight activity.
    ///
    /// Returns `true` once the agent is within `tolerance` of the
    /// destination. Search failure, an aborted traversal, and cancellation
    /// all return `false`; only the first two emit a failure event.
    pub fn navigate_to(&self, destination: Vec3, tolerance: f32) -> bool {
        let token = ActivityGuard::begin(&self.guard);
        if token.is_cancelled() {
            self.guard.release(&token);
            return false;
        }

        if self.agent.position().distance(&destination) <= tolerance {
            tracing::debug!(
                "Already within {:.2} of ({:.1}, {:.1}, {:.1})",
                tolerance,
                destination.x,
                destination.y,
                destination.z
            );
            self.finish(&token);
            return true;
        }

        let outcome = self.run_traversal(destination, tolerance, NavState::Traversing, &token);
        self.finish(&token);
        matches!(outcome, Traversal::Completed)
    }

    /// Navigate with the configured default tolerance.
    pub fn navigate_to_default(&self, destination: Vec3) -> bool {
        self.navigate_to(destination, self.config.default_tolerance)
    }

    /// Keep within `distance` of a moving entity until stopped.
    ///
    /// Polls the entity's position on the configured interval and, whenever
    /// the gap exceeds `distance` plus the configured margin, navigates to
    /// a point offset from the entity by `distance` along the line between
    /// agent and entity. Following has no success condition of its own:
    /// the call returns `false` once it ends, whether cancelled or the
    /// target disappeared.
    pub fn follow_entity(&self, id: EntityId, distance: f32) -> bool {
        let token = ActivityGuard::begin(&self.guard);
        if token.is_cancelled() {
            self.guard.release(&token);
            return false;
        }

        {
            let mut status = self.status.write();
            status.state = NavState::Following;
            status.target = None;
            status.remaining = 0;
        }
        tracing::info!("Following entity {} at {:.1} units", id.0, distance);

        let poll = Duration::from_millis(self.config.follow_poll_ms);
        let trigger = distance + self.config.follow_margin;

        loop {
            if token.is_cancelled() {
                break;
            }

            let Some(entity_pos) = self.entities.position(id) else {
                tracing::info!("Followed entity {} disappeared, ending follow", id.0);
                break;
            };

            let agent_pos = self.agent.position();
            let gap = agent_pos.distance(&entity_pos);

            if gap > trigger {
                let approach = approach_point(agent_pos, entity_pos, distance);
                tracing::debug!("Closing on entity {}: gap {:.1}", id.0, gap);
                // A failed leg is tolerated; the next poll re-evaluates
                let _ = self.run_traversal(
                    approach,
                    self.config.default_tolerance,
                    NavState::Following,
                    &token,
                );
            }

            token.sleep_cancellable(poll);
        }

        self.finish(&token);
        false
    }

    /// Follow with the configured default distance.
    pub fn follow_entity_default(&self, id: EntityId) -> bool {
        self.follow_entity(id, self.config.follow_distance)
    }

    /// Cancel any in-flight activity, wait out its teardown, and return to
    /// idle with no target and an empty path.
    pub fn stop_navigation(&self) {
        self.guard.cancel_all();
        self.guard.wait_idle();
        self.set_idle();
        tracing::debug!("Navigation stopped");
    }

    /// Walk one path to `destination`, replanning once per consecutive
    /// waypoint failure.
    fn run_traversal(
        &self,
        destination: Vec3,
        tolerance: f32,
        state: NavState,
        token: &CancelToken,
    ) -> Traversal {
        let origin = self.agent.position();
        let Some(path) = self.finder.find_path(origin, destination) else {
            tracing::warn!(
                "No path to ({:.1}, {:.1}, {:.1})",
                destination.x,
                destination.y,
                destination.z
            );
            self.events.emit(NavEvent::PathFailed);
            return Traversal::Failed;
        };

        tracing::info!(
            "Path adopted: {} waypoints, {:.1} units",
            path.waypoints.len(),
            path.length
        );
        let mut queue: VecDeque<Vec3> = path.waypoints.into_iter().collect();
        self.drop_trivial_head(&mut queue);
        {
            let mut status = self.status.write();
            status.state = state;
            status.target = Some(destination);
            status.remaining = queue.len();
        }
        self.events.emit(NavEvent::PathStarted { destination });

        let mut failed_streak = 0u32;

        while let Some(waypoint) = queue.front().copied() {
            if token.is_cancelled() {
                return Traversal::Cancelled;
            }

            let leg_tolerance = if queue.len() == 1 {
                tolerance
            } else {
                self.config.waypoint_tolerance
            };

            match self.motion.move_toward(waypoint, leg_tolerance, token) {
                MoveOutcome::Arrived => {
                    queue.pop_front();
                    failed_streak = 0;
                    self.status.write().remaining = queue.len();
                    self.events.emit(NavEvent::WaypointReached { waypoint });
                }
                MoveOutcome::NotArrived => {
                    if token.is_cancelled() {
                        return Traversal::Cancelled;
                    }

                    failed_streak += 1;
                    if failed_streak > 1 {
                        tracing::warn!("Waypoint unreachable again after replan, aborting");
                        self.events.emit(NavEvent::PathFailed);
                        return Traversal::Failed;
                    }

                    tracing::warn!("Waypoint unreachable, replanning from current position");
                    match self.finder.find_path(self.agent.position(), destination) {
                        Some(replanned) => {
                            queue = replanned.waypoints.into_iter().collect();
                            self.drop_trivial_head(&mut queue);
                            self.status.write().remaining = queue.len();
                        }
                        None => {
                            self.events.emit(NavEvent::PathFailed);
                            return Traversal::Failed;
                        }
                    }
                }
            }
        }

        self.events.emit(NavEvent::PathCompleted { destination });
        Traversal::Completed
    }

    /// The search seeds every path with the agent's own cell. Skip that
    /// head waypoint: its instant arrival is not progress and must not
    /// reset the consecutive-failure streak after a replan.
    fn drop_trivial_head(&self, queue: &mut VecDeque<Vec3>) {
        if queue.len() > 1
            && queue
                .front()
                .is_some_and(|wp| self.agent.position().distance(wp) <= self.config.waypoint_tolerance)
        {
            queue.pop_front();
        }
    }

    /// End an activity: a superseded activity leaves status to its
    /// successor, a naturally-ending one resets to idle.
    fn finish(&self, token: &CancelToken) {
        if !token.is_cancelled() {
            self.set_idle();
        }
        self.guard.release(token);
    }

    fn set_idle(&self) {
        let mut status = self.status.write();
        status.state = NavState::Idle;
        status.target = None;
        status.remaining = 0;
    }
}

/// Point offset from the entity by `distance` back along the line toward
/// the agent.
fn approach_point(agent: Vec3, entity: Vec3, distance: f32) -> Vec3 {
    let gap = agent.distance(&entity);
    if gap <= f32::EPSILON {
        return entity;
    }
    entity + (agent - entity).normalize() * distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{Actuator, DirectActuator, MotionConfig};
    use crate::planning::AStarConfig;
    use crate::world::{BlockKind, BlockPos, VoxelWorld};

    fn fast_motion() -> MotionConfig {
        MotionConfig {
            step_length: 0.5,
            min_steps: 2,
            travel_ms_per_unit: 1,
            min_duration_ms: 1,
        }
    }

    fn test_config() -> NavigatorConfig {
        NavigatorConfig {
            follow_poll_ms: 20,
            ..Default::default()
        }
    }

    fn flat_world(radius: i32) -> Arc<VoxelWorld> {
        let world = VoxelWorld::new();
        world.fill(
            BlockPos::new(-radius, 63, -radius),
            BlockPos::new(radius, 63, radius),
            BlockKind::Grass,
        );
        Arc::new(world)
    }

    fn build_navigator(
        world: Arc<VoxelWorld>,
        start: Vec3,
        motion: MotionConfig,
        actuator: Arc<dyn Actuator>,
    ) -> (Arc<Navigator<VoxelWorld>>, Arc<EntityRegistry>) {
        let agent = Arc::new(AgentState::new(start));
        let finder = Arc::new(PathFinder::new(world, AStarConfig::default()));
        let entities = Arc::new(EntityRegistry::new());
        let controller = MotionController::new(motion, Arc::clone(&agent), actuator);
        let navigator = Arc::new(Navigator::new(
            test_config(),
            agent,
            finder,
            controller,
            Arc::clone(&entities),
        ));
        (navigator, entities)
    }

    /// Actuation that refuses to move.
    struct StuckActuator {
        at: Vec3,
    }

    impl Actuator for StuckActuator {
        fn step_to(&self, _desired: Vec3) -> Vec3 {
            self.at
        }
    }

    #[test]
    fn test_navigate_completes_and_returns_idle() {
        let world = flat_world(20);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let (navigator, _) =
            build_navigator(world, start, fast_motion(), Arc::new(DirectActuator));
        let events = navigator.subscribe();

        let goal = Vec3::new(8.5, 64.0, 8.5);
        assert!(navigator.navigate_to_default(goal));

        assert_eq!(navigator.state(), NavState::Idle);
        assert!(!navigator.is_navigating());
        assert_eq!(navigator.remaining_waypoints(), 0);
        assert!(navigator.current_target().is_none());
        assert!(navigator.position().distance(&goal) <= 0.5);

        let collected: Vec<NavEvent> = events.try_iter().collect();
        assert!(matches!(collected.first(), Some(NavEvent::PathStarted { .. })));
        assert!(matches!(collected.last(), Some(NavEvent::PathCompleted { .. })));
        assert!(!collected.contains(&NavEvent::PathFailed));
    }

    #[test]
    fn test_already_at_destination_skips_search() {
        let world = flat_world(5);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let (navigator, _) =
            build_navigator(world, start, fast_motion(), Arc::new(DirectActuator));
        let events = navigator.subscribe();

        assert!(navigator.navigate_to(Vec3::new(0.7, 64.0, 0.5), 0.5));

        // No search ran and no events fired
        assert_eq!(events.try_iter().count(), 0);
        assert_eq!(navigator.state(), NavState::Idle);
    }

    #[test]
    fn test_unreachable_goal_fails_with_event() {
        let world = flat_world(8);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let (navigator, _) =
            build_navigator(world, start, fast_motion(), Arc::new(DirectActuator));
        let events = navigator.subscribe();

        // Nothing to stand on up there
        assert!(!navigator.navigate_to_default(Vec3::new(0.5, 90.0, 0.5)));

        let collected: Vec<NavEvent> = events.try_iter().collect();
        assert_eq!(collected, vec![NavEvent::PathFailed]);
        assert_eq!(navigator.state(), NavState::Idle);
    }

    #[test]
    fn test_stop_cancels_in_flight_navigation() {
        let world = flat_world(24);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let slow = MotionConfig {
            step_length: 0.25,
            min_steps: 4,
            travel_ms_per_unit: 60,
            min_duration_ms: 200,
        };
        let (navigator, _) = build_navigator(world, start, slow, Arc::new(DirectActuator));
        let events = navigator.subscribe();

        let worker = Arc::clone(&navigator);
        let handle =
            std::thread::spawn(move || worker.navigate_to_default(Vec3::new(20.5, 64.0, 20.5)));

        std::thread::sleep(Duration::from_millis(80));
        navigator.stop_navigation();

        // Cancellation is a non-success, non-failure outcome
        assert!(!handle.join().unwrap());
        assert_eq!(navigator.state(), NavState::Idle);
        assert!(navigator.current_target().is_none());
        assert_eq!(navigator.remaining_waypoints(), 0);

        let collected: Vec<NavEvent> = events.try_iter().collect();
        assert!(!collected.contains(&NavEvent::PathFailed));
    }

    #[test]
    fn test_stuck_agent_replans_once_then_aborts() {
        let world = flat_world(12);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let (navigator, _) = build_navigator(
            world,
            start,
            fast_motion(),
            Arc::new(StuckActuator { at: start }),
        );
        let events = navigator.subscribe();

        assert!(!navigator.navigate_to_default(Vec3::new(8.5, 64.0, 0.5)));

        let collected: Vec<NavEvent> = events.try_iter().collect();
        // Started once, then aborted after the single replan also stalled
        assert!(matches!(collected.first(), Some(NavEvent::PathStarted { .. })));
        assert_eq!(collected.last(), Some(&NavEvent::PathFailed));
        assert!(!collected.contains(&NavEvent::PathCompleted {
            destination: Vec3::new(8.5, 64.0, 0.5)
        }));
        assert_eq!(navigator.state(), NavState::Idle);
    }

    #[test]
    fn test_new_request_supersedes_previous() {
        let world = flat_world(24);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let slow = MotionConfig {
            step_length: 0.25,
            min_steps: 4,
            travel_ms_per_unit: 40,
            min_duration_ms: 200,
        };
        let (navigator, _) = build_navigator(world, start, slow, Arc::new(DirectActuator));

        let worker = Arc::clone(&navigator);
        let first =
            std::thread::spawn(move || worker.navigate_to_default(Vec3::new(20.5, 64.0, 0.5)));

        std::thread::sleep(Duration::from_millis(60));

        // The second request cancels and replaces the first
        let second = navigator.navigate_to(Vec3::new(2.5, 64.0, 0.5), 1.0);
        assert!(second);
        assert!(!first.join().unwrap());
        assert_eq!(navigator.state(), NavState::Idle);
    }

    #[test]
    fn test_follow_in_range_never_navigates() {
        let world = flat_world(10);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let (navigator, entities) =
            build_navigator(world, start, fast_motion(), Arc::new(DirectActuator));
        let events = navigator.subscribe();

        // Stationary target well inside follow range
        let target = EntityId(9);
        entities.upsert(target, Vec3::new(2.5, 64.0, 0.5));

        let worker = Arc::clone(&navigator);
        let handle = std::thread::spawn(move || worker.follow_entity(target, 3.0));

        // Let several polls elapse
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(navigator.state(), NavState::Following);
        navigator.stop_navigation();
        assert!(!handle.join().unwrap());

        assert_eq!(events.try_iter().count(), 0);
        assert_eq!(navigator.state(), NavState::Idle);
    }

    #[test]
    fn test_follow_closes_gap_to_distant_entity() {
        let world = flat_world(20);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let (navigator, entities) =
            build_navigator(world, start, fast_motion(), Arc::new(DirectActuator));
        let events = navigator.subscribe();

        let target = EntityId(3);
        let entity_pos = Vec3::new(12.5, 64.0, 0.5);
        entities.upsert(target, entity_pos);

        let worker = Arc::clone(&navigator);
        let handle = std::thread::spawn(move || worker.follow_entity(target, 3.0));

        std::thread::sleep(Duration::from_millis(300));
        navigator.stop_navigation();
        assert!(!handle.join().unwrap());

        // It navigated, and ended up near the offset approach point
        let collected: Vec<NavEvent> = events.try_iter().collect();
        assert!(collected.iter().any(|e| matches!(e, NavEvent::PathStarted { .. })));
        let final_gap = navigator.position().distance(&entity_pos);
        assert!(final_gap < 12.0, "agent should have closed in, gap {final_gap}");
    }

    #[test]
    fn test_follow_ends_when_target_lost() {
        let world = flat_world(10);
        let start = Vec3::new(0.5, 64.0, 0.5);
        let (navigator, entities) =
            build_navigator(world, start, fast_motion(), Arc::new(DirectActuator));

        let target = EntityId(5);
        entities.upsert(target, Vec3::new(1.5, 64.0, 0.5));

        let worker = Arc::clone(&navigator);
        let handle = std::thread::spawn(move || worker.follow_entity(target, 3.0));

        std::thread::sleep(Duration::from_millis(60));
        entities.remove(target);

        // The follow loop notices on its next poll and winds down by itself
        assert!(!handle.join().unwrap());
        assert_eq!(navigator.state(), NavState::Idle);
    }

    #[test]
    fn test_approach_point_offsets_along_line() {
        let agent = Vec3::new(10.0, 64.0, 0.0);
        let entity = Vec3::new(0.0, 64.0, 0.0);

        let approach = approach_point(agent, entity, 3.0);
        assert!((approach.x - 3.0).abs() < 1e-5);
        assert!((approach.z - 0.0).abs() < 1e-5);

        // Degenerate zero gap falls back to the entity position
        let on_top = approach_point(entity, entity, 3.0);
        assert!((on_top.x - entity.x).abs() < 1e-6);
    }
}
