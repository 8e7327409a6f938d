//! Movement executor: advances the agent toward a single waypoint.
//!
//! The executor computes intent only; applying it is the actuator's job.
//! In the full system the actuator emits movement commands over the wire,
//! here the simulation actuator simply reaches the requested point. Each
//! step is a suspension point: the cancellation signal and the arrival
//! tolerance are checked before the next slice of progress.

use std::sync::Arc;
use std::time::Duration;

use crate::shared::{AgentState, CancelToken};
use crate::world::Vec3;

/// Outcome of one `move_toward` leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Ended within tolerance of the target
    Arrived,
    /// Cancelled, or the leg completed without reaching the target
    NotArrived,
}

/// Applies a requested movement step, returning the position actually
/// reached. The real implementation sends movement commands to the
/// controlled agent; [`DirectActuator`] models ideal actuation.
pub trait Actuator: Send + Sync {
    fn step_to(&self, desired: Vec3) -> Vec3;
}

/// Ideal actuation: every step lands exactly where requested.
pub struct DirectActuator;

impl Actuator for DirectActuator {
    fn step_to(&self, desired: Vec3) -> Vec3 {
        desired
    }
}

/// Configuration for the movement executor.
#[derive(Clone, Debug)]
pub struct MotionConfig {
    /// Target distance covered per step (world units)
    pub step_length: f32,
    /// Minimum number of steps per leg
    pub min_steps: u32,
    /// Travel time per world unit (milliseconds)
    pub travel_ms_per_unit: u64,
    /// Minimum total duration of a leg (milliseconds)
    pub min_duration_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_length: 0.5,
            min_steps: 4,
            travel_ms_per_unit: 120,
            min_duration_ms: 100,
        }
    }
}

/// Movement executor.
pub struct MotionController {
    config: MotionConfig,
    agent: Arc<AgentState>,
    actuator: Arc<dyn Actuator>,
}

impl MotionController {
    /// Create a new movement executor.
    pub fn new(config: MotionConfig, agent: Arc<AgentState>, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            config,
            agent,
            actuator,
        }
    }

    /// Advance the agent toward `target` until within `tolerance`.
    ///
    /// The leg is split into distance-proportional steps, coarser for
    /// longer legs but never fewer than the configured minimum, and never
    /// faster than the minimum leg duration. Cancellation reports
    /// `NotArrived` without error.
    pub fn move_toward(&self, target: Vec3, tolerance: f32, cancel: &CancelToken) -> MoveOutcome {
        let origin = self.agent.position();
        let total = origin.distance(&target);

        if total <= tolerance {
            return MoveOutcome::Arrived;
        }

        let steps = ((total / self.config.step_length).ceil() as u32).max(self.config.min_steps);
        let total_ms =
            ((total as f64 * self.config.travel_ms_per_unit as f64) as u64).max(self.config.min_duration_ms);
        let step_pause = Duration::from_millis((total_ms / steps as u64).max(1));

        tracing::debug!(
            "Leg to ({:.1}, {:.1}, {:.1}): {:.2} units, {} steps",
            target.x,
            target.y,
            target.z,
            total,
            steps
        );

        for step in 1..=steps {
            if cancel.is_cancelled() {
                return MoveOutcome::NotArrived;
            }
            if self.agent.position().distance(&target) <= tolerance {
                return MoveOutcome::Arrived;
            }

            std::thread::sleep(step_pause);

            let t = step as f32 / steps as f32;
            let desired = origin.lerp(&target, t);
            let reached = self.actuator.step_to(desired);
            self.agent.set_position(reached);
        }

        if self.agent.position().distance(&target) <= tolerance {
            MoveOutcome::Arrived
        } else {
            MoveOutcome::NotArrived
        }
    }
}
