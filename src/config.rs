//! Configuration loading for MargaNav

use crate::error::Result;
use crate::movement::MotionConfig;
use crate::navigation::NavigatorConfig;
use crate::planning::AStarConfig;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct MargaConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// Path search settings
#[derive(Clone, Debug, Deserialize)]
pub struct SearchConfig {
    /// Maximum node expansions per search (default: 10000)
    #[serde(default = "default_node_budget")]
    pub node_budget: usize,

    /// Distance from the goal at which a search succeeds (default: 1.0)
    #[serde(default = "default_goal_radius")]
    pub goal_radius: f32,
}

/// Movement executor settings
#[derive(Clone, Debug, Deserialize)]
pub struct MovementConfig {
    /// Target distance covered per step (world units, default: 0.5)
    #[serde(default = "default_step_length")]
    pub step_length: f32,

    /// Minimum number of steps per leg (default: 4)
    #[serde(default = "default_min_steps")]
    pub min_steps: u32,

    /// Travel time per world unit in milliseconds (default: 120)
    #[serde(default = "default_travel_ms_per_unit")]
    pub travel_ms_per_unit: u64,

    /// Minimum total duration of a leg in milliseconds (default: 100)
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,
}

/// Navigation orchestration settings
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Arrival tolerance for the final goal (default: 0.5)
    #[serde(default = "default_tolerance")]
    pub default_tolerance: f32,

    /// Arrival tolerance for intermediate waypoints (default: 0.5)
    #[serde(default = "default_waypoint_tolerance")]
    pub waypoint_tolerance: f32,

    /// Preferred distance to keep from a followed entity (default: 3.0)
    #[serde(default = "default_follow_distance")]
    pub follow_distance: f32,

    /// Extra slack before following re-triggers navigation (default: 2.0)
    #[serde(default = "default_follow_margin")]
    pub follow_margin: f32,

    /// Follow poll interval in milliseconds, 500-1000 (default: 500)
    #[serde(default = "default_follow_poll_ms")]
    pub follow_poll_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            node_budget: default_node_budget(),
            goal_radius: default_goal_radius(),
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            step_length: default_step_length(),
            min_steps: default_min_steps(),
            travel_ms_per_unit: default_travel_ms_per_unit(),
            min_duration_ms: default_min_duration_ms(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            default_tolerance: default_tolerance(),
            waypoint_tolerance: default_waypoint_tolerance(),
            follow_distance: default_follow_distance(),
            follow_margin: default_follow_margin(),
            follow_poll_ms: default_follow_poll_ms(),
        }
    }
}

// Default value functions
fn default_node_budget() -> usize {
    10_000
}
fn default_goal_radius() -> f32 {
    1.0
}
fn default_step_length() -> f32 {
    0.5
}
fn default_min_steps() -> u32 {
    4
}
fn default_travel_ms_per_unit() -> u64 {
    120
}
fn default_min_duration_ms() -> u64 {
    100
}
fn default_tolerance() -> f32 {
    0.5
}
fn default_waypoint_tolerance() -> f32 {
    0.5
}
fn default_follow_distance() -> f32 {
    3.0
}
fn default_follow_margin() -> f32 {
    2.0
}
fn default_follow_poll_ms() -> u64 {
    500
}

impl Default for MargaConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            movement: MovementConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }
}

impl MargaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MargaConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search engine configuration derived from the loaded settings.
    pub fn astar(&self) -> AStarConfig {
        AStarConfig {
            node_budget: self.search.node_budget,
            goal_radius: self.search.goal_radius,
            ..Default::default()
        }
    }

    /// Movement executor configuration derived from the loaded settings.
    pub fn motion(&self) -> MotionConfig {
        MotionConfig {
            step_length: self.movement.step_length,
            min_steps: self.movement.min_steps,
            travel_ms_per_unit: self.movement.travel_ms_per_unit,
            min_duration_ms: self.movement.min_duration_ms,
        }
    }

    /// Navigator configuration derived from the loaded settings.
    pub fn navigator(&self) -> NavigatorConfig {
        NavigatorConfig {
            default_tolerance: self.navigation.default_tolerance,
            waypoint_tolerance: self.navigation.waypoint_tolerance,
            follow_distance: self.navigation.follow_distance,
            follow_margin: self.navigation.follow_margin,
            follow_poll_ms: self.navigation.follow_poll_ms,
        }
    }
}
