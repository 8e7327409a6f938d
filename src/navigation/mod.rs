//! Navigation orchestration.
//!
//! This module provides:
//! - [`Navigator`], the goal-directed traversal and follow state machine
//! - Lifecycle events observers can subscribe to

mod events;
mod navigator;

pub use events::{EventBus, NavEvent};
pub use navigator::{NavState, Navigator, NavigatorConfig};
