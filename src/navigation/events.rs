//! Navigation lifecycle events.
//!
//! The navigator is the single producer; any number of observers may
//! subscribe. Events flow one way — a consumer can never reach back into
//! navigator state.

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::world::Vec3;

/// Lifecycle event emitted by the navigator.
#[derive(Clone, Debug, PartialEq)]
pub enum NavEvent {
    /// A path was adopted and traversal began
    PathStarted { destination: Vec3 },
    /// One waypoint of the current path was reached
    WaypointReached { waypoint: Vec3 },
    /// The full path was traversed
    PathCompleted { destination: Vec3 },
    /// Search failed, or traversal was aborted after replanning failed
    PathFailed,
}

/// Single-producer, multi-consumer event fan-out.
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<NavEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> Receiver<NavEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live observer, pruning dropped ones.
    pub fn emit(&self, event: NavEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
