//! Shared state between the navigator, the movement executor, and callers.
//!
//! The agent's published position is lock-free; activity ownership is a
//! generation counter so a new navigation request supersedes the previous
//! one without ever holding a blocking lock across it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crate::world::Vec3;

/// Atomic wrapper for f32 values.
/// Uses AtomicU32 with bit reinterpretation.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    pub fn store(&self, val: f32, order: Ordering) {
        self.0.store(val.to_bits(), order);
    }
}

/// Atomic wrapper for a world position.
/// Packs x and y into one u64 for mostly-coherent lock-free access.
#[derive(Debug)]
pub struct AtomicVec3 {
    xy: AtomicU64,
    z: AtomicF32,
}

impl AtomicVec3 {
    pub fn new(v: Vec3) -> Self {
        Self {
            xy: AtomicU64::new(pack_xy(v.x, v.y)),
            z: AtomicF32::new(v.z),
        }
    }

    pub fn load(&self, order: Ordering) -> Vec3 {
        let xy = self.xy.load(order);
        let (x, y) = unpack_xy(xy);
        Vec3::new(x, y, self.z.load(order))
    }

    pub fn store(&self, v: Vec3, order: Ordering) {
        self.xy.store(pack_xy(v.x, v.y), order);
        self.z.store(v.z, order);
    }
}

#[inline]
fn pack_xy(x: f32, y: f32) -> u64 {
    ((x.to_bits() as u64) << 32) | y.to_bits() as u64
}

#[inline]
fn unpack_xy(packed: u64) -> (f32, f32) {
    (
        f32::from_bits((packed >> 32) as u32),
        f32::from_bits(packed as u32),
    )
}

/// Published state of the controlled agent.
///
/// Written by the movement executor, read by the navigator and any caller.
#[derive(Debug)]
pub struct AgentState {
    position: AtomicVec3,
}

impl AgentState {
    /// Create agent state with an initial position.
    pub fn new(position: Vec3) -> Self {
        Self {
            position: AtomicVec3::new(position),
        }
    }

    /// Current published position.
    pub fn position(&self) -> Vec3 {
        self.position.load(Ordering::Acquire)
    }

    /// Publish an updated position (called by the movement executor).
    pub fn set_position(&self, position: Vec3) {
        self.position.store(position, Ordering::Release);
    }
}

/// Single-owner activity control.
///
/// Exactly one navigation activity may run at a time. Starting a new one
/// bumps the generation, which every in-flight activity observes as
/// cancellation at its next suspension point; the newcomer then waits for
/// the previous owner to acknowledge teardown before taking ownership.
#[derive(Debug)]
pub struct ActivityGuard {
    generation: AtomicU64,
    /// Generation currently holding ownership, 0 when idle
    owner: AtomicU64,
}

/// Poll interval while waiting for a superseded activity to wind down.
const TEARDOWN_POLL: Duration = Duration::from_millis(2);

impl ActivityGuard {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            owner: AtomicU64::new(0),
        }
    }

    /// Supersede any in-flight activity and take ownership.
    ///
    /// Returns a token for the new activity. If yet another request
    /// supersedes us while we wait for teardown, the returned token is
    /// already cancelled; the caller notices at its first check and backs
    /// out without ever having owned the guard.
    pub fn begin(guard: &Arc<Self>) -> CancelToken {
        let generation = guard.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let token = CancelToken {
            guard: Arc::clone(guard),
            generation,
        };

        loop {
            if guard.generation.load(Ordering::Acquire) != generation {
                // Superseded while waiting; hand back the cancelled token
                return token;
            }
            if guard
                .owner
                .compare_exchange(0, generation, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return token;
            }
            std::thread::sleep(TEARDOWN_POLL);
        }
    }

    /// Acknowledge teardown of an activity. Only the current owner's
    /// release clears the flag; a superseded token's release is a no-op.
    pub fn release(&self, token: &CancelToken) {
        let _ = self
            .owner
            .compare_exchange(token.generation, 0, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Cancel whatever is running without starting anything new.
    pub fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Block until the current activity has acknowledged teardown.
    pub fn wait_idle(&self) {
        while self.owner.load(Ordering::Acquire) != 0 {
            std::thread::sleep(TEARDOWN_POLL);
        }
    }

    /// Whether any activity currently owns the guard.
    pub fn is_idle(&self) -> bool {
        self.owner.load(Ordering::Acquire) == 0
    }
}

impl Default for ActivityGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation token for one navigation activity.
///
/// Checked at every suspension point and at the top of the per-waypoint
/// loop; there is no preemptive interruption.
#[derive(Clone, Debug)]
pub struct CancelToken {
    guard: Arc<ActivityGuard>,
    generation: u64,
}

impl CancelToken {
    /// Whether this activity has been superseded or stopped.
    pub fn is_cancelled(&self) -> bool {
        self.guard.generation.load(Ordering::Acquire) != self.generation
    }

    /// Sleep in short slices, returning early once cancelled.
    pub fn sleep_cancellable(&self, duration: Duration) {
        let slice = Duration::from_millis(20);
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return;
            }
            let nap = remaining.min(slice);
            std::thread::sleep(nap);
            remaining = remaining.saturating_sub(nap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_vec3_roundtrip() {
        let v = AtomicVec3::new(Vec3::new(1.5, -64.25, 3.75));
        let loaded = v.load(Ordering::Acquire);
        assert!((loaded.x - 1.5).abs() < 1e-6);
        assert!((loaded.y + 64.25).abs() < 1e-6);
        assert!((loaded.z - 3.75).abs() < 1e-6);

        v.store(Vec3::new(-0.5, 0.0, 100.0), Ordering::Release);
        let loaded = v.load(Ordering::Acquire);
        assert!((loaded.x + 0.5).abs() < 1e-6);
        assert!((loaded.z - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_begin_cancels_previous() {
        let guard = Arc::new(ActivityGuard::new());

        let first = ActivityGuard::begin(&guard);
        assert!(!first.is_cancelled());
        assert!(!guard.is_idle());

        // The previous owner winds down on its own thread
        let release_guard = Arc::clone(&guard);
        let release_token = first.clone();
        let handle = std::thread::spawn(move || {
            while !release_token.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            release_guard.release(&release_token);
        });

        let second = ActivityGuard::begin(&guard);
        handle.join().unwrap();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        guard.release(&second);
        assert!(guard.is_idle());
    }

    #[test]
    fn test_stale_release_is_noop() {
        let guard = Arc::new(ActivityGuard::new());
        let first = ActivityGuard::begin(&guard);
        guard.release(&first);

        let second = ActivityGuard::begin(&guard);
        // Releasing the stale token must not clear the new owner
        guard.release(&first);
        assert!(!guard.is_idle());

        guard.release(&second);
        assert!(guard.is_idle());
    }

    #[test]
    fn test_cancel_all_then_wait() {
        let guard = Arc::new(ActivityGuard::new());
        let token = ActivityGuard::begin(&guard);

        let worker_guard = Arc::clone(&guard);
        let worker_token = token.clone();
        let handle = std::thread::spawn(move || {
            worker_token.sleep_cancellable(Duration::from_secs(10));
            worker_guard.release(&worker_token);
        });

        guard.cancel_all();
        guard.wait_idle();
        handle.join().unwrap();
        assert!(token.is_cancelled());
        assert!(guard.is_idle());
    }
}
