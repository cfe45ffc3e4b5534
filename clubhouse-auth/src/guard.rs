//! CancellationGuard — liveness flag invalidated exactly once, at teardown
//!
//! In-flight work cannot be aborted (a lookup already on the wire will
//! finish), so every asynchronous continuation that would touch session
//! state checks [`LivenessToken::is_live`] right before mutating and drops
//! its result otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::debug;

/// Owner of the liveness flag. Held by the synchronizer only.
#[derive(Debug)]
pub struct CancellationGuard {
    live: Arc<AtomicBool>,
}

impl CancellationGuard {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Flip the flag to dead. Returns `true` only for the call that did it.
    pub fn invalidate(&self) -> bool {
        let was_live = self.live.swap(false, Ordering::AcqRel);
        if was_live {
            debug!("Liveness guard invalidated");
        }
        was_live
    }

    /// Weak view handed to callbacks and spawned tasks
    pub fn token(&self) -> LivenessToken {
        LivenessToken {
            live: Arc::downgrade(&self.live),
        }
    }
}

impl Default for CancellationGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning view of a [`CancellationGuard`]
///
/// Reports dead once the guard is invalidated or dropped.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    live: Weak<AtomicBool>,
}

impl LivenessToken {
    pub fn is_live(&self) -> bool {
        self.live
            .upgrade()
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }
}
