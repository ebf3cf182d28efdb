//! Host activity guard
//!
//! Hosts that must keep the process awake while frames are handled (a wake lock on
//! mobile, an inhibitor on desktop) register an [`ActivityGuard`]. The client holds it
//! for the duration of each inbound frame and of close/error handling, through an
//! [`ActivityScope`] so every exit path releases it.

use std::sync::Arc;

/// Scoped resource held while the client processes inbound work
pub trait ActivityGuard: Send + Sync {
    fn acquire(&self);

    fn release(&self);

    fn is_held(&self) -> bool;
}

/// Guard that holds nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopActivityGuard;

impl ActivityGuard for NoopActivityGuard {
    fn acquire(&self) {}

    fn release(&self) {}

    fn is_held(&self) -> bool {
        false
    }
}

/// Release the guard only when it is currently held
pub fn release_if_held(guard: &dyn ActivityGuard) -> bool {
    if guard.is_held() {
        guard.release();
        true
    } else {
        false
    }
}

/// Holds a guard from `enter` until drop
pub struct ActivityScope {
    guard: Option<Arc<dyn ActivityGuard>>,
}

impl ActivityScope {
    pub fn enter(guard: Option<Arc<dyn ActivityGuard>>) -> Self {
        if let Some(guard) = &guard {
            guard.acquire();
        }
        Self { guard }
    }
}

impl Drop for ActivityScope {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            release_if_held(guard.as_ref());
        }
    }
}
