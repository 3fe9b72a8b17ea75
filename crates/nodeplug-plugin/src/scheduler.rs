//! Scheduling primitives.
//!
//! All DOM-reactive work runs through a [`Scheduler`]: `defer` for "next
//! turn" reactions and `later` for grace periods and burst coalescing.
//! Scheduled tasks are never cancelled; they re-check state when they run.

use std::fmt;
use std::time::Duration;

use tokio::runtime::Handle;

use nodeplug_core::error::AppError;

/// A unit of scheduled work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on a later turn of the event loop.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Runs `task` after the current turn.
    fn defer(&self, task: Task);

    /// Runs `task` once `delay` has elapsed.
    fn later(&self, delay: Duration, task: Task);
}

/// [`Scheduler`] backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running on.
    pub fn try_current() -> Result<Self, AppError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| AppError::unavailable(format!("No tokio runtime available: {e}")))
    }
}

impl Scheduler for TokioScheduler {
    fn defer(&self, task: Task) {
        self.handle.spawn(async move {
            task();
        });
    }

    fn later(&self, delay: Duration, task: Task) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}
