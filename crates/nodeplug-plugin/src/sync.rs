//! Sync scheduling.
//!
//! Decides for each finalized event whether a plugin syncs now, after the
//! burst delay, or not at all:
//!
//! - render-prevented events, substrate mutation events and `*outside`
//!   events never sync (the lifecycle bridge owns mutations)
//! - events in the class's delayed set open (or join) a burst window; one
//!   sync runs when it closes
//! - everything else, IO completion included, syncs immediately
//!
//! Model writes sync on the next turn, coalesced, once the render gate has
//! passed.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use nodeplug_dom::Finalized;
use nodeplug_dom::event::is_mutation_event;

use crate::definition::PluginClass;
use crate::instance::{LifecycleState, PluginInstance};

/// What a finalized event asks of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    Ignore,
    Immediate,
    Delayed,
}

/// Classifies a finalized event for `class`.
pub fn classify(class: &PluginClass, finalized: &Finalized<'_>) -> SyncDecision {
    if finalized.render_prevented() {
        return SyncDecision::Ignore;
    }
    let event_type = finalized.event_type();
    match finalized {
        Finalized::Io => SyncDecision::Immediate,
        Finalized::Event(_) if is_mutation_event(event_type) || event_type.ends_with("outside") => {
            SyncDecision::Ignore
        }
        Finalized::Event(_) if class.is_delayed(event_type) => SyncDecision::Delayed,
        Finalized::Event(_) => SyncDecision::Immediate,
    }
}

#[derive(Debug, Default)]
pub(crate) struct SyncState {
    /// A model-triggered sync is queued for the next turn.
    model_pending: AtomicBool,
    /// Event types collected in the open burst window, if any.
    burst: Mutex<Option<Vec<String>>>,
    /// A sync was requested while one was running.
    rerun: AtomicBool,
}

impl PluginInstance {
    /// Flushes the model to attributes, then runs the `sync` hook.
    ///
    /// Does nothing before the render gate or after destruction. A sync
    /// requested from inside a running sync makes that sync run once more.
    pub fn sync(&self) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            match *state {
                LifecycleState::Rendered => *state = LifecycleState::Syncing,
                LifecycleState::Syncing => {
                    self.sync_state.rerun.store(true, Ordering::SeqCst);
                    return;
                }
                _ => return,
            }
        }

        loop {
            self.flush();
            self.class().behavior().sync(self);

            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *state != LifecycleState::Syncing {
                break;
            }
            if !self.sync_state.rerun.swap(false, Ordering::SeqCst) {
                *state = LifecycleState::Rendered;
                break;
            }
        }
    }

    pub(crate) fn on_finalized(&self, finalized: &Finalized<'_>) {
        if !self.is_ready() {
            return;
        }
        match classify(self.class(), finalized) {
            SyncDecision::Ignore => {}
            SyncDecision::Immediate => {
                trace!(
                    namespace = %self.namespace(),
                    event_type = finalized.event_type(),
                    "Finalizer refresh"
                );
                self.sync();
            }
            SyncDecision::Delayed => self.join_burst(finalized.event_type()),
        }
    }

    /// Queues a sync for the next turn. Ignored until the render gate passed.
    pub(crate) fn request_model_sync(&self) {
        if !self.is_ready() || self.sync_state.model_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.this.clone();
        self.scheduler.defer(Box::new(move || {
            if let Some(instance) = this.upgrade() {
                instance.sync_state.model_pending.store(false, Ordering::SeqCst);
                instance.sync();
            }
        }));
    }

    fn join_burst(&self, event_type: &str) {
        {
            let mut burst = self
                .sync_state
                .burst
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Some(events) = burst.as_mut() {
                events.push(event_type.to_string());
                return;
            }
            *burst = Some(vec![event_type.to_string()]);
        }

        let this = self.this.clone();
        self.scheduler.later(
            self.delayed_sync,
            Box::new(move || {
                let Some(instance) = this.upgrade() else {
                    return;
                };
                let events = instance
                    .sync_state
                    .burst
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .take()
                    .unwrap_or_default();
                debug!(
                    namespace = %instance.namespace(),
                    node = %instance.host_id(),
                    events = ?events,
                    "Delayed refresh"
                );
                instance.sync();
            }),
        );
    }
}
