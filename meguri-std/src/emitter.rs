//! String-keyed event emitter.
//!
//! Each context owns one emitter for platform events, and the application
//! owns one for lifecycle notifications. Listeners are registered under an
//! event name (`"message"`, `"message/normal"`, `"plugin"`, ...) and are all
//! notified when that exact name is emitted.

use futures::future::join_all;
use meguri_core::{BoxError, HookResult, Message, SharedHook, same_hook};
use std::sync::{PoisonError, RwLock};

struct Entry<E: Message> {
    event: String,
    hook: SharedHook<E>,
}

/// The outcome of one [`Emitter::emit`] call.
#[derive(Debug, Default)]
pub struct Emission {
    /// Number of listeners that were notified.
    pub delivered: usize,
    /// Errors returned by listeners, in registration order.
    pub failures: Vec<BoxError>,
}

impl Emission {
    /// Whether every listener succeeded.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A registry of listeners keyed by event name.
pub struct Emitter<E: Message> {
    entries: RwLock<Vec<Entry<E>>>,
}

impl<E: Message> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Message> Emitter<E> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener for `event`.
    pub fn on(&self, event: impl Into<String>, hook: SharedHook<E>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                event: event.into(),
                hook,
            });
    }

    /// Remove the first registration of `hook` under `event`.
    ///
    /// Returns whether a listener was removed.
    pub fn off(&self, event: &str, hook: &SharedHook<E>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries
            .iter()
            .position(|e| e.event == event && same_hook(&e.hook, hook))
        {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of listeners registered under `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.event == event)
            .count()
    }

    fn snapshot(&self, event: &str) -> Vec<SharedHook<E>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.event == event)
            .map(|e| e.hook.clone())
            .collect()
    }

    /// Notify every listener of `event` with `payload`.
    ///
    /// Listeners run concurrently and all of them are polled to completion;
    /// a `Stop` from one listener does not silence the others. The listener
    /// set is snapshot first, so registrations made while the emission is in
    /// flight take effect from the next emission on.
    pub async fn emit(&self, event: &str, payload: &E) -> Emission {
        let hooks = self.snapshot(event);
        if hooks.is_empty() {
            return Emission::default();
        }
        tracing::trace!(event, listeners = hooks.len(), "emitting");

        let results = join_all(hooks.iter().map(|hook| hook.on_event_dyn(payload))).await;
        let delivered = results.len();
        let failures = results
            .into_iter()
            .filter_map(|r: Result<HookResult, BoxError>| r.err())
            .collect();
        Emission {
            delivered,
            failures,
        }
    }
}
