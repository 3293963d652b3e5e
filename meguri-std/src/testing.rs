//! Testing utilities for Meguri.
//!
//! - [`RecordingHook`]: a hook that records every event it receives
//! - [`FailingHook`]: a hook that always returns an error
//! - [`CountingHandler`]: a handler that counts invocations

use meguri_core::{BoxError, Handler, Hook, HookResult, Message};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Recording Hook
// ============================================================================

/// A hook that records all events it receives.
///
/// Clones share the same record, so keep one clone for assertions and
/// register the other.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHook::<Meta>::new();
/// ctx.on("message", shared(recorder.clone()));
///
/// app.receive(meta).await;
/// assert_eq!(recorder.count(), 1);
/// ```
pub struct RecordingHook<E: Clone> {
    events: Arc<Mutex<Vec<E>>>,
    result: HookResult,
}

impl<E: Clone> RecordingHook<E> {
    /// Create a new recording hook that returns `Next`.
    pub fn new() -> Self {
        Self::with_result(HookResult::Next)
    }

    /// Create a recording hook that returns a specific result.
    pub fn with_result(result: HookResult) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<E> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<E: Clone> Default for RecordingHook<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Clone for RecordingHook<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            result: self.result,
        }
    }
}

impl<E: Message + Clone> Hook<E> for RecordingHook<E> {
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(self.result)
    }
}

// ============================================================================
// Failing Hook
// ============================================================================

/// A hook that fails every event with a fixed message.
#[derive(Clone)]
pub struct FailingHook {
    message: String,
}

impl FailingHook {
    /// Create a hook failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<E: Message> Hook<E> for FailingHook {
    async fn on_event(&self, _event: &E) -> Result<HookResult, BoxError> {
        Err(self.message.clone().into())
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts invocations and always succeeds.
#[derive(Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    /// Create a new counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl<E: Message> Handler<E> for CountingHandler {
    type Output = Result<(), BoxError>;

    async fn call(&self, _input: E) -> Self::Output {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
