//! # Listener Kernel (Hook)
//!
//! The lowest-level unit of event processing in Meguri.
//!
//! Context listeners, middleware and the application's lifecycle receiver
//! all store hooks. A hook receives a borrowed event and answers whether
//! processing should continue (`Next`) or end here (`Stop`). Emitters ignore
//! the answer and always notify every listener; middleware chains honour it.

use crate::{error::BoxError, message::Message};
use std::{future::Future, pin::Pin, sync::Arc};

/// Result of hook execution indicating whether to continue or stop propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// The event was observed or partially handled; continue to the next hook.
    Next,
    /// The event was fully handled; stop propagation to subsequent hooks.
    Stop,
}

/// The primitive kernel for event processing.
///
/// This trait uses native `async fn` for static dispatch. Registries that
/// need to store heterogeneous hooks hold them as [`SharedHook`], which is
/// built on [`DynHook`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Hook<{E}>`",
    label = "missing `Hook` implementation",
    note = "Hooks must implement `on_event` for the specific event type `{E}`."
)]
pub trait Hook<E: Message>: Send + Sync + 'static {
    /// Called when an event is delivered.
    fn on_event(&self, event: &E) -> impl Future<Output = Result<HookResult, BoxError>> + Send;
}

/// Dynamic object-safe version of [`Hook`].
pub trait DynHook<E: Message>: Send + Sync + 'static {
    /// Called when an event is delivered (dynamic dispatch version).
    fn on_event_dyn<'a>(
        &'a self,
        event: &'a E,
    ) -> Pin<Box<dyn Future<Output = Result<HookResult, BoxError>> + Send + 'a>>;
}

impl<E: Message, T: Hook<E>> DynHook<E> for T {
    fn on_event_dyn<'a>(
        &'a self,
        event: &'a E,
    ) -> Pin<Box<dyn Future<Output = Result<HookResult, BoxError>> + Send + 'a>> {
        Box::pin(self.on_event(event))
    }
}

/// A reference-counted, type-erased hook.
///
/// Identity matters: middleware removal compares these by pointer.
pub type SharedHook<E> = Arc<dyn DynHook<E>>;

/// Wrap a hook for storage in a registry.
pub fn shared<E: Message, H: Hook<E>>(hook: H) -> SharedHook<E> {
    Arc::new(hook)
}

/// Whether two shared hooks are the same registration.
pub fn same_hook<E: Message>(a: &SharedHook<E>, b: &SharedHook<E>) -> bool {
    Arc::ptr_eq(a, b)
}
