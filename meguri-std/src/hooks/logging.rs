//! Logging hook for event observation.

use meguri_core::{BoxError, Hook, HookResult, Message};
use std::fmt::Debug;

/// A hook that logs every event it sees and lets it pass.
///
/// Register it as the first middleware to trace inbound traffic:
///
/// ```rust,ignore
/// app.root().premiddleware(shared(LoggingHook::named("inbound")));
/// ```
pub struct LoggingHook {
    name: &'static str,
}

impl LoggingHook {
    /// Create a new `LoggingHook` with a default name.
    pub fn new() -> Self {
        Self { name: "event" }
    }

    /// Create a new `LoggingHook` with a custom name.
    ///
    /// The name is used in log records to identify the pipeline stage.
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }

    /// The name this hook logs under.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Hook<E> for LoggingHook
where
    E: Message + Debug,
{
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        tracing::debug!(name = %self.name, event = ?event, "processing event");
        Ok(HookResult::Next)
    }
}
