//! # Dispatch Facade
//!
//! Entry points the transport calls once per inbound webhook delivery.
//!
//! An event is emitted on every registered context whose path is an
//! ancestor of the event's path, once per derived event type. Message
//! events then run through the middleware chain and, when no middleware
//! stops them, through the command trigger. Failures are logged and
//! counted per event; they never reach the transport.

use crate::{app::App, command::Invocation, meta::Meta, parser};
use futures::future::join_all;
use meguri_core::{HookResult, MeguriError, path::derive_event_types};
use std::sync::Arc;

/// What happened while dispatching one inbound event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Number of (context, event type) emissions.
    pub emissions: usize,
    /// Number of failures that were logged and swallowed.
    pub failures: usize,
}

fn report(path: &str, error: MeguriError) {
    tracing::warn!(path, error = %error, source = ?std::error::Error::source(&error), "dispatch failure");
}

impl App {
    /// Process one inbound event end to end.
    ///
    /// Assigns the canonical path when the transport did not, fills in
    /// `self_id` from the options, binds the reply sender, emits the event
    /// on every matching context and finally runs message handling.
    pub async fn receive(&self, mut meta: Meta) -> DispatchSummary {
        if meta.path().is_empty() {
            let path = meta.canonical_path();
            meta.set_path(path);
        }
        if meta.self_id.is_none() {
            meta.self_id = self.options().self_id;
        }
        if let Some(sender) = self.sender() {
            meta.bind_sender(sender);
        }
        tracing::debug!(path = meta.path(), "received event");

        let meta = Arc::new(meta);
        let mut summary = self.emit_events(&meta).await;
        if meta.is_message() {
            if let Err(error) = self.handle_message(&meta).await {
                summary.failures += 1;
                report(meta.path(), error);
            }
        }
        summary
    }

    /// Emit `meta` on every context whose path is an ancestor of the event
    /// path, once for each derived event type.
    ///
    /// Contexts are visited in registration order. Listener failures are
    /// logged as dispatch failures and counted.
    pub async fn emit_events(&self, meta: &Arc<Meta>) -> DispatchSummary {
        let nodes = self.context_nodes();
        let emissions: Vec<_> = nodes
            .iter()
            .flat_map(|node| {
                derive_event_types(node.path(), meta.path())
                    .into_iter()
                    .map(move |event| (node, event))
            })
            .collect();

        let results = join_all(
            emissions
                .iter()
                .map(|(node, event)| node.emitter().emit(event, meta)),
        )
        .await;

        let mut summary = DispatchSummary {
            emissions: emissions.len(),
            failures: 0,
        };
        for ((node, event), emission) in emissions.iter().zip(results) {
            for source in emission.failures {
                summary.failures += 1;
                tracing::debug!(context = node.path(), event = %event, "listener failed");
                report(
                    meta.path(),
                    MeguriError::DispatchFailure {
                        path: meta.path().to_string(),
                        source,
                    },
                );
            }
        }
        summary
    }

    /// Run the middleware chain for a message, then the command trigger.
    async fn handle_message(&self, meta: &Arc<Meta>) -> Result<(), MeguriError> {
        for hook in self.middleware_chain(meta.path()) {
            let result = hook
                .on_event_dyn(meta)
                .await
                .map_err(|source| MeguriError::DispatchFailure {
                    path: meta.path().to_string(),
                    source,
                })?;
            if result == HookResult::Stop {
                return Ok(());
            }
        }
        self.trigger_command(meta).await
    }

    /// Execute the command a prefixed message names, if it is visible from
    /// the message's path. Other messages are left alone.
    async fn trigger_command(&self, meta: &Arc<Meta>) -> Result<(), MeguriError> {
        let Some(body) = meta
            .text()
            .and_then(|text| text.strip_prefix(self.options().command_prefix.as_str()))
        else {
            return Ok(());
        };
        let body = body.trim_start();
        let (name, tail) = body
            .split_once(char::is_whitespace)
            .unwrap_or((body, ""));
        if name.is_empty() {
            return Ok(());
        }

        let Some(command) = self.root().get_command(name, Some(meta.as_ref())) else {
            tracing::trace!(command = name, path = meta.path(), "no visible command");
            return Ok(());
        };
        let line = parser::parse(tail, &command.options());
        command
            .execute(Invocation::new(meta.clone(), command.clone(), line))
            .await
    }
}
