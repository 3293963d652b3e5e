//! # meguri - Hierarchical Event Routing for Chat Bots
//!
//! `meguri` routes inbound chat-platform events to a tree of contexts
//! addressed by paths, and dispatches commands declared on those contexts.
//!
//! ## Paths and contexts
//!
//! Every event gets a path such as `/group/123/message/normal/`. A context
//! registered at `/`, `/group/*/` or `/group/123/` sees that event, and
//! each of them is notified once per event type derived from the part of
//! the path below it: `message`, then `message/normal`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meguri::prelude::*;
//!
//! let app = App::builder().sender(my_sender).build();
//!
//! app.groups().on("message", shared(MyListener));
//! app.root()
//!     .command_with("echo <text>", "repeat a message")?
//!     .action(|inv: Invocation| async move {
//!         inv.send(&inv.args.join(" ")).await.map_err(Into::into)
//!     });
//!
//! app.receive(Meta::from_json(body)?).await;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod app;
pub mod command;
mod config;
mod context;
mod dispatch;
mod meta;
pub mod parser;
mod plugin;
mod sender;

pub use app::{App, AppBuilder, Lifecycle};
pub use command::{ArgSpec, CommandConfig, CommandHandle, CommandId, Invocation, OptionSpec};
pub use config::AppOptions;
pub use context::Context;
pub use dispatch::DispatchSummary;
pub use meta::Meta;
pub use parser::CommandLine;
pub use plugin::Plugin;
pub use sender::{DynSender, Sender, SharedSender, Target};

pub use meguri_core::{
    BoxError, DynHandler, DynHook, ErrorKind, Handler, HandlerResult, Hook, HookResult,
    MeguriError, Message, SharedHandler, SharedHook, path, same_hook, shared,
};

/// Standard hooks and emitters.
pub use meguri_std::{Emission, Emitter, hooks};

/// Testing utilities.
pub mod testing {
    pub use meguri_std::testing::{CountingHandler, FailingHook, RecordingHook};
}

/// Prelude module - common imports for Meguri.
///
/// ```rust,ignore
/// use meguri::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        App, AppOptions, BoxError, CommandHandle, Context, Hook, HookResult, Invocation,
        MeguriError, Meta, Plugin, Sender, SharedHook, Target, shared,
    };
}
