//! # meguri-core
//!
//! Core traits for the Meguri event routing engine.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! plugins that only need to implement listeners or command actions.
//!
//! # Building Blocks
//!
//! - [`Hook`] - the listener kernel. Context listeners, middleware and
//!   lifecycle observers are all hooks over an event type.
//! - [`Handler`] - the terminal endpoint. Command actions are handlers over
//!   the invocation record.
//! - [`path`] - pure ancestry testing and event-type derivation over
//!   slash-delimited paths.
//!
//! # Error Types
//!
//! - [`MeguriError`] - top-level error type
//! - [`ErrorKind`] - the closed set of error kinds

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod handler;
mod hook;
mod message;
pub mod path;

pub use error::{BoxError, ErrorKind, MeguriError};
pub use handler::{DynHandler, Handler, HandlerResult, SharedHandler};
pub use hook::{DynHook, Hook, HookResult, SharedHook, same_hook, shared};
pub use message::Message;
