//! # meguri-std
//!
//! Standard implementations for the Meguri event routing engine.
//!
//! This crate provides:
//! - **Emitters**: [`Emitter`], the string-keyed listener registry every
//!   context and the application receiver are built on
//! - **Standard hooks**: [`hooks::LoggingHook`]
//! - **Testing**: recording and failing doubles in [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use meguri_core;

pub mod emitter;
pub mod hooks;
pub mod testing;

pub use emitter::{Emission, Emitter};
