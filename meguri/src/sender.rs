//! Outbound sender boundary.
//!
//! The engine never talks to the platform itself. Replies bound to inbound
//! events go through a [`Sender`] supplied by the application.

use meguri_core::BoxError;
use std::{fmt, future::Future, pin::Pin, sync::Arc};

/// Where a reply is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A group chat.
    Group(i64),
    /// A discussion.
    Discuss(i64),
    /// A private chat with a user.
    User(i64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Group(id) => write!(f, "group {id}"),
            Target::Discuss(id) => write!(f, "discuss {id}"),
            Target::User(id) => write!(f, "user {id}"),
        }
    }
}

/// The outbound collaborator issuing platform API calls.
pub trait Sender: Send + Sync + 'static {
    /// Deliver `message` to `target`.
    fn send(
        &self,
        target: Target,
        message: &str,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Object-safe version of [`Sender`].
pub trait DynSender: Send + Sync + 'static {
    /// Deliver `message` to `target` (dynamic dispatch version).
    fn send_dyn<'a>(
        &'a self,
        target: Target,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;
}

impl<T: Sender> DynSender for T {
    fn send_dyn<'a>(
        &'a self,
        target: Target,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>> {
        Box::pin(self.send(target, message))
    }
}

/// A reference-counted, type-erased sender.
pub type SharedSender = Arc<dyn DynSender>;
