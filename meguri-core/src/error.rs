//! Error types for Meguri.
//!
//! Every failure the engine reports belongs to one [`ErrorKind`]:
//!
//! - `StructuralConflict` - a command declaration collides with an existing
//!   command under an incompatible parent
//! - `ContextViolation` - a command or context is used from a path outside
//!   its scope
//! - `CommandNotFound` - a runtime lookup failed
//! - `DispatchFailure` - enrichment or emission for one inbound event failed
//! - `Collaborator` - a sender, plugin or command action reported an error

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The closed set of error kinds surfaced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A declaration collides with an existing command under another parent.
    StructuralConflict,
    /// A path is not within the scope of the target it refers to.
    ContextViolation,
    /// A command lookup failed at runtime.
    CommandNotFound,
    /// Processing of one inbound event failed.
    DispatchFailure,
    /// An external collaborator failed.
    Collaborator,
}

/// Top-level error type for all Meguri operations.
#[derive(Error, Debug)]
pub enum MeguriError {
    /// A command already exists with a different parent.
    #[error("wrong subcommand: `{name}` belongs to {actual:?}, not {expected:?}")]
    StructuralConflict {
        /// Name of the command being declared.
        name: String,
        /// Parent the declaration expected.
        expected: Option<String>,
        /// Parent the existing command actually has.
        actual: Option<String>,
    },

    /// A command or context was reached from a path outside its scope.
    #[error("wrong context: `{target}` requires {scope} to be an ancestor of {path}")]
    ContextViolation {
        /// Command name or context path that was targeted.
        target: String,
        /// Path that had to be an ancestor.
        scope: String,
        /// Path that fell outside `scope`.
        path: String,
    },

    /// No visible command with this name exists.
    #[error("command not found: `{name}` at {path}")]
    CommandNotFound {
        /// Name that was looked up.
        name: String,
        /// Path the lookup was made from.
        path: String,
    },

    /// Enrichment or emission for one inbound event failed.
    #[error("dispatch failure at {path}")]
    DispatchFailure {
        /// Path of the inbound event.
        path: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// A command declaration had no command path.
    #[error("empty command declaration")]
    EmptyDeclaration,

    /// The outbound sender failed.
    #[error("send failed")]
    Send(#[source] BoxError),

    /// A plugin or command action failed.
    #[error(transparent)]
    Custom(BoxError),
}

impl MeguriError {
    /// The kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeguriError::StructuralConflict { .. } | MeguriError::EmptyDeclaration => {
                ErrorKind::StructuralConflict
            }
            MeguriError::ContextViolation { .. } => ErrorKind::ContextViolation,
            MeguriError::CommandNotFound { .. } => ErrorKind::CommandNotFound,
            MeguriError::DispatchFailure { .. } => ErrorKind::DispatchFailure,
            MeguriError::Send(_) | MeguriError::Custom(_) => ErrorKind::Collaborator,
        }
    }
}

impl From<BoxError> for MeguriError {
    fn from(err: BoxError) -> Self {
        MeguriError::Custom(err)
    }
}
