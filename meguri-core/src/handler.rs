//! # Terminal Endpoint (Handler)
//!
//! A handler consumes an owned input and performs the side effects a caller
//! asked for. Command actions are handlers over the invocation record.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|input| async move { ... }`
//! 2. **Struct implementation**: `impl Handler<MyInput> for MyHandler`

use crate::message::Message;
use std::{future::Future, pin::Pin, sync::Arc};

/// A marker trait for the result of an endpoint execution.
pub trait HandlerResult: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> HandlerResult for T {}

/// The terminal endpoint of a processing pipeline.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle input of type `{In}`",
    label = "missing `Handler<{In}>` implementation",
    note = "Handlers must implement the `call` method for the input type `{In}`."
)]
pub trait Handler<In: Message>: Send + Sync + 'static {
    /// The output type of the handler, usually `()` or a `Result`.
    type Output: HandlerResult;

    /// Executes the handler logic.
    fn call(&self, input: In) -> impl Future<Output = Self::Output> + Send;
}

impl<F, In, Out, Fut> Handler<In> for F
where
    In: Message,
    Out: HandlerResult,
    F: Fn(In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send,
{
    type Output = Out;

    fn call(&self, input: In) -> impl Future<Output = Self::Output> + Send {
        (self)(input)
    }
}

/// Object-safe version of [`Handler`] with a fixed output type.
pub trait DynHandler<In: Message, Out>: Send + Sync + 'static {
    /// Executes the handler logic (dynamic dispatch version).
    fn call_dyn(&self, input: In) -> Pin<Box<dyn Future<Output = Out> + Send + '_>>;
}

impl<In, H> DynHandler<In, H::Output> for H
where
    In: Message,
    H: Handler<In>,
{
    fn call_dyn(&self, input: In) -> Pin<Box<dyn Future<Output = H::Output> + Send + '_>> {
        Box::pin(self.call(input))
    }
}

/// A reference-counted, type-erased handler.
pub type SharedHandler<In, Out> = Arc<dyn DynHandler<In, Out>>;
