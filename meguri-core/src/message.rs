//! Message trait for event payloads.

/// A marker trait for anything that can travel through an emitter.
///
/// Messages must be `Send + Sync + 'static` so listeners can hold on to them
/// across await points.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Heartbeat { interval: u64 }
///
/// impl Message for Heartbeat {}
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Message",
    label = "must be `Send + Sync + 'static`",
    note = "Events routed by Meguri must be thread-safe and static."
)]
pub trait Message: Send + Sync + 'static {}

impl Message for () {}
impl Message for String {}
impl Message for &'static str {}
impl<T: Message> Message for Box<T> {}
impl<T: Message> Message for std::sync::Arc<T> {}
impl<T: Message> Message for Vec<T> {}
impl<T: Message> Message for Option<T> {}
