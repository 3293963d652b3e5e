//! Plugin installation.

use crate::context::Context;
use meguri_core::MeguriError;
use serde_json::Value;
use std::future::Future;

/// An extension installed into a context.
///
/// Closures taking `(Context, Value)` are plugins, and so is any type
/// implementing this trait. Types that report a [`Plugin::name`] also raise
/// a `"plugin"` lifecycle notification once installed.
///
/// ```rust,ignore
/// struct Echo;
///
/// impl Plugin for Echo {
///     fn name(&self) -> Option<&str> {
///         Some("echo")
///     }
///
///     async fn apply(&self, ctx: Context, _options: Value) -> Result<(), MeguriError> {
///         ctx.command("echo <text>")?;
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Name announced on the application receiver after installation.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Install the plugin into `ctx`.
    ///
    /// `ctx` is derived from the context the plugin was installed on: it
    /// shares its path and registrations, but option writes stay local.
    fn apply(
        &self,
        ctx: Context,
        options: Value,
    ) -> impl Future<Output = Result<(), MeguriError>> + Send;
}

impl<F, Fut> Plugin for F
where
    F: Fn(Context, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), MeguriError>> + Send,
{
    fn apply(
        &self,
        ctx: Context,
        options: Value,
    ) -> impl Future<Output = Result<(), MeguriError>> + Send {
        (self)(ctx, options)
    }
}
