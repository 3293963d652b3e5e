//! # Routing Contexts
//!
//! A context is a node addressed by a path such as `/group/123/`. It owns
//! the listeners for events below that path, scopes the middleware and
//! commands declared through it, and carries a free-form option record.
//!
//! [`Context`] is a handle: the node itself lives in the application's
//! context map, and every handle for the same path shares it. Handles
//! produced by [`Context::derive`] (as plugins receive) add a private
//! option layer read before the node's own options.

use crate::{
    app::{App, Lifecycle},
    command::{CommandConfig, CommandHandle, Invocation},
    meta::Meta,
    parser::CommandLine,
    plugin::Plugin,
};
use meguri_core::{
    MeguriError, SharedHook,
    path::{derive_event_types, is_ancestor, normalize},
};
use meguri_std::Emitter;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};

/// A registered context, shared by every handle for its path.
pub(crate) struct ContextNode {
    path: String,
    id: Option<i64>,
    emitter: Emitter<Arc<Meta>>,
    options: RwLock<Map<String, Value>>,
}

impl ContextNode {
    pub(crate) fn new(path: String, options: Map<String, Value>) -> Self {
        let id = path
            .split('/')
            .filter_map(|segment| segment.parse::<i64>().ok())
            .last();
        Self {
            path,
            id,
            emitter: Emitter::new(),
            options: RwLock::new(options),
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn emitter(&self) -> &Emitter<Arc<Meta>> {
        &self.emitter
    }

    pub(crate) fn merge_options(&self, options: Map<String, Value>) {
        self.options
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(options);
    }
}

/// Options written through a derived handle.
struct Layer {
    values: RwLock<Map<String, Value>>,
    parent: Option<Arc<Layer>>,
}

impl Layer {
    fn get(&self, key: &str) -> Option<Value> {
        let local = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        local.or_else(|| self.parent.as_ref().and_then(|parent| parent.get(key)))
    }
}

/// A handle to a routing context.
#[derive(Clone)]
pub struct Context {
    app: App,
    node: Arc<ContextNode>,
    layer: Option<Arc<Layer>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("path", &self.node.path)
            .field("id", &self.node.id)
            .field("derived", &self.layer.is_some())
            .finish()
    }
}

impl Context {
    pub(crate) fn new(app: App, node: Arc<ContextNode>) -> Self {
        Self {
            app,
            node,
            layer: None,
        }
    }

    /// The path this context is registered at.
    pub fn path(&self) -> &str {
        &self.node.path
    }

    /// The entity id at the deepest numeric segment of the path.
    pub fn id(&self) -> Option<i64> {
        self.node.id
    }

    /// The application this context belongs to.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Whether both handles address the same registered context.
    pub fn same_node(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Whether this handle was derived for a plugin.
    pub fn is_derived(&self) -> bool {
        self.layer.is_some()
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    /// Read an option, checking derived layers before the context's own.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.layer
            .as_ref()
            .and_then(|layer| layer.get(key))
            .or_else(|| {
                self.node
                    .options
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(key)
                    .cloned()
            })
    }

    /// Write an option. Derived handles write to their own layer only.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let target = match &self.layer {
            Some(layer) => &layer.values,
            None => &self.node.options,
        };
        target
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// A handle on the same context with a fresh option layer on top.
    pub fn derive(&self) -> Context {
        Context {
            app: self.app.clone(),
            node: self.node.clone(),
            layer: Some(Arc::new(Layer {
                values: RwLock::new(Map::new()),
                parent: self.layer.clone(),
            })),
        }
    }

    // ------------------------------------------------------------------
    // Scoping
    // ------------------------------------------------------------------

    /// Get or create the context at `path`, which must lie below this one.
    pub fn scope(&self, path: &str) -> Result<Context, MeguriError> {
        self.scope_inner(path, None)
    }

    /// Like [`Context::scope`], layering `options` onto the target.
    pub fn scope_with(
        &self,
        path: &str,
        options: Map<String, Value>,
    ) -> Result<Context, MeguriError> {
        self.scope_inner(path, Some(options))
    }

    fn scope_inner(
        &self,
        path: &str,
        options: Option<Map<String, Value>>,
    ) -> Result<Context, MeguriError> {
        let path = normalize(path);
        if !is_ancestor(self.path(), &path) {
            return Err(MeguriError::ContextViolation {
                scope: self.path().to_string(),
                path: path.clone(),
                target: path,
            });
        }
        Ok(Context::new(self.app.clone(), self.app.mint(&path, options)))
    }

    /// The context for one group, e.g. `/group/123/`.
    pub fn group(&self, id: i64) -> Result<Context, MeguriError> {
        self.scope(&format!("/group/{id}/"))
    }

    /// The context for one user.
    pub fn user(&self, id: i64) -> Result<Context, MeguriError> {
        self.scope(&format!("/user/{id}/"))
    }

    /// The context for one discussion.
    pub fn discuss(&self, id: i64) -> Result<Context, MeguriError> {
        self.scope(&format!("/discuss/{id}/"))
    }

    /// The wildcard context covering every group.
    pub fn groups(&self) -> Result<Context, MeguriError> {
        self.scope("/group/*/")
    }

    /// The wildcard context covering every user.
    pub fn users(&self) -> Result<Context, MeguriError> {
        self.scope("/user/*/")
    }

    /// The wildcard context covering every discussion.
    pub fn discusses(&self) -> Result<Context, MeguriError> {
        self.scope("/discuss/*/")
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Listen for an event type, e.g. `"message"` or `"notice/group_increase"`.
    pub fn on(&self, event: impl Into<String>, hook: SharedHook<Arc<Meta>>) {
        self.node.emitter.on(event, hook);
    }

    /// Remove a listener registered with [`Context::on`].
    pub fn off(&self, event: &str, hook: &SharedHook<Arc<Meta>>) -> bool {
        self.node.emitter.off(event, hook)
    }

    /// The event types an event at `event_path` fires on this context.
    pub fn event_types(&self, event_path: &str) -> Vec<String> {
        derive_event_types(self.path(), event_path)
    }

    // ------------------------------------------------------------------
    // Plugins and middleware
    // ------------------------------------------------------------------

    /// Install a plugin into a derived handle of this context.
    ///
    /// Passing `Value::Bool(false)` as options skips the plugin entirely.
    pub async fn plugin<P: Plugin>(
        &self,
        plugin: P,
        options: Value,
    ) -> Result<&Self, MeguriError> {
        if options == Value::Bool(false) {
            return Ok(self);
        }
        plugin.apply(self.derive(), options).await?;
        if let Some(name) = plugin.name() {
            tracing::info!(plugin = name, path = self.path(), "installed plugin");
            self.app
                .notify(Lifecycle::Plugin {
                    name: name.to_string(),
                })
                .await;
        }
        Ok(self)
    }

    /// Append a middleware scoped to this context.
    pub fn middleware(&self, hook: SharedHook<Arc<Meta>>) {
        self.app.add_middleware(self.path(), hook, false);
    }

    /// Prepend a middleware scoped to this context.
    pub fn premiddleware(&self, hook: SharedHook<Arc<Meta>>) {
        self.app.add_middleware(self.path(), hook, true);
    }

    /// Remove the first middleware registered from this context's path
    /// that is the same registration as `hook`.
    pub fn remove_middleware(&self, hook: &SharedHook<Arc<Meta>>) -> bool {
        self.app.remove_middleware(self.path(), hook)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Declare a command, e.g. `"echo <text>"` or `"admin.ban/user <id>"`.
    pub fn command(&self, declaration: &str) -> Result<CommandHandle, MeguriError> {
        self.command_with(declaration, CommandConfig::default())
    }

    /// Declare a command and merge `config` onto it. A plain string is
    /// taken as the description.
    pub fn command_with(
        &self,
        declaration: &str,
        config: impl Into<CommandConfig>,
    ) -> Result<CommandHandle, MeguriError> {
        let config = config.into();
        let id = self
            .app
            .with_commands_mut(|tree| tree.declare(declaration, self.path(), config))?;
        Ok(CommandHandle::new(self.app.clone(), id))
    }

    /// Look a command up by name.
    ///
    /// The command must be scoped to an ancestor of the lookup path: the
    /// event's path when `meta` is given, this context's path otherwise.
    pub fn get_command(&self, name: &str, meta: Option<&Meta>) -> Option<CommandHandle> {
        let path = meta.map_or(self.path(), Meta::path);
        self.app
            .find_command(name, path)
            .map(|id| CommandHandle::new(self.app.clone(), id))
    }

    /// Run a command on behalf of an inbound event.
    ///
    /// An unknown name, or one not visible from the event's path, is
    /// answered with the configured "not found" reply instead of an error.
    /// A reply that cannot be delivered is logged and the call still
    /// succeeds.
    pub async fn run_command(
        &self,
        name: &str,
        meta: Arc<Meta>,
        args: Vec<String>,
        options: Map<String, Value>,
        rest: impl Into<String>,
    ) -> Result<(), MeguriError> {
        let line = CommandLine {
            options,
            rest: rest.into(),
            ..CommandLine::from_args(args)
        };
        self.run_line(name, meta, line).await
    }

    pub(crate) async fn run_line(
        &self,
        name: &str,
        meta: Arc<Meta>,
        line: CommandLine,
    ) -> Result<(), MeguriError> {
        let Some(command) = self.get_command(name, Some(meta.as_ref())) else {
            let name = name.split_once(' ').map_or(name, |(head, _)| head);
            let error = MeguriError::CommandNotFound {
                name: name.to_string(),
                path: meta.path().to_string(),
            };
            tracing::debug!(%error, "replying with not found");
            if let Err(reply) = meta.send(&self.app.options().not_found(name)).await {
                tracing::warn!(%error, reply = %reply, "not found reply failed");
            }
            return Ok(());
        };
        command
            .execute(Invocation::new(meta, command.clone(), line))
            .await
    }
}
