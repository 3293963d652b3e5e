//! The application root.
//!
//! [`App`] owns the two process-wide indices, contexts by path and commands
//! by name, together with the ordered middleware list, the lifecycle
//! receiver and the outbound sender. Every [`Context`] and
//! [`CommandHandle`] refers back to the same root.

use crate::{
    command::{CommandId, CommandTree},
    config::AppOptions,
    context::{Context, ContextNode},
    meta::Meta,
    sender::{Sender, SharedSender},
};
use meguri_core::{
    Message, SharedHook,
    path::{is_ancestor, normalize},
    same_hook,
};
use meguri_std::Emitter;
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// Notifications raised on the application receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// A named plugin finished installing. Emitted as `"plugin"`.
    Plugin {
        /// Name the plugin reported.
        name: String,
    },
    /// A command is about to execute. Emitted as `"command"`.
    Command {
        /// Name of the command.
        name: String,
        /// Path of the event that triggered it.
        path: String,
    },
}

impl Message for Lifecycle {}

impl Lifecycle {
    /// Event name this notification is emitted under.
    pub fn event(&self) -> &'static str {
        match self {
            Lifecycle::Plugin { .. } => "plugin",
            Lifecycle::Command { .. } => "command",
        }
    }
}

/// Contexts in registration order, indexed by path.
#[derive(Default)]
pub(crate) struct ContextMap {
    order: Vec<Arc<ContextNode>>,
    by_path: HashMap<String, usize>,
}

pub(crate) struct MiddlewareEntry {
    pub(crate) path: String,
    pub(crate) hook: SharedHook<Arc<Meta>>,
}

pub(crate) struct AppInner {
    options: AppOptions,
    sender: Option<SharedSender>,
    contexts: RwLock<ContextMap>,
    commands: RwLock<CommandTree>,
    middlewares: RwLock<Vec<MiddlewareEntry>>,
    receiver: Emitter<Lifecycle>,
}

/// Builder for constructing an [`App`].
///
/// # Example
/// ```ignore
/// let app = App::builder()
///     .options(AppOptions::from_json(config)?)
///     .sender(HttpSender::new(endpoint))
///     .build();
/// ```
#[derive(Default)]
pub struct AppBuilder {
    options: AppOptions,
    sender: Option<SharedSender>,
}

impl AppBuilder {
    /// Create a builder with default options and no sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application options.
    pub fn options(mut self, options: AppOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the sender replies are delivered through.
    pub fn sender<S: Sender>(self, sender: S) -> Self {
        self.shared_sender(Arc::new(sender))
    }

    /// Set an already shared sender.
    pub fn shared_sender(mut self, sender: SharedSender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Build the application. The root context `/` is registered first.
    pub fn build(self) -> App {
        let app = App {
            inner: Arc::new(AppInner {
                options: self.options,
                sender: self.sender,
                contexts: RwLock::new(ContextMap::default()),
                commands: RwLock::new(CommandTree::default()),
                middlewares: RwLock::new(Vec::new()),
                receiver: Emitter::new(),
            }),
        };
        app.mint("/", None);
        app
    }
}

/// Handle to the application root. Cheap to clone.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("options", &self.inner.options)
            .field("contexts", &self.context_paths())
            .finish_non_exhaustive()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppOptions::default())
    }
}

impl App {
    /// Create an application without a sender.
    pub fn new(options: AppOptions) -> Self {
        AppBuilder::new().options(options).build()
    }

    /// Start building an application.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Options the application was built with.
    pub fn options(&self) -> &AppOptions {
        &self.inner.options
    }

    /// The outbound sender bound to inbound events, if one was configured.
    pub fn sender(&self) -> Option<SharedSender> {
        self.inner.sender.clone()
    }

    /// The lifecycle receiver.
    pub fn receiver(&self) -> &Emitter<Lifecycle> {
        &self.inner.receiver
    }

    pub(crate) fn ptr_eq(&self, other: &App) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) async fn notify(&self, event: Lifecycle) {
        let emission = self.inner.receiver.emit(event.event(), &event).await;
        for error in emission.failures {
            tracing::warn!(event = event.event(), %error, "lifecycle listener failed");
        }
    }

    // ------------------------------------------------------------------
    // Contexts
    // ------------------------------------------------------------------

    /// Get or create the context node at `path`, layering `options` onto it.
    pub(crate) fn mint(&self, path: &str, options: Option<Map<String, Value>>) -> Arc<ContextNode> {
        let path = normalize(path);
        let mut contexts = self
            .inner
            .contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(&index) = contexts.by_path.get(&path) {
            let node = contexts.order[index].clone();
            if let Some(options) = options {
                node.merge_options(options);
            }
            return node;
        }

        let node = Arc::new(ContextNode::new(path.clone(), options.unwrap_or_default()));
        tracing::debug!(path = %path, "registered context");
        let index = contexts.order.len();
        contexts.order.push(node.clone());
        contexts.by_path.insert(path, index);
        node
    }

    /// Snapshot of every context node in registration order.
    pub(crate) fn context_nodes(&self) -> Vec<Arc<ContextNode>> {
        self.inner
            .contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    /// Paths of every registered context in registration order.
    pub fn context_paths(&self) -> Vec<String> {
        self.context_nodes()
            .iter()
            .map(|node| node.path().to_string())
            .collect()
    }

    /// The context registered at exactly `path`, if any.
    pub fn get_context(&self, path: &str) -> Option<Context> {
        let path = normalize(path);
        let contexts = self
            .inner
            .contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let index = *contexts.by_path.get(&path)?;
        Some(Context::new(self.clone(), contexts.order[index].clone()))
    }

    /// The root context `/`.
    pub fn root(&self) -> Context {
        self.scope("/")
    }

    /// Get or create the context at `path`.
    pub fn scope(&self, path: &str) -> Context {
        Context::new(self.clone(), self.mint(path, None))
    }

    /// Get or create the context at `path`, layering `options` onto it.
    pub fn scope_with(&self, path: &str, options: Map<String, Value>) -> Context {
        Context::new(self.clone(), self.mint(path, Some(options)))
    }

    /// Context of one group.
    pub fn group(&self, id: i64) -> Context {
        self.scope(&format!("/group/{id}/"))
    }

    /// Context of one user.
    pub fn user(&self, id: i64) -> Context {
        self.scope(&format!("/user/{id}/"))
    }

    /// Context of one discussion.
    pub fn discuss(&self, id: i64) -> Context {
        self.scope(&format!("/discuss/{id}/"))
    }

    /// Context matching every group.
    pub fn groups(&self) -> Context {
        self.scope("/group/*/")
    }

    /// Context matching every user.
    pub fn users(&self) -> Context {
        self.scope("/user/*/")
    }

    /// Context matching every discussion.
    pub fn discusses(&self) -> Context {
        self.scope("/discuss/*/")
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub(crate) fn with_commands<T>(&self, f: impl FnOnce(&CommandTree) -> T) -> T {
        f(&self
            .inner
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn with_commands_mut<T>(&self, f: impl FnOnce(&mut CommandTree) -> T) -> T {
        f(&mut self
            .inner
            .commands
            .write()
            .unwrap_or_else(PoisonError::into_inner))
    }

    /// Resolve a command by name as seen from `path`.
    pub(crate) fn find_command(&self, name: &str, path: &str) -> Option<CommandId> {
        self.with_commands(|tree| tree.resolve(name, path))
    }

    // ------------------------------------------------------------------
    // Middleware
    // ------------------------------------------------------------------

    pub(crate) fn add_middleware(
        &self,
        path: &str,
        hook: SharedHook<Arc<Meta>>,
        prepend: bool,
    ) {
        let entry = MiddlewareEntry {
            path: path.to_string(),
            hook,
        };
        let mut middlewares = self
            .inner
            .middlewares
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if prepend {
            middlewares.insert(0, entry);
        } else {
            middlewares.push(entry);
        }
    }

    pub(crate) fn remove_middleware(
        &self,
        path: &str,
        hook: &SharedHook<Arc<Meta>>,
    ) -> bool {
        let mut middlewares = self
            .inner
            .middlewares
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match middlewares
            .iter()
            .position(|entry| entry.path == path && same_hook(&entry.hook, hook))
        {
            Some(index) => {
                middlewares.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registered middleware entries.
    pub fn middleware_count(&self) -> usize {
        self.inner
            .middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Middleware whose scope covers `path`, in list order.
    pub(crate) fn middleware_chain(&self, path: &str) -> Vec<SharedHook<Arc<Meta>>> {
        self.inner
            .middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| is_ancestor(&entry.path, path))
            .map(|entry| entry.hook.clone())
            .collect()
    }
}
