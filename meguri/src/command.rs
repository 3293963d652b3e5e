//! # Command Tree
//!
//! Commands are stored in an arena owned by the application and indexed by
//! their lower-cased name, which is unique across the whole process. Parent
//! and child links are arena ids over the same nodes.
//!
//! A declaration like `"admin.ban/user <id> [reason]"` is split into the
//! command path `admin.ban/user` and the suffix ` <id> [reason]`. The path
//! is cut before every `.` and `/`:
//!
//! - the first segment resolves a top-level command,
//! - `.ban` declares a child whose name is the parent's name followed by
//!   the dotted segment (`admin.ban`),
//! - `/user` declares a child named `user`.
//!
//! The suffix describes the leaf command's arguments.

use crate::{app::App, context::Context, meta::Meta, parser::CommandLine, sender::SharedSender};
use meguri_core::{
    BoxError, Handler, MeguriError, Message, SharedHandler, path::is_ancestor,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};

/// Index of a command in the application's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(usize);

/// Description and free-form options attached to a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Anything else the application wants to attach.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandConfig {
    /// Layer `other` on top of this config.
    pub fn merge(&mut self, other: CommandConfig) {
        if other.description.is_some() {
            self.description = other.description;
        }
        self.extra.extend(other.extra);
    }
}

impl From<&str> for CommandConfig {
    fn from(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            extra: Map::new(),
        }
    }
}

impl From<String> for CommandConfig {
    fn from(description: String) -> Self {
        Self {
            description: Some(description),
            extra: Map::new(),
        }
    }
}

/// A positional argument declared in the command suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    /// Name between the brackets, without the `...` prefix.
    pub name: String,
    /// Declared as `<name>` rather than `[name]`.
    pub required: bool,
    /// Declared as `...name`, swallowing the remaining arguments.
    pub variadic: bool,
}

/// Parse `<required> [optional] [...rest]` argument declarations.
pub fn parse_arguments(declaration: &str) -> Vec<ArgSpec> {
    let mut specs = Vec::new();
    let mut chars = declaration.char_indices();
    while let Some((start, open)) = chars.next() {
        let close = match open {
            '<' => '>',
            '[' => ']',
            _ => continue,
        };
        let Some((end, _)) = chars.by_ref().find(|&(_, c)| c == close) else {
            break;
        };
        let inner = declaration[start + 1..end].trim();
        let (variadic, name) = match inner.strip_prefix("...") {
            Some(name) => (true, name),
            None => (false, inner),
        };
        specs.push(ArgSpec {
            name: name.to_string(),
            required: open == '<',
            variadic,
        });
    }
    specs
}

/// An option declared with [`CommandHandle::option`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Canonical key options are stored under: the last alias declared.
    pub name: String,
    /// Every spelling without leading dashes, e.g. `["f", "force"]`.
    pub aliases: Vec<String>,
    /// Whether the option takes a value (`--out <file>`).
    pub takes_value: bool,
    /// Help text shown next to the option.
    pub description: String,
}

impl OptionSpec {
    /// Parse a declaration such as `"-f, --force"` or `"-o, --output <file>"`.
    pub fn parse(declaration: &str, description: impl Into<String>) -> Option<Self> {
        let mut aliases = Vec::new();
        let mut takes_value = false;
        for token in declaration.split([',', ' ']).filter(|t| !t.is_empty()) {
            if token.starts_with('<') || token.starts_with('[') {
                takes_value = true;
            } else if let Some(alias) = token.strip_prefix('-') {
                let alias = alias.trim_start_matches('-');
                if !alias.is_empty() {
                    aliases.push(alias.to_string());
                }
            }
        }
        let name = aliases.last()?.clone();
        Some(Self {
            name,
            aliases,
            takes_value,
            description: description.into(),
        })
    }

    /// Whether `key` is one of this option's spellings.
    pub fn matches(&self, key: &str) -> bool {
        self.aliases.iter().any(|alias| alias == key)
    }
}

type Action = SharedHandler<Invocation, Result<(), BoxError>>;

pub(crate) struct CommandNode {
    name: String,
    declaration: String,
    arguments: Vec<ArgSpec>,
    parent: Option<CommandId>,
    children: Vec<CommandId>,
    context: String,
    config: CommandConfig,
    options: Vec<OptionSpec>,
    action: Option<Action>,
}

impl CommandNode {
    fn new(name: String, context: &str) -> Self {
        Self {
            name,
            declaration: String::new(),
            arguments: Vec::new(),
            parent: None,
            children: Vec::new(),
            context: context.to_string(),
            config: CommandConfig::default(),
            options: Vec::new(),
            action: None,
        }
    }
}

/// The process-wide command arena and name index.
#[derive(Default)]
pub(crate) struct CommandTree {
    nodes: Vec<CommandNode>,
    by_name: HashMap<String, CommandId>,
}

/// Cut a command path before every `.` and `/`, keeping the delimiter.
fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (index, c) in path.char_indices() {
        if (c == '.' || c == '/') && index > start {
            segments.push(&path[start..index]);
            start = index;
        }
    }
    if start < path.len() {
        segments.push(&path[start..]);
    }
    segments
}

impl CommandTree {
    fn node(&self, id: CommandId) -> &CommandNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: CommandId) -> &mut CommandNode {
        &mut self.nodes[id.0]
    }

    fn name_of(&self, id: Option<CommandId>) -> Option<String> {
        id.map(|id| self.node(id).name.clone())
    }

    /// Resolve or create every command named by `declaration`, declared
    /// from a context at `context_path`, and merge `config` onto the leaf.
    pub(crate) fn declare(
        &mut self,
        declaration: &str,
        context_path: &str,
        config: CommandConfig,
    ) -> Result<CommandId, MeguriError> {
        let declaration = declaration.trim_start();
        let (path, suffix) = match declaration.find(char::is_whitespace) {
            Some(index) => declaration.split_at(index),
            None => (declaration, ""),
        };
        let path = path.to_lowercase();

        let mut parent: Option<CommandId> = None;
        for segment in split_segments(&path) {
            let name = match (segment.as_bytes()[0], parent) {
                (b'.', Some(p)) => format!("{}{}", self.node(p).name, segment),
                (b'.' | b'/', _) => segment[1..].to_string(),
                _ => segment.to_string(),
            };
            if name.is_empty() || name.ends_with('.') {
                continue;
            }
            parent = Some(self.resolve_segment(name, parent, context_path)?);
        }

        let leaf = parent.ok_or(MeguriError::EmptyDeclaration)?;
        let node = self.node_mut(leaf);
        if !suffix.trim().is_empty() {
            node.arguments = parse_arguments(suffix);
            node.declaration = suffix.to_string();
        }
        node.config.merge(config);
        Ok(leaf)
    }

    fn resolve_segment(
        &mut self,
        name: String,
        parent: Option<CommandId>,
        context_path: &str,
    ) -> Result<CommandId, MeguriError> {
        if let Some(&id) = self.by_name.get(&name) {
            let existing = self.node(id);
            if parent.is_some() && existing.parent != parent {
                return Err(MeguriError::StructuralConflict {
                    expected: self.name_of(parent),
                    actual: self.name_of(existing.parent),
                    name,
                });
            }
            if !is_ancestor(&existing.context, context_path) {
                return Err(MeguriError::ContextViolation {
                    target: name,
                    scope: existing.context.clone(),
                    path: context_path.to_string(),
                });
            }
            return Ok(id);
        }

        let id = CommandId(self.nodes.len());
        let mut node = CommandNode::new(name.clone(), context_path);
        node.parent = parent;
        self.nodes.push(node);
        if let Some(p) = parent {
            self.node_mut(p).children.push(id);
        }
        tracing::debug!(command = %name, context = context_path, "declared command");
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Look a command up by name as seen from `path`.
    ///
    /// Anything after the first space and anything up to the last `/` is
    /// ignored, so `"/help now"` resolves `help`.
    pub(crate) fn resolve(&self, raw: &str, path: &str) -> Option<CommandId> {
        let name = raw.split_once(' ').map_or(raw, |(head, _)| head);
        let name = name.rsplit_once('/').map_or(name, |(_, tail)| tail);
        let id = *self.by_name.get(&name.to_lowercase())?;
        is_ancestor(&self.node(id).context, path).then_some(id)
    }
}

/// A handle to a declared command.
///
/// Handles are cheap to clone and compare equal when they name the same
/// command of the same application.
#[derive(Clone)]
pub struct CommandHandle {
    app: App,
    id: CommandId,
}

impl PartialEq for CommandHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.app.ptr_eq(&other.app)
    }
}

impl Eq for CommandHandle {}

impl std::fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandle")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

impl CommandHandle {
    pub(crate) fn new(app: App, id: CommandId) -> Self {
        Self { app, id }
    }

    fn read<T>(&self, f: impl FnOnce(&CommandNode) -> T) -> T {
        self.app.with_commands(|tree| f(tree.node(self.id)))
    }

    fn write<T>(&self, f: impl FnOnce(&mut CommandNode) -> T) -> T {
        self.app.with_commands_mut(|tree| f(tree.node_mut(self.id)))
    }

    /// Arena id of this command.
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Lower-cased, process-unique name.
    pub fn name(&self) -> String {
        self.read(|node| node.name.clone())
    }

    /// Argument declaration suffix, verbatim.
    pub fn declaration(&self) -> String {
        self.read(|node| node.declaration.clone())
    }

    /// Name followed by the declaration suffix.
    pub fn usage(&self) -> String {
        self.read(|node| format!("{}{}", node.name, node.declaration))
    }

    /// Positional arguments parsed from the declaration suffix.
    pub fn arguments(&self) -> Vec<ArgSpec> {
        self.read(|node| node.arguments.clone())
    }

    /// Description from the merged configuration.
    pub fn description(&self) -> Option<String> {
        self.read(|node| node.config.description.clone())
    }

    /// A snapshot of the merged configuration.
    pub fn config(&self) -> CommandConfig {
        self.read(|node| node.config.clone())
    }

    /// Path of the context this command is scoped to.
    pub fn context_path(&self) -> String {
        self.read(|node| node.context.clone())
    }

    /// The context this command is scoped to.
    pub fn context(&self) -> Context {
        self.app.scope(&self.context_path())
    }

    /// The command this one was declared under.
    pub fn parent(&self) -> Option<CommandHandle> {
        self.read(|node| node.parent)
            .map(|id| CommandHandle::new(self.app.clone(), id))
    }

    /// Children in declaration order.
    pub fn children(&self) -> Vec<CommandHandle> {
        self.read(|node| node.children.clone())
            .into_iter()
            .map(|id| CommandHandle::new(self.app.clone(), id))
            .collect()
    }

    /// Declared options.
    pub fn options(&self) -> Vec<OptionSpec> {
        self.read(|node| node.options.clone())
    }

    /// Declare an option such as `"-f, --force"`.
    ///
    /// Declarations without any dashed alias are ignored.
    pub fn option(&self, declaration: &str, description: impl Into<String>) -> &Self {
        if let Some(spec) = OptionSpec::parse(declaration, description) {
            self.write(|node| {
                node.options.retain(|o| o.name != spec.name);
                node.options.push(spec);
            });
        }
        self
    }

    /// Merge more configuration onto the command.
    pub fn configure(&self, config: impl Into<CommandConfig>) -> &Self {
        let config = config.into();
        self.write(|node| node.config.merge(config));
        self
    }

    /// Install the action run when the command executes.
    pub fn action<H>(&self, handler: H) -> &Self
    where
        H: Handler<Invocation, Output = Result<(), BoxError>>,
    {
        let action: Action = Arc::new(handler);
        self.write(|node| node.action = Some(action));
        self
    }

    /// Execute the command with a prepared invocation.
    ///
    /// A `"command"` lifecycle notification is raised first. Commands
    /// without an action succeed without doing anything.
    pub async fn execute(&self, invocation: Invocation) -> Result<(), MeguriError> {
        let name = self.name();
        self.app
            .notify(crate::app::Lifecycle::Command {
                name: name.clone(),
                path: invocation.meta.path().to_string(),
            })
            .await;

        let Some(action) = self.read(|node| node.action.clone()) else {
            tracing::debug!(command = %name, "command has no action");
            return Ok(());
        };
        tracing::debug!(command = %name, args = ?invocation.args, "executing command");
        action.call_dyn(invocation).await.map_err(MeguriError::Custom)
    }
}

/// Everything a command action receives.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The inbound event that triggered the command.
    pub meta: Arc<Meta>,
    /// The command being executed.
    pub command: CommandHandle,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Options keyed by their canonical name.
    pub options: Map<String, Value>,
    /// Text after a bare `--`.
    pub rest: String,
    /// Option tokens no declared option recognized.
    pub unknown: Vec<String>,
}

impl Message for Invocation {}

impl Invocation {
    pub(crate) fn new(meta: Arc<Meta>, command: CommandHandle, line: CommandLine) -> Self {
        Self {
            meta,
            command,
            args: line.args,
            options: line.options,
            rest: line.rest,
            unknown: line.unknown,
        }
    }

    /// Reply to the conversation the command was invoked from.
    pub async fn send(&self, message: &str) -> Result<(), MeguriError> {
        self.meta.send(message).await
    }

    /// The sender bound to the triggering event, if any.
    pub fn sender(&self) -> Option<SharedSender> {
        self.meta.sender()
    }
}
