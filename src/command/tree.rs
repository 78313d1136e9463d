//! The static command tree: leaf command specs and named Mux nodes.

use crate::command::schema::{BoundArgs, ParameterSchema};
use crate::error::OpsError;
use crate::sequence::OperationSequence;
use std::collections::HashMap;
use std::sync::Arc;

type SimpleBody = Box<dyn Fn(&BoundArgs) -> Result<(), OpsError>>;
type SequenceBody = Box<dyn Fn(&mut OperationSequence, &BoundArgs) -> Result<(), OpsError>>;

/// A command is either a simple body run directly, or a sequence body that
/// populates an [`OperationSequence`] which the invoker then executes.
enum CommandBody {
    Simple(SimpleBody),
    Sequence(SequenceBody),
}

/// A terminal command: one-line summary, declared parameter schema, and a
/// tagged body. Built once at registration and shared by reference.
pub struct CommandSpec {
    summary: String,
    schema: ParameterSchema,
    body: CommandBody,
}

impl CommandSpec {
    pub fn simple(
        summary: impl Into<String>,
        schema: ParameterSchema,
        body: impl Fn(&BoundArgs) -> Result<(), OpsError> + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            summary: summary.into(),
            schema,
            body: CommandBody::Simple(Box::new(body)),
        })
    }

    pub fn sequence(
        summary: impl Into<String>,
        schema: ParameterSchema,
        body: impl Fn(&mut OperationSequence, &BoundArgs) -> Result<(), OpsError> + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            summary: summary.into(),
            schema,
            body: CommandBody::Sequence(Box::new(body)),
        })
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    pub fn is_simple(&self) -> bool {
        matches!(self.body, CommandBody::Simple(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.body, CommandBody::Sequence(_))
    }

    /// Bind CLI-style tokens against this command's schema. Programmatic
    /// composition (`add_command`, `add_subcommand`) and the CLI go through
    /// the same compiled parser, so the two cannot drift.
    pub fn bind(&self, args: &[&str]) -> Result<BoundArgs, OpsError> {
        let parser = clap::Command::new("command")
            .no_binary_name(true)
            .args(self.schema.to_clap_args());
        let matches = parser.try_get_matches_from(args)?;
        self.schema.from_matches(&matches)
    }

    /// Render the canonical invocation string for bound arguments under
    /// the given path tokens.
    pub fn render_invocation(&self, path: &[String], args: &BoundArgs) -> String {
        self.schema.render(path, args)
    }

    pub(crate) fn run_simple(&self, args: &BoundArgs) -> Result<(), OpsError> {
        match &self.body {
            CommandBody::Simple(body) => body(args),
            CommandBody::Sequence(_) => Err(OpsError::internal(format!(
                "sequence command invoked as simple: {}",
                self.summary
            ))),
        }
    }

    pub(crate) fn build_sequence(
        &self,
        ops: &mut OperationSequence,
        args: &BoundArgs,
    ) -> Result<(), OpsError> {
        match &self.body {
            CommandBody::Sequence(body) => body(ops, args),
            CommandBody::Simple(_) => Err(OpsError::internal(format!(
                "simple command invoked as sequence: {}",
                self.summary
            ))),
        }
    }
}

/// A named tree node mapping subcommand names to children, in declaration
/// order.
pub struct Mux {
    summary: String,
    children: Vec<(String, CommandNode)>,
}

impl Mux {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            children: Vec::new(),
        }
    }

    pub fn command(mut self, name: impl Into<String>, spec: Arc<CommandSpec>) -> Self {
        self.children.push((name.into(), CommandNode::Command(spec)));
        self
    }

    pub fn mux(mut self, name: impl Into<String>, mux: Mux) -> Self {
        self.children.push((name.into(), CommandNode::Mux(mux)));
        self
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub(crate) fn children(&self) -> &[(String, CommandNode)] {
        &self.children
    }

    /// Whether any command in this subtree is a sequence command.
    pub(crate) fn has_sequence(&self) -> bool {
        self.children.iter().any(|(_, node)| match node {
            CommandNode::Mux(mux) => mux.has_sequence(),
            CommandNode::Command(spec) => spec.is_sequence(),
        })
    }
}

pub enum CommandNode {
    Mux(Mux),
    Command(Arc<CommandSpec>),
}

/// Identity of a registered command, derived from its shared allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CommandId(usize);

impl CommandId {
    pub(crate) fn of(spec: &Arc<CommandSpec>) -> Self {
        Self(Arc::as_ptr(spec) as usize)
    }
}

/// Side table mapping each registered command to its canonical path,
/// populated once while the registry walks the tree. Used for help text and
/// for the default ShowCommands rendering.
#[derive(Clone, Default)]
pub struct CommandPaths {
    inner: Arc<HashMap<CommandId, Vec<String>>>,
}

impl CommandPaths {
    pub(crate) fn from_map(map: HashMap<CommandId, Vec<String>>) -> Self {
        Self {
            inner: Arc::new(map),
        }
    }

    /// Canonical invocation tokens (program name first), if registered.
    pub fn tokens(&self, spec: &Arc<CommandSpec>) -> Option<&[String]> {
        self.inner.get(&CommandId::of(spec)).map(Vec::as_slice)
    }

    /// Dotted path without the program name, e.g. `stage.prepare`.
    pub fn dotted(&self, spec: &Arc<CommandSpec>) -> Option<String> {
        self.tokens(spec).map(|tokens| tokens[1..].join("."))
    }

    /// Canonical equivalent-invocation string for the given bound
    /// arguments, or `None` for an unregistered command.
    pub(crate) fn render(&self, spec: &Arc<CommandSpec>, bound: &BoundArgs) -> Option<String> {
        self.tokens(spec)
            .map(|tokens| spec.schema().render(tokens, bound))
    }
}
