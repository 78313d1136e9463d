//! Operation sequences: ordered, buildable, then executable collections of
//! named steps, nested sequences, and context scopes.
//!
//! A sequence is built once per invocation (inside a sequence command's
//! body), executed read-only exactly once, then discarded. Execution is
//! synchronous and depth-first; ordering is declaration order and fully
//! deterministic. Live output (banners, step headers, listings) goes to
//! stdout; tracing carries diagnostics only.

use crate::command::{CommandPaths, CommandSpec};
use crate::context::{ContextResource, ScopeCell, ScopeRuntime};
use crate::error::OpsError;
use crate::retry::{self, RetryPolicy};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a single leaf callback.
pub type OpResult = Result<(), OpsError>;

/// How a populated sequence is traversed. Chosen once per invocation and
/// propagated unchanged through nested sequences and contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run every leaf and really acquire/release contexts.
    Live,
    /// Identical traversal and output structure, but never invoke a leaf
    /// callback or touch a real resource.
    DryRun,
    /// Print each step's canonical invocation recursively; run nothing.
    ShowCommands,
}

/// What a traversal did: step headers printed under Live/DryRun, listing
/// lines printed under ShowCommands, and wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunReport {
    pub steps: usize,
    pub elapsed: Duration,
}

enum Step {
    Operation {
        name: String,
        display: Option<String>,
        run: Box<dyn FnOnce() -> OpResult>,
    },
    Nested {
        name: String,
        display: Option<String>,
        inner: OperationSequence,
    },
    Context {
        name: String,
        scope: Rc<dyn ScopeRuntime>,
        inner: OperationSequence,
    },
}

/// LIFO stack of pending context releases, shared by every sequence frame
/// in one run. Strictly push/pop; a mismatched pop is a programming defect.
#[derive(Default)]
struct CleanupStack {
    entries: Vec<(u64, Rc<dyn ScopeRuntime>)>,
    next_token: u64,
}

impl CleanupStack {
    fn push(&mut self, scope: Rc<dyn ScopeRuntime>) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.entries.push((token, scope));
        token
    }

    fn pop(&mut self) -> Option<(u64, Rc<dyn ScopeRuntime>)> {
        self.entries.pop()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release anything still on the stack, innermost first. Entries here
    /// at top-level completion mean the traversal logic is broken; the
    /// resources are still released before the defect is reported.
    fn drain_leftovers(&mut self, failure: Option<&OpsError>) -> Option<OpsError> {
        if self.entries.is_empty() {
            return None;
        }
        let count = self.entries.len();
        while let Some((_, scope)) = self.entries.pop() {
            if let Err(e) = scope.release(failure) {
                tracing::error!("leftover context release failed: {}", e);
            }
        }
        Some(OpsError::internal(format!(
            "cleanup stack held {count} unreleased contexts at top-level completion"
        )))
    }
}

/// An ordered, composable collection of operations, nested sequences, and
/// context scopes.
pub struct OperationSequence {
    steps: Vec<Step>,
    paths: CommandPaths,
}

impl Default for OperationSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationSequence {
    pub fn new() -> Self {
        Self::with_paths(CommandPaths::default())
    }

    pub(crate) fn with_paths(paths: CommandPaths) -> Self {
        Self {
            steps: Vec::new(),
            paths,
        }
    }

    /// Number of top-level steps declared so far.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append a leaf operation. `name` labels the step header; ShowCommands
    /// falls back to it when no display string is available.
    pub fn add_operation(
        &mut self,
        name: impl Into<String>,
        run: impl FnOnce() -> OpResult + 'static,
    ) {
        self.steps.push(Step::Operation {
            name: name.into(),
            display: None,
            run: Box::new(run),
        });
    }

    /// Append a leaf operation with a pre-rendered equivalent-invocation
    /// string for ShowCommands.
    pub fn add_operation_with_display(
        &mut self,
        name: impl Into<String>,
        display: impl Into<String>,
        run: impl FnOnce() -> OpResult + 'static,
    ) {
        self.steps.push(Step::Operation {
            name: name.into(),
            display: Some(display.into()),
            run: Box::new(run),
        });
    }

    /// Append a named sleep.
    pub fn pause(&mut self, name: impl Into<String>, duration: Duration) {
        self.add_operation(name, move || {
            std::thread::sleep(duration);
            Ok(())
        });
    }

    /// Resolve a pre-declared simple command against CLI-style tokens and
    /// append it as a leaf, displayed under its canonical path.
    pub fn add_command(&mut self, command: &Arc<CommandSpec>, args: &[&str]) -> OpResult {
        if !command.is_simple() {
            return Err(OpsError::internal(format!(
                "add_command requires a simple command: {}",
                command.summary()
            )));
        }
        let bound = command.bind(args)?;
        let display = self.paths.render(command, &bound);
        let spec = Arc::clone(command);
        self.steps.push(Step::Operation {
            name: command.summary().to_string(),
            display,
            run: Box::new(move || spec.run_simple(&bound)),
        });
        Ok(())
    }

    /// Like [`add_command`](Self::add_command), wrapping the command in a
    /// bounded retry loop. The canonical display is inherited from the
    /// wrapped command, so ShowCommands output is unaffected by wrapping.
    pub fn add_retrying_command(
        &mut self,
        command: &Arc<CommandSpec>,
        args: &[&str],
        policy: RetryPolicy,
    ) -> OpResult {
        if !command.is_simple() {
            return Err(OpsError::internal(format!(
                "add_retrying_command requires a simple command: {}",
                command.summary()
            )));
        }
        let bound = command.bind(args)?;
        let display = self.paths.render(command, &bound);
        let spec = Arc::clone(command);
        self.steps.push(Step::Operation {
            name: command.summary().to_string(),
            display,
            run: Box::new(retry::wrap(policy, move || spec.run_simple(&bound))),
        });
        Ok(())
    }

    /// Invoke a sequence command's body against a fresh inner sequence and
    /// append the result as a nested block. At execution the block runs
    /// indented, with its own step counter.
    pub fn add_subcommand(&mut self, command: &Arc<CommandSpec>, args: &[&str]) -> OpResult {
        if !command.is_sequence() {
            return Err(OpsError::internal(format!(
                "add_subcommand requires a sequence command: {}",
                command.summary()
            )));
        }
        let bound = command.bind(args)?;
        let display = self.paths.render(command, &bound);
        let mut inner = OperationSequence::with_paths(self.paths.clone());
        command.build_sequence(&mut inner, &bound)?;
        self.steps.push(Step::Nested {
            name: command.summary().to_string(),
            display,
            inner,
        });
        Ok(())
    }

    /// Declare a resource scope. `build` populates the steps that run while
    /// the resource is held and may capture the resource for use in later
    /// callbacks. Under Live the resource is really acquired and released
    /// (on every path, innermost scope first); under DryRun and
    /// ShowCommands only the declared structure is printed.
    pub fn context<R, F>(&mut self, name: impl Into<String>, resource: R, build: F) -> OpResult
    where
        R: ContextResource + 'static,
        F: FnOnce(&mut OperationSequence, &Rc<R>) -> OpResult,
    {
        let resource = Rc::new(resource);
        let mut inner = OperationSequence::with_paths(self.paths.clone());
        build(&mut inner, &resource)?;
        self.steps.push(Step::Context {
            name: name.into(),
            scope: Rc::new(ScopeCell::new(resource)),
            inner,
        });
        Ok(())
    }

    /// Execute the sequence. Consumes it: a sequence runs exactly once.
    pub fn run(self, mode: ExecutionMode) -> Result<RunReport, OpsError> {
        let started = Instant::now();
        match mode {
            ExecutionMode::Live => println!("== executing {} operations ==\n", self.len()),
            ExecutionMode::DryRun => println!("== dry run: {} operations ==\n", self.len()),
            ExecutionMode::ShowCommands => {}
        }

        let mut report = RunReport::default();
        let mut cleanup = CleanupStack::default();
        let result = self.run_at(mode, 0, &mut cleanup, &mut report);

        // The traversal releases every scope it opens; anything left on the
        // stack is an invariant violation, reported loudly after the
        // resources are drained.
        let leftover = cleanup.drain_leftovers(result.as_ref().err());
        let result = match (result, leftover) {
            (Ok(()), None) => Ok(()),
            (Ok(()), Some(invariant)) => Err(invariant),
            (Err(e), None) => Err(e),
            (Err(e), Some(invariant)) => Err(OpsError::CleanupFailed {
                primary: Box::new(e),
                cleanup: Box::new(invariant),
            }),
        };

        report.elapsed = started.elapsed();
        if result.is_ok() {
            match mode {
                ExecutionMode::Live => println!(
                    "== all operations executed in {:.2} seconds! ==",
                    report.elapsed.as_secs_f64()
                ),
                ExecutionMode::DryRun => println!("== dry run complete =="),
                ExecutionMode::ShowCommands => {}
            }
        }
        result.map(|()| report)
    }

    fn run_at(
        self,
        mode: ExecutionMode,
        depth: usize,
        cleanup: &mut CleanupStack,
        report: &mut RunReport,
    ) -> OpResult {
        let total = self.steps.len();
        for (index, step) in self.steps.into_iter().enumerate() {
            let number = index + 1;
            match step {
                Step::Operation { name, display, run } => match mode {
                    ExecutionMode::Live => {
                        print_header(depth, &name, number, total);
                        report.steps += 1;
                        tracing::debug!(step = %name, "running operation");
                        run()?;
                        println!();
                    }
                    ExecutionMode::DryRun => {
                        print_header(depth, &name, number, total);
                        report.steps += 1;
                    }
                    ExecutionMode::ShowCommands => {
                        print_listing(depth, display.as_deref(), &name, report);
                    }
                },
                Step::Nested {
                    name,
                    display,
                    inner,
                } => match mode {
                    ExecutionMode::Live | ExecutionMode::DryRun => {
                        print_header(depth, &name, number, total);
                        report.steps += 1;
                        inner.run_at(mode, depth + 1, cleanup, report)?;
                    }
                    ExecutionMode::ShowCommands => {
                        print_listing(depth, display.as_deref(), &name, report);
                        inner.run_at(mode, depth + 1, cleanup, report)?;
                    }
                },
                Step::Context { name, scope, inner } => match mode {
                    ExecutionMode::Live => {
                        print_header(depth, &format!("enter context: {name}"), number, total);
                        report.steps += 1;
                        scope.acquire()?;
                        let token = cleanup.push(Rc::clone(&scope));
                        let result = inner.run_at(mode, depth + 1, cleanup, report);
                        let release = match cleanup.pop() {
                            Some((popped, entry)) if popped == token => {
                                entry.release(result.as_ref().err())
                            }
                            Some(_) => Err(OpsError::internal("cleanup stack out of order")),
                            None => Err(OpsError::internal("cleanup stack underflow")),
                        };
                        let indent = "  ".repeat(depth);
                        println!("{indent}-- exit context: {name} --\n");
                        match (result, release) {
                            (Ok(()), Ok(())) => {}
                            (Ok(()), Err(e)) => return Err(e),
                            (Err(e), Ok(())) => return Err(e),
                            (Err(primary), Err(during)) => {
                                return Err(OpsError::CleanupFailed {
                                    primary: Box::new(primary),
                                    cleanup: Box::new(during),
                                })
                            }
                        }
                    }
                    ExecutionMode::DryRun => {
                        print_header(depth, &format!("enter context: {name}"), number, total);
                        report.steps += 1;
                        inner.run_at(mode, depth + 1, cleanup, report)?;
                        let indent = "  ".repeat(depth);
                        println!("{indent}-- exit context: {name} --");
                    }
                    ExecutionMode::ShowCommands => {
                        print_listing(depth, None, &format!("context: {name}"), report);
                        inner.run_at(mode, depth + 1, cleanup, report)?;
                    }
                },
            }
        }
        Ok(())
    }
}

fn print_header(depth: usize, name: &str, number: usize, total: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}-- {name} ({number}/{total}) --");
}

fn print_listing(depth: usize, display: Option<&str>, name: &str, report: &mut RunReport) {
    let indent = "  ".repeat(depth);
    match display {
        Some(display) => println!("{indent}$ {display}"),
        None => println!("{indent}>> {name}"),
    }
    report.steps += 1;
}
