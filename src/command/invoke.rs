//! The invoker: resolves CLI input against the command tree, binds
//! arguments, and runs the selected command.
//!
//! The tree compiles to a clap command hierarchy, which renders usage and
//! help and performs token parsing; schema violations have already been
//! rejected when the registry was built. Sequence commands additionally
//! accept `--dry-run` and `--show-commands`, declared globally at the
//! topmost Mux whose subtree contains a sequence command so ancestors
//! accept them transparently.

use crate::command::tree::{CommandId, CommandNode, CommandPaths, CommandSpec, Mux};
use crate::error::OpsError;
use crate::sequence::{ExecutionMode, OperationSequence};
use clap::{Arg, ArgAction, ArgMatches};
use owo_colors::{OwoColorize, Style};
use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

/// The command tree plus its canonical-path side table. Built once at
/// process start; read-only thereafter.
pub struct CommandRegistry {
    program: String,
    root: Mux,
    paths: CommandPaths,
}

impl CommandRegistry {
    pub fn new(program: impl Into<String>, root: Mux) -> Result<Self, OpsError> {
        let program = program.into();
        let mut map = HashMap::new();
        collect_paths(&root, vec![program.clone()], &mut map)?;
        Ok(Self {
            program,
            root,
            paths: CommandPaths::from_map(map),
        })
    }

    /// The identity → canonical path side table.
    pub fn paths(&self) -> &CommandPaths {
        &self.paths
    }

    /// Resolve and run one invocation. `argv` includes the program name.
    pub fn invoke(
        &self,
        argv: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<(), OpsError> {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let compiled = self.to_clap();
        let matches = compiled.clone().try_get_matches_from(&argv)?;
        self.dispatch(&self.root, &compiled, &matches)
    }

    /// Read `std::env::args`, invoke, and convert the outcome into an exit
    /// code. This is the single site that formats expected failures.
    pub fn main_invoke(&self) -> ExitCode {
        self.report(self.invoke(std::env::args()))
    }

    /// Map an invocation outcome to a process exit code, reporting errors:
    /// expected failures exit 1 with the red/yellow report, usage errors
    /// exit 2 with clap's rendering, anything else is a defect and exits 70
    /// undisguised.
    pub fn report(&self, result: Result<(), OpsError>) -> ExitCode {
        let err = match result {
            Ok(()) => return ExitCode::SUCCESS,
            Err(err) => err,
        };
        match &err {
            OpsError::Invocation(parse) => {
                use clap::error::ErrorKind;
                let _ = parse.print();
                match parse.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                    _ => ExitCode::from(2),
                }
            }
            _ if is_expected(&err) => {
                for attempt in err.attempts() {
                    tracing::debug!("failed attempt: {}", attempt);
                }
                eprintln!("{}", err.to_string().style(Style::new().bold().red()));
                if let Some(hint) = hint_of(&err) {
                    eprintln!("{}", hint.style(Style::new().bold().yellow()));
                }
                ExitCode::from(1)
            }
            _ => {
                tracing::error!("unhandled error: {}", err);
                eprintln!("internal error: {err:?}");
                ExitCode::from(70)
            }
        }
    }

    fn dispatch(
        &self,
        mux: &Mux,
        compiled: &clap::Command,
        matches: &ArgMatches,
    ) -> Result<(), OpsError> {
        match matches.subcommand() {
            None => {
                // Bare mux: list its children with one-line summaries.
                let mut help = compiled.clone();
                help.print_long_help()
                    .map_err(|e| OpsError::internal(format!("help rendering: {e}")))?;
                Ok(())
            }
            Some((name, sub_matches)) => {
                let child = mux
                    .children()
                    .iter()
                    .find(|(child_name, _)| child_name == name)
                    .map(|(_, node)| node)
                    .ok_or_else(|| {
                        OpsError::internal(format!("parsed subcommand not in tree: {name}"))
                    })?;
                let sub_compiled = compiled.find_subcommand(name).ok_or_else(|| {
                    OpsError::internal(format!("parsed subcommand not compiled: {name}"))
                })?;
                match child {
                    CommandNode::Mux(inner) => self.dispatch(inner, sub_compiled, sub_matches),
                    CommandNode::Command(spec) => self.run_command(spec, sub_matches),
                }
            }
        }
    }

    fn run_command(&self, spec: &Arc<CommandSpec>, matches: &ArgMatches) -> Result<(), OpsError> {
        let bound = spec.schema().from_matches(matches)?;
        let dry_run = mode_flag(matches, "dry-run");
        let show_commands = mode_flag(matches, "show-commands");
        if spec.is_simple() {
            if dry_run || show_commands {
                return crate::error::fail_hint(
                    format!("{} is not a sequence command", self.display_name(spec)),
                    "--dry-run and --show-commands only apply to sequence commands",
                );
            }
            return spec.run_simple(&bound);
        }

        let mode = if show_commands {
            ExecutionMode::ShowCommands
        } else if dry_run {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Live
        };
        tracing::debug!(command = %self.display_name(spec), ?mode, "building sequence");
        let mut ops = OperationSequence::with_paths(self.paths.clone());
        spec.build_sequence(&mut ops, &bound)?;
        ops.run(mode).map(|_| ())
    }

    fn display_name(&self, spec: &Arc<CommandSpec>) -> String {
        self.paths
            .dotted(spec)
            .unwrap_or_else(|| spec.summary().to_string())
    }

    fn to_clap(&self) -> clap::Command {
        mux_to_clap(&self.program, &self.root, false)
    }
}

fn collect_paths(
    mux: &Mux,
    path: Vec<String>,
    map: &mut HashMap<CommandId, Vec<String>>,
) -> Result<(), OpsError> {
    for (name, node) in mux.children() {
        let mut child_path = path.clone();
        child_path.push(name.clone());
        match node {
            CommandNode::Mux(inner) => collect_paths(inner, child_path, map)?,
            CommandNode::Command(spec) => {
                // First registration wins: the earliest mention is the
                // canonical path when a spec is mounted in two places.
                map.entry(CommandId::of(spec)).or_insert(child_path);
            }
        }
    }
    Ok(())
}

fn mux_to_clap(name: &str, mux: &Mux, mode_flags_inherited: bool) -> clap::Command {
    let mut command = clap::Command::new(name.to_string()).about(mux.summary().to_string());
    let mut inherited = mode_flags_inherited;
    if !inherited && mux.has_sequence() {
        command = command.args(mode_flags(true));
        inherited = true;
    }
    for (child_name, node) in mux.children() {
        command = command.subcommand(match node {
            CommandNode::Mux(inner) => mux_to_clap(child_name, inner, inherited),
            CommandNode::Command(spec) => spec_to_clap(child_name, spec, inherited),
        });
    }
    command
}

fn spec_to_clap(name: &str, spec: &Arc<CommandSpec>, mode_flags_inherited: bool) -> clap::Command {
    let mut command = clap::Command::new(name.to_string())
        .about(spec.summary().to_string())
        .args(spec.schema().to_clap_args());
    if spec.is_sequence() && !mode_flags_inherited {
        command = command.args(mode_flags(false));
    }
    command
}

fn mode_flags(global: bool) -> [Arg; 2] {
    [
        Arg::new("dry-run")
            .long("dry-run")
            .action(ArgAction::SetTrue)
            .global(global)
            .help("declare and print the operation structure without running it"),
        Arg::new("show-commands")
            .long("show-commands")
            .action(ArgAction::SetTrue)
            .global(global)
            .conflicts_with("dry-run")
            .help("print each step's canonical invocation without running anything"),
    ]
}

fn mode_flag(matches: &ArgMatches, name: &str) -> bool {
    matches
        .try_get_one::<bool>(name)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

/// Whether an error is a deliberate, user-facing failure (directly or as
/// the primary cause of an aggregate or cleanup combination).
fn is_expected(err: &OpsError) -> bool {
    match err {
        OpsError::Failed { .. } => true,
        OpsError::AllAttemptsFailed { attempts } => attempts.last().is_some_and(is_expected),
        OpsError::CleanupFailed { primary, .. } => is_expected(primary),
        _ => false,
    }
}

fn hint_of(err: &OpsError) -> Option<&str> {
    match err {
        OpsError::Failed { hint, .. } => hint.as_deref(),
        OpsError::AllAttemptsFailed { attempts } => attempts.last().and_then(hint_of),
        OpsError::CleanupFailed { primary, .. } => hint_of(primary),
        _ => None,
    }
}
