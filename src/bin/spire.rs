//! Spire CLI binary.
//!
//! Wires the local-automation command surface onto the orchestration
//! kernel: simple probes and execs, plus staging sequences that exercise
//! contexts, nesting, and retries.

use spire::command::{CommandRegistry, CommandSpec, Mux, Parameter, ParameterSchema};
use spire::config::{ConfigLoader, ToolConfig};
use spire::context::ContextResource;
use spire::error::{fail_hint, OpsError};
use spire::logging::init_logging;
use spire::parallel::concurrent_pair;
use spire::retry::RetryPolicy;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

fn main() -> ExitCode {
    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{e}");
        return ExitCode::from(1);
    }
    debug!("spire starting");

    // Registration errors are startup defects: abort before any invocation.
    let registry = match build_registry(&config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("command registration failed: {e}");
            return ExitCode::from(70);
        }
    };
    registry.main_invoke()
}

fn build_registry(config: &ToolConfig) -> Result<CommandRegistry, OpsError> {
    let retry_pause = config.retry.pause();

    let version = CommandSpec::simple(
        "print the toolkit version",
        ParameterSchema::empty(),
        |_args| {
            println!("spire {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        },
    );

    let exec = CommandSpec::simple(
        "run a local command",
        ParameterSchema::new(vec![Parameter::variadic("argv")])?,
        |args| exec_local(args.rest("argv")),
    );

    let check_path = CommandSpec::simple(
        "verify that a path exists",
        ParameterSchema::new(vec![Parameter::required("path")])?,
        |args| {
            let path = args.str("path")?;
            if Path::new(path).exists() {
                Ok(())
            } else {
                fail_hint(
                    format!("path does not exist: {path}"),
                    "wait for the producing step, or inspect the plan with --dry-run",
                )
            }
        },
    );

    let stage_prepare = CommandSpec::sequence(
        "prepare a staging directory",
        ParameterSchema::new(vec![
            Parameter::required("dir"),
            Parameter::optional("marker", Some("READY")),
        ])?,
        {
            let check_path = Arc::clone(&check_path);
            move |ops, args| {
                let dir = args.str("dir")?.to_string();
                let marker_path = Path::new(&dir).join(args.str("marker")?);

                ops.add_operation(format!("create staging directory {dir}"), {
                    let dir = dir.clone();
                    move || {
                        std::fs::create_dir_all(&dir)
                            .map_err(|e| OpsError::failed(format!("cannot create {dir}: {e}")))
                    }
                });

                ops.add_operation("write paired seed files", {
                    let dir = dir.clone();
                    move || {
                        let first = Path::new(&dir).join("seed.a");
                        let second = Path::new(&dir).join("seed.b");
                        concurrent_pair(|| write_seed(&first), || write_seed(&second))
                            .map(|_| ())
                    }
                });

                ops.add_operation(format!("write marker {}", marker_path.display()), {
                    let marker_path = marker_path.clone();
                    move || {
                        std::fs::write(&marker_path, b"ready\n").map_err(|e| {
                            OpsError::failed(format!(
                                "cannot write {}: {e}",
                                marker_path.display()
                            ))
                        })
                    }
                });

                let marker_token = marker_path.to_string_lossy().into_owned();
                ops.add_retrying_command(
                    &check_path,
                    &[marker_token.as_str()],
                    RetryPolicy::new(Duration::from_secs(10)).with_pause(retry_pause),
                )?;
                Ok(())
            }
        },
    );

    let stage_all = CommandSpec::sequence(
        "stage a scratch workspace end to end",
        ParameterSchema::new(vec![Parameter::required("dir"), Parameter::switch("keep")])?,
        {
            let stage_prepare = Arc::clone(&stage_prepare);
            move |ops, args| {
                let dir = args.str("dir")?.to_string();
                let keep = args.flag("keep");
                let stage_prepare = Arc::clone(&stage_prepare);
                ops.context(
                    "staging workspace",
                    ScratchDir::new(PathBuf::from(&dir), keep),
                    |ops, _scratch| {
                        ops.add_subcommand(&stage_prepare, &[dir.as_str()])?;
                        ops.pause("settle", Duration::from_millis(200));
                        Ok(())
                    },
                )
            }
        },
    );

    let root = Mux::new("administrative toolkit for composing and running operation sequences")
        .command("version", version)
        .command("exec", exec)
        .mux(
            "check",
            Mux::new("verification probes").command("path", check_path),
        )
        .mux(
            "stage",
            Mux::new("staging workflows")
                .command("prepare", stage_prepare)
                .command("all", stage_all),
        );

    CommandRegistry::new("spire", root)
}

fn exec_local(argv: &[String]) -> Result<(), OpsError> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| OpsError::failed("no command given"))?;
    let status = std::process::Command::new(program)
        .args(rest)
        .status()
        .map_err(|e| {
            OpsError::failed_with_hint(
                format!("cannot start {program}: {e}"),
                "check that the command exists on PATH",
            )
        })?;
    if status.success() {
        Ok(())
    } else {
        fail_hint(
            format!("{program} exited with {status}"),
            "inspect the command output above",
        )
    }
}

fn write_seed(path: &Path) -> Result<(), OpsError> {
    std::fs::write(path, b"seed\n")
        .map_err(|e| OpsError::failed(format!("cannot write {}: {e}", path.display())))
}

/// A staging directory held for the span of a sequence block. Kept in
/// place on failure (and with `--keep`) so the operator can inspect it.
struct ScratchDir {
    dir: PathBuf,
    keep: bool,
}

impl ScratchDir {
    fn new(dir: PathBuf, keep: bool) -> Self {
        Self { dir, keep }
    }
}

impl ContextResource for ScratchDir {
    type Handle = PathBuf;

    fn acquire(&self) -> Result<PathBuf, OpsError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            OpsError::failed(format!("cannot create {}: {e}", self.dir.display()))
        })?;
        Ok(self.dir.clone())
    }

    fn release(&self, handle: PathBuf, failure: Option<&OpsError>) -> Result<(), OpsError> {
        if self.keep || failure.is_some() {
            info!("keeping staging workspace {}", handle.display());
            return Ok(());
        }
        std::fs::remove_dir_all(&handle)
            .map_err(|e| OpsError::failed(format!("cannot remove {}: {e}", handle.display())))
    }
}
