//! Spire: an administrator-toolkit kernel.
//!
//! The crate turns a body of admin logic into named, composable,
//! inspectable, exception-safe sequences of steps, executable live, as a
//! dry-run, or as a printed command listing, behind a declarative CLI
//! surface. Admin modules build on the same small set of pieces:
//!
//! - [`sequence::OperationSequence`] — ordered steps, nested sequences,
//!   and context scopes, built once per invocation and executed once.
//! - [`context::ContextResource`] — acquire/release capability with
//!   guaranteed release on every path.
//! - [`retry`] — opt-in bounded polling for eventually-consistent checks.
//! - [`parallel::concurrent_pair`] — the one sanctioned concurrency shape.
//! - [`command`] — a static tree of named subcommands with declared
//!   parameter schemas, and the invoker that dispatches them.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod parallel;
pub mod retry;
pub mod sequence;
