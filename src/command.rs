//! CLI command tree: declared parameter schemas, Mux/Command nodes, and
//! the invoker that resolves input, binds arguments, and runs commands.

mod invoke;
mod schema;
mod tree;

pub use invoke::CommandRegistry;
pub use schema::{ArgValue, BoundArgs, ParamDefault, ParamKind, Parameter, ParameterSchema};
pub use tree::{CommandNode, CommandPaths, CommandSpec, Mux};
