//! Declared parameter schemas and argument binding.
//!
//! Every command declares its parameters up front as an ordered
//! [`ParameterSchema`]; violations are raised when the schema is built,
//! before any invocation. The schema compiles to clap arguments for
//! parsing and renders bound arguments back into a canonical invocation
//! string for ShowCommands.

use crate::error::{OpsError, SchemaError};
use clap::{Arg, ArgAction, ArgMatches};
use std::collections::HashSet;

/// Names claimed by the execution-mode flags and clap itself.
const RESERVED_NAMES: [&str; 3] = ["dry-run", "show-commands", "help"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// A required positional token.
    Positional,
    /// `--name VALUE` or a boolean presence flag.
    Flag,
    /// Trailing parameter consuming all remaining tokens verbatim.
    Variadic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamDefault {
    /// No default; the parameter must be supplied.
    None,
    /// String flag default. `None` means the flag may be omitted entirely.
    Str(Option<String>),
    /// Presence flag default; must be `false`.
    Bool(bool),
}

#[derive(Clone, Debug)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    default: ParamDefault,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParamKind, default: ParamDefault) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }

    /// Required positional parameter.
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Positional, ParamDefault::None)
    }

    /// Optional `--name VALUE` flag defaulting to a string or to nothing.
    pub fn optional(name: impl Into<String>, default: Option<&str>) -> Self {
        Self::new(
            name,
            ParamKind::Flag,
            ParamDefault::Str(default.map(str::to_string)),
        )
    }

    /// Boolean presence flag (defaults to false).
    pub fn switch(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Flag, ParamDefault::Bool(false))
    }

    /// Trailing variadic parameter.
    pub fn variadic(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Variadic, ParamDefault::None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default(&self) -> &ParamDefault {
        &self.default
    }
}

/// Ordered parameter declarations for one command.
#[derive(Clone, Debug, Default)]
pub struct ParameterSchema {
    params: Vec<Parameter>,
}

impl ParameterSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(params: Vec<Parameter>) -> Result<Self, SchemaError> {
        let mut names = HashSet::new();
        let mut saw_default = false;
        let mut variadic: Option<String> = None;
        for param in &params {
            if RESERVED_NAMES.contains(&param.name.as_str()) {
                return Err(SchemaError::ReservedName(param.name.clone()));
            }
            if !names.insert(param.name.clone()) {
                return Err(SchemaError::DuplicateName(param.name.clone()));
            }
            if let Some(ref earlier) = variadic {
                if param.kind == ParamKind::Variadic {
                    return Err(SchemaError::MultipleVariadic(param.name.clone()));
                }
                return Err(SchemaError::VariadicNotLast(earlier.clone()));
            }
            match param.kind {
                ParamKind::Variadic => variadic = Some(param.name.clone()),
                ParamKind::Positional => match param.default {
                    ParamDefault::None => {
                        if saw_default {
                            return Err(SchemaError::RequiredAfterOptional(param.name.clone()));
                        }
                    }
                    ParamDefault::Str(_) => {
                        return Err(SchemaError::DefaultedPositional(param.name.clone()));
                    }
                    ParamDefault::Bool(_) => {
                        return Err(SchemaError::BoolPositional(param.name.clone()));
                    }
                },
                ParamKind::Flag => match param.default {
                    ParamDefault::None => {
                        return Err(SchemaError::FlagWithoutDefault(param.name.clone()));
                    }
                    ParamDefault::Bool(true) => {
                        return Err(SchemaError::BoolDefaultTrue(param.name.clone()));
                    }
                    ParamDefault::Str(_) | ParamDefault::Bool(false) => saw_default = true,
                },
            }
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Compile the schema into clap arguments.
    pub(crate) fn to_clap_args(&self) -> Vec<Arg> {
        self.params
            .iter()
            .map(|param| {
                let name = param.name.clone();
                match (param.kind, &param.default) {
                    (ParamKind::Positional, _) => Arg::new(name.clone())
                        .value_name(name.to_uppercase())
                        .required(true),
                    (ParamKind::Flag, ParamDefault::Bool(_)) => Arg::new(name.clone())
                        .long(name)
                        .action(ArgAction::SetTrue),
                    (ParamKind::Flag, ParamDefault::Str(Some(default))) => Arg::new(name.clone())
                        .long(name)
                        .num_args(1)
                        .value_name("VALUE")
                        .default_value(default.clone()),
                    (ParamKind::Flag, _) => Arg::new(name.clone())
                        .long(name)
                        .num_args(1)
                        .value_name("VALUE"),
                    (ParamKind::Variadic, _) => Arg::new(name.clone())
                        .value_name(name.to_uppercase())
                        .num_args(0..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true),
                }
            })
            .collect()
    }

    /// Extract typed argument values from parsed matches.
    pub(crate) fn from_matches(&self, matches: &ArgMatches) -> Result<BoundArgs, OpsError> {
        let mut bound = BoundArgs::default();
        for param in &self.params {
            match (param.kind, &param.default) {
                (ParamKind::Flag, ParamDefault::Bool(_)) => {
                    let value = matches
                        .try_get_one::<bool>(&param.name)
                        .map_err(|e| OpsError::internal(format!("argument lookup: {e}")))?
                        .copied()
                        .unwrap_or(false);
                    bound.insert(&param.name, ArgValue::Bool(value));
                }
                (ParamKind::Variadic, _) => {
                    let values = matches
                        .try_get_many::<String>(&param.name)
                        .map_err(|e| OpsError::internal(format!("argument lookup: {e}")))?
                        .map(|values| values.cloned().collect())
                        .unwrap_or_default();
                    bound.insert(&param.name, ArgValue::List(values));
                }
                _ => {
                    let value = matches
                        .try_get_one::<String>(&param.name)
                        .map_err(|e| OpsError::internal(format!("argument lookup: {e}")))?;
                    if let Some(value) = value {
                        bound.insert(&param.name, ArgValue::Str(value.clone()));
                    }
                }
            }
        }
        Ok(bound)
    }

    /// Render bound arguments under a canonical command path, producing the
    /// equivalent-invocation string shown by ShowCommands.
    pub(crate) fn render(&self, path: &[String], bound: &BoundArgs) -> String {
        let mut tokens: Vec<String> = path.to_vec();
        for param in &self.params {
            match (param.kind, &param.default) {
                (ParamKind::Positional, _) => {
                    if let Some(value) = bound.opt_str(&param.name) {
                        tokens.push(value.to_string());
                    }
                }
                (ParamKind::Flag, ParamDefault::Bool(_)) => {
                    if bound.flag(&param.name) {
                        tokens.push(format!("--{}", param.name));
                    }
                }
                (ParamKind::Flag, ParamDefault::Str(default)) => {
                    if let Some(value) = bound.opt_str(&param.name) {
                        if default.as_deref() != Some(value) {
                            tokens.push(format!("--{}={}", param.name, value));
                        }
                    }
                }
                (ParamKind::Flag, ParamDefault::None) => {}
                (ParamKind::Variadic, _) => {
                    tokens.extend(bound.rest(&param.name).iter().cloned());
                }
            }
        }
        tokens.join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Bool(bool),
    List(Vec<String>),
}

/// Arguments bound against a schema, keyed by parameter name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundArgs {
    values: Vec<(String, ArgValue)>,
}

impl BoundArgs {
    fn insert(&mut self, name: &str, value: ArgValue) {
        self.values.push((name.to_string(), value));
    }

    fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Required string value. Missing or mistyped lookups are programming
    /// defects (the schema guaranteed presence), reported as internal.
    pub fn str(&self, name: &str) -> Result<&str, OpsError> {
        match self.get(name) {
            Some(ArgValue::Str(value)) => Ok(value),
            _ => Err(OpsError::internal(format!(
                "missing bound argument: {name}"
            ))),
        }
    }

    /// Optional string value (a flag defaulting to nothing).
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ArgValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Boolean presence flag; absent means false.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ArgValue::Bool(true)))
    }

    /// Variadic tail; absent means empty.
    pub fn rest(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(ArgValue::List(values)) => values,
            _ => &[],
        }
    }
}
