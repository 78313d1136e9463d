//! Error types for the operation orchestration kernel.

use thiserror::Error;

/// Violations of a command's declared parameter schema, raised while the
/// command tree is being registered, before any invocation happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate parameter name: {0}")]
    DuplicateName(String),

    #[error("variadic parameter {0} must be the last parameter")]
    VariadicNotLast(String),

    #[error("at most one variadic parameter is allowed (second: {0})")]
    MultipleVariadic(String),

    #[error("parameter {0} without a default must precede parameters with defaults")]
    RequiredAfterOptional(String),

    #[error("boolean parameter {0} must be a flag")]
    BoolPositional(String),

    #[error("boolean flag {0} must default to false")]
    BoolDefaultTrue(String),

    #[error("parameter {0} with a default must be a flag")]
    DefaultedPositional(String),

    #[error("flag {0} must declare a default")]
    FlagWithoutDefault(String),

    #[error("parameter name {0} is reserved")]
    ReservedName(String),
}

/// Failures surfaced by operations, sequences, and the invoker.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A deliberately raised, user-facing failure with an optional
    /// remediation hint. The invoker formats this and exits 1.
    #[error("command failed: {message}")]
    Failed {
        message: String,
        hint: Option<String>,
    },

    /// Every fallback strategy for a single goal failed. The last attempt
    /// is the primary cause; the earlier ones stay inspectable.
    #[error("{}", primary_attempt(attempts))]
    AllAttemptsFailed { attempts: Vec<OpsError> },

    /// A context release failed while an earlier error was propagating.
    /// The propagating error remains the primary cause.
    #[error("{primary} (cleanup also failed: {cleanup})")]
    CleanupFailed {
        primary: Box<OpsError>,
        cleanup: Box<OpsError>,
    },

    #[error("invalid command schema: {0}")]
    Schema(#[from] SchemaError),

    /// Invocation-time parse or usage error, rendered by clap.
    #[error("{0}")]
    Invocation(#[from] clap::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// A programming defect, e.g. a cleanup-stack underflow. Never mapped
    /// to the user-facing exit convention.
    #[error("internal error: {0}")]
    Internal(String),
}

fn primary_attempt(attempts: &[OpsError]) -> String {
    match attempts.last() {
        Some(primary) => format!("all {} attempts failed: {}", attempts.len(), primary),
        None => "all attempts failed".to_string(),
    }
}

impl OpsError {
    pub fn failed(message: impl Into<String>) -> Self {
        OpsError::Failed {
            message: message.into(),
            hint: None,
        }
    }

    pub fn failed_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        OpsError::Failed {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        OpsError::Internal(message.into())
    }

    /// The underlying attempts when this is an aggregate failure.
    pub fn attempts(&self) -> &[OpsError] {
        match self {
            OpsError::AllAttemptsFailed { attempts } => attempts,
            _ => &[],
        }
    }
}

/// Raise a deliberate failure.
pub fn fail<T>(message: impl Into<String>) -> Result<T, OpsError> {
    Err(OpsError::failed(message))
}

/// Raise a deliberate failure with a remediation hint.
pub fn fail_hint<T>(message: impl Into<String>, hint: impl Into<String>) -> Result<T, OpsError> {
    Err(OpsError::failed_with_hint(message, hint))
}

/// Run fallback strategies in order, returning the first success. When all
/// fail, every error is preserved in an aggregate with the last as the
/// primary cause.
pub fn first_success<T>(
    strategies: impl IntoIterator<Item = Box<dyn FnOnce() -> Result<T, OpsError>>>,
) -> Result<T, OpsError> {
    let mut attempts = Vec::new();
    for strategy in strategies {
        match strategy() {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!("fallback strategy failed: {}", e);
                attempts.push(e);
            }
        }
    }
    Err(OpsError::AllAttemptsFailed { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_reports_last_attempt_as_primary() {
        let err = OpsError::AllAttemptsFailed {
            attempts: vec![OpsError::failed("first"), OpsError::failed("second")],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("second"));
        assert!(rendered.contains("2 attempts"));
        assert_eq!(err.attempts().len(), 2);
    }

    #[test]
    fn first_success_short_circuits() {
        let result: Result<i32, _> = first_success(vec![
            Box::new(|| fail("nope")) as Box<dyn FnOnce() -> Result<i32, OpsError>>,
            Box::new(|| Ok(7)),
            Box::new(|| panic!("must not be reached")),
        ]);
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn cleanup_failure_keeps_original_primary() {
        let err = OpsError::CleanupFailed {
            primary: Box::new(OpsError::failed("boom")),
            cleanup: Box::new(OpsError::failed("release exploded")),
        };
        let rendered = err.to_string();
        assert!(rendered.starts_with("command failed: boom"));
        assert!(rendered.contains("release exploded"));
    }
}
