use std::fmt;
use thiserror::Error;

/// A single argument whose runtime type differs from the declared one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub name: String,
    pub expected: &'static str,
    pub actual: &'static str,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Argument {} must be {}, not {}",
            self.name, self.expected, self.actual
        )
    }
}

/// Failures reported by the guard wrappers and by limiter configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoratorError {
    /// Caller role does not match the guard's required role
    #[error("Permission denied: role {actual:?} is not {required:?}")]
    PermissionDenied { required: String, actual: String },

    /// One or more arguments have the wrong runtime type
    #[error("TypeError in {function}: {}", join_mismatches(.mismatches))]
    TypeMismatch {
        function: String,
        mismatches: Vec<Mismatch>,
    },

    /// Wrong number of arguments for the declared signature
    #[error("TypeError in {function}: expected {expected} arguments, got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// The wrapped function itself failed or panicked
    #[error("Found error(s) during execution of {function}: {message}")]
    CallFailed { function: String, message: String },

    /// Rate limits must allow at least one call per window
    #[error("Rate limit must be a positive integer")]
    InvalidLimit,
}

impl DecoratorError {
    /// Stable label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DecoratorError::PermissionDenied { .. } => "permission",
            DecoratorError::TypeMismatch { .. } | DecoratorError::ArityMismatch { .. } => "type",
            DecoratorError::CallFailed { .. } => "runtime",
            DecoratorError::InvalidLimit => "config",
        }
    }
}

fn join_mismatches(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
