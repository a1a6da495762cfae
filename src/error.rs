//! Error types.
//!
//! Validator findings are data first: a `ValidationError` carries a machine
//! readable `kind` and `path`, with the human message layered on top. Errors
//! crossing the collaborator seam (arithmetic evaluator, dice roller) and the
//! pre-commit formula check get their own types.

use crate::id::StatId;
use thiserror::Error;

/// The taxonomy of validator findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field is missing or empty.
    Structural,
    /// Two entries of a collection share an id.
    DuplicateId,
    /// A numeric bound pair has `min > max`.
    Range,
    /// An inline enum option list exceeds the entry limit.
    OptionLimitExceeded,
    /// Two options of one enum share a `value`.
    DuplicateOptionValue,
    /// A calculated-stat formula depends on itself, directly or indirectly.
    CircularDependency,
    /// A token points at an id that does not exist.
    UnresolvedReference,
    /// A formula references a stat whose type cannot be read as a value.
    TypeMismatch,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Structural => "structural",
            ErrorKind::DuplicateId => "duplicate id",
            ErrorKind::Range => "range",
            ErrorKind::OptionLimitExceeded => "option limit exceeded",
            ErrorKind::DuplicateOptionValue => "duplicate option value",
            ErrorKind::CircularDependency => "circular dependency",
            ErrorKind::UnresolvedReference => "unresolved reference",
            ErrorKind::TypeMismatch => "type mismatch",
        };
        write!(f, "{name}")
    }
}

/// One validator finding.
///
/// The validator never stops at the first problem; a validation pass yields
/// a flat, order-stable list of these.
///
/// # Examples
///
/// ```rust
/// use sheetforge::{ErrorKind, ValidationError};
///
/// let err = ValidationError::new(
///     ErrorKind::Range,
///     "stats[0]",
///     "min (10) is greater than max (5)",
/// );
/// assert_eq!(err.to_string(), "stats[0]: range: min (10) is greater than max (5)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub kind: ErrorKind,

    /// Where the problem sits, e.g. `stats[3].formula`.
    pub path: String,

    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.path, self.kind, self.message)
    }
}

/// Why a proposed formula edit was refused.
///
/// The schema is left untouched when any of these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaEditError {
    /// The proposed formula would make the stat depend on itself.
    #[error("formula would introduce a circular dependency through stat {0}")]
    WouldCycle(StatId),

    /// No stat with this id exists.
    #[error("no stat with id {0}")]
    UnknownStat(StatId),

    /// The stat exists but is not calculated.
    #[error("stat {0} is not a calculated stat")]
    NotCalculated(StatId),
}

/// Failure reported by the external arithmetic evaluator.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by the external dice roller.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct RollError {
    pub message: String,
}

impl RollError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(
            ErrorKind::DuplicateId,
            "stats",
            "stat id 4 appears at indices 0 and 3",
        );
        let display = err.to_string();
        assert!(display.contains("stats"));
        assert!(display.contains("duplicate id"));
        assert!(display.contains("indices 0 and 3"));
    }

    #[test]
    fn test_formula_edit_error_display() {
        let err = FormulaEditError::WouldCycle(StatId::new(5));
        assert!(err.to_string().contains("circular"));
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn test_eval_error_message() {
        let err = EvalError::new("unexpected token '+'");
        assert_eq!(err.to_string(), "unexpected token '+'");
    }
}
