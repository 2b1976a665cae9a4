//! Error taxonomy for the hashline core (spec §7).
//!
//! Every failure mode the core can produce is a value, never a panic or an
//! exception-style unwind. `HashlineError` is returned from `apply_edits`
//! only for the hard-error cases; tag mismatches are reported as a full
//! `MismatchReport` (see [`crate::core::hashline`]), not as this enum,
//! since they are batch-level, not single-operation, failures.

use thiserror::Error;

/// A single structural (non-recoverable-by-retry) failure in an edit batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashlineError {
    #[error("line {line} is out of range (file has {line_count} lines)")]
    OutOfRange { line: usize, line_count: usize },

    #[error("Replace range is invalid: first line {first} > last line {last}")]
    InvalidRange { first: usize, last: usize },

    #[error("Insert requires after.line < before.line (got after={after}, before={before})")]
    InvalidInsertBounds { after: usize, before: usize },

    #[error("{operator} requires non-empty replacement content")]
    EmptyContent { operator: &'static str },

    #[error("ReplaceText requires non-empty old_text")]
    MissingOldText,

    #[error("text not found (tried exact and fuzzy matching)")]
    NotFound,

    #[error("found {count} occurrences — must be unique")]
    MultipleOccurrences { count: usize, lines: Vec<usize> },

    #[error("old and new text are identical — no change would occur")]
    NoChange,

    #[error("malformed line reference: {0}")]
    RefParse(String),
}

pub type HashlineResult<T> = Result<T, HashlineError>;
