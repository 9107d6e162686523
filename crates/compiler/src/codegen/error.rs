//! Code generation error types.

use crate::definition::{Sort, SortCategory};

/// Error type for code generation operations.
///
/// The definition is assumed valid, so every `Logic` error means the
/// generator was handed inconsistent input or has a bug. Generation stops
/// at the first one.
#[derive(Debug)]
pub enum CodeGenError {
    /// A logical error in code generation (e.g., missing sort declaration)
    Logic(String),
    /// A formatting error when writing IR
    Format(std::fmt::Error),
}

impl CodeGenError {
    /// A sort whose category could not be computed reached a dispatch point.
    pub(crate) fn uncomputed(sort: &Sort) -> Self {
        CodeGenError::Logic(format!(
            "CodeGen: sort '{}' has no computed category. This is a compiler bug.",
            sort
        ))
    }

    pub(crate) fn unexpected_category(category: SortCategory, context: &str) -> Self {
        CodeGenError::Logic(format!(
            "CodeGen: category {} is not valid for {}. This is a compiler bug.",
            category, context
        ))
    }
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Logic(s) => write!(f, "{}", s),
            CodeGenError::Format(e) => write!(f, "IR generation error: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<String> for CodeGenError {
    fn from(s: String) -> Self {
        CodeGenError::Logic(s)
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}
