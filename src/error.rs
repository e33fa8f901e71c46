use std::fmt;

use serde::Serialize;

/// Coarse classification every error in the crate maps onto, so an outer
/// API layer can pick a response without matching individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    NotFound,
    ValidationFailure,
    StateConflict,
    DependencyFailure,
}

impl ErrorCategory {
    /// HTTP-equivalent status for the category.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCategory::NotFound => 404,
            ErrorCategory::ValidationFailure | ErrorCategory::StateConflict => 400,
            ErrorCategory::DependencyFailure => 500,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::ValidationFailure => "VALIDATION_FAILURE",
            ErrorCategory::StateConflict => "STATE_CONFLICT",
            ErrorCategory::DependencyFailure => "DEPENDENCY_FAILURE",
        };
        f.write_str(name)
    }
}
