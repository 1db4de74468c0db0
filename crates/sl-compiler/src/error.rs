//! Error types for scenario compilation

use std::fmt;
use thiserror::Error;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileFailure>;

/// Where an error was found
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Position in the flattened program
    pub index: usize,
    /// Innermost block the step came from
    pub block: Option<String>,
    /// Position of the authored entry within its scenario or block
    ///
    /// Set for errors found while flattening, where rejected entries never
    /// reach the flat program and so share its index.
    pub entry: Option<usize>,
}

impl Location {
    /// Location of a step in the flattened program
    pub fn step(index: usize, block: Option<String>) -> Self {
        Self {
            index,
            block,
            entry: None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}", self.index)?;
        match (&self.block, self.entry) {
            (Some(block), Some(entry)) => write!(f, " (block '{}', entry {})", block, entry),
            (Some(block), None) => write!(f, " (block '{}')", block),
            (None, Some(entry)) => write!(f, " (entry {})", entry),
            (None, None) => Ok(()),
        }
    }
}

/// A single compile-time validation failure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum CompileError {
    // Structural errors, found while flattening
    #[error("{at}: invalid step: {reason}")]
    InvalidStep { at: Location, reason: String },

    #[error("{at}: block not found: {block}")]
    BlockNotFound { at: Location, block: String },

    #[error("{at}: circular block reference: {block}")]
    CircularBlock { at: Location, block: String },

    #[error("{at}: label must be a non-empty string")]
    MissingLabel { at: Location },

    #[error("{at}: duplicate label: {label}")]
    DuplicateLabel { at: Location, label: String },

    #[error("{at}: invalid ifJump: {reason}")]
    InvalidIfJump { at: Location, reason: String },

    #[error("{at}: invalid parallel: {reason}")]
    InvalidParallel { at: Location, reason: String },

    // Semantic errors, found on the flat program
    #[error("{at}: missing initial value for target: {target}")]
    MissingInitialValue { at: Location, target: String },

    #[error("{at}: missing callback: {name}")]
    MissingCallback { at: Location, name: String },

    #[error("{at}: unresolved label: {label}")]
    UnresolvedLabel { at: Location, label: String },

    #[error("{at}: ifElse has no matching ifThen")]
    UnmatchedElse { at: Location },

    #[error("{at}: ifThen already has an ifElse")]
    DuplicateElse { at: Location },

    #[error("{at}: ifEnd has no matching ifThen")]
    UnmatchedEnd { at: Location },

    #[error("{at}: unclosed ifThen")]
    UnclosedIf { at: Location },
}

impl CompileError {
    /// Location of the offending step
    pub fn location(&self) -> &Location {
        match self {
            CompileError::InvalidStep { at, .. }
            | CompileError::BlockNotFound { at, .. }
            | CompileError::CircularBlock { at, .. }
            | CompileError::MissingLabel { at }
            | CompileError::DuplicateLabel { at, .. }
            | CompileError::InvalidIfJump { at, .. }
            | CompileError::InvalidParallel { at, .. }
            | CompileError::MissingInitialValue { at, .. }
            | CompileError::MissingCallback { at, .. }
            | CompileError::UnresolvedLabel { at, .. }
            | CompileError::UnmatchedElse { at }
            | CompileError::DuplicateElse { at }
            | CompileError::UnmatchedEnd { at }
            | CompileError::UnclosedIf { at } => at,
        }
    }

    /// Whether the error concerns the shape of the scenario tree
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CompileError::InvalidStep { .. }
                | CompileError::BlockNotFound { .. }
                | CompileError::CircularBlock { .. }
                | CompileError::MissingLabel { .. }
                | CompileError::DuplicateLabel { .. }
                | CompileError::InvalidIfJump { .. }
                | CompileError::InvalidParallel { .. }
        )
    }
}

/// All errors of a failed compilation, de-duplicated
#[derive(Debug, Clone, Error)]
#[error("scenario has {} error(s): {}", .errors.len(), join(.errors))]
pub struct CompileFailure {
    pub errors: Vec<CompileError>,
}

fn join(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let top = Location::step(3, None);
        assert_eq!(top.to_string(), "step 3");

        let nested = Location::step(5, Some("pulse".to_string()));
        assert_eq!(nested.to_string(), "step 5 (block 'pulse')");

        let authored = Location {
            entry: Some(2),
            ..Location::step(0, None)
        };
        assert_eq!(authored.to_string(), "step 0 (entry 2)");

        let authored_nested = Location {
            entry: Some(1),
            ..Location::step(4, Some("pulse".to_string()))
        };
        assert_eq!(authored_nested.to_string(), "step 4 (block 'pulse', entry 1)");
    }

    #[test]
    fn test_failure_message() {
        let failure = CompileFailure {
            errors: vec![
                CompileError::UnclosedIf {
                    at: Location::step(0, None),
                },
                CompileError::MissingCallback {
                    at: Location::step(2, None),
                    name: "beep".to_string(),
                },
            ],
        };

        assert_eq!(
            failure.to_string(),
            "scenario has 2 error(s): step 0: unclosed ifThen; step 2: missing callback: beep"
        );
    }
}
