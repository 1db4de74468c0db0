//! Run-time errors
//!
//! These are fatal to the current run: the failing step is not completed
//! and the error reaches the caller of `start()` or `next_step()`.
//! Non-fatal conditions are logged as warnings instead.

use serde_json::Value;
use sl_core::CallbackError;
use sl_values::DriverError;
use thiserror::Error;

/// Interpreter errors
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    #[error("unknown value target: {0}")]
    UnknownTarget(String),

    #[error("invalid {field}: {value}")]
    InvalidOperand { field: &'static str, value: Value },

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error("value driver error: {0}")]
    Driver(DriverError),
}

impl From<DriverError> for MachineError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::UnknownTarget(target) => MachineError::UnknownTarget(target),
            other => MachineError::Driver(other),
        }
    }
}

/// Result type for interpreter operations
pub type MachineResult<T> = Result<T, MachineError>;
