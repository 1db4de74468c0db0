//! Function types shared by the side-effect table and dynamic operands

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Result of invoking a side-effect function
pub type CallbackResult = Result<Value, CallbackError>;

/// Future returned by every side-effect function
pub type CallbackFuture = Pin<Box<dyn Future<Output = CallbackResult> + Send>>;

/// A named side-effect function taking an optional argument
pub type CallbackFn = Arc<dyn Fn(Option<Value>) -> CallbackFuture + Send + Sync>;

/// Errors raised by side-effect functions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallbackError {
    #[error("callback not found: {0}")]
    NotFound(String),

    #[error("callback failed: {0}")]
    Failed(String),
}
