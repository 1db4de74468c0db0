//! Operand resolution
//!
//! Operands are resolved when their step executes, so a named operand or a
//! function sees the world as it is at that moment.

use crate::error::{MachineError, MachineResult};
use serde_json::Value;
use sl_callbacks::CallbackRegistry;
use sl_core::{Operand, ToValue};
use sl_values::ValueDriver;
use std::time::Duration;

/// Resolve an operand to its value
pub(crate) async fn resolve(callbacks: &CallbackRegistry, operand: &Operand) -> MachineResult<Value> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Named(name) => Ok(callbacks.call(name, None).await?),
        Operand::Func(f) => Ok(f().await?),
    }
}

/// Resolve an operand that must be numeric
pub(crate) async fn resolve_number(
    callbacks: &CallbackRegistry,
    operand: &Operand,
    field: &'static str,
) -> MachineResult<f64> {
    let value = resolve(callbacks, operand).await?;
    as_number(&value).ok_or(MachineError::InvalidOperand { field, value })
}

/// Resolve a millisecond duration
pub(crate) async fn resolve_duration(
    callbacks: &CallbackRegistry,
    operand: &Operand,
) -> MachineResult<Duration> {
    let value = resolve(callbacks, operand).await?;
    match as_number(&value).map(|ms| Duration::try_from_secs_f64(ms / 1000.0)) {
        Some(Ok(duration)) => Ok(duration),
        _ => Err(MachineError::InvalidOperand {
            field: "duration",
            value,
        }),
    }
}

/// Resolve a condition by truthiness
pub(crate) async fn resolve_condition(
    callbacks: &CallbackRegistry,
    operand: &Operand,
) -> MachineResult<bool> {
    let value = resolve(callbacks, operand).await?;
    Ok(is_truthy(&value))
}

/// Resolve the destination of a tween against the live value of `target`
pub(crate) async fn resolve_to(
    callbacks: &CallbackRegistry,
    driver: &dyn ValueDriver,
    target: &str,
    to: &ToValue,
) -> MachineResult<f64> {
    let amount = resolve_number(callbacks, to.operand(), "to").await?;
    let current = || {
        driver
            .get(target)
            .ok_or_else(|| MachineError::UnknownTarget(target.to_string()))
    };

    match to {
        ToValue::Absolute(_) => Ok(amount),
        ToValue::Inc(_) => Ok(current()? + amount),
        ToValue::Dec(_) => Ok(current()? - amount),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Check if a resolved value counts as true
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
