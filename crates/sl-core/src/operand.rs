//! Dynamic step operands
//!
//! `to`, `value`, `duration` and `condition` fields are resolved lazily when
//! the step executes, never at compile time. An operand is either a literal,
//! a named reference into the side-effect table, or a zero-argument function.

use crate::callback::{CallbackFuture, CallbackResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Zero-argument function producing an operand value
pub type OperandFn = Arc<dyn Fn() -> CallbackFuture + Send + Sync>;

/// A lazily resolved step field
#[derive(Clone)]
pub enum Operand {
    /// Used as-is
    Literal(Value),
    /// Result of calling the named side-effect function with no argument
    Named(String),
    /// Result of calling the function
    Func(OperandFn),
}

impl Operand {
    /// Reference a function in the side-effect table
    pub fn named(name: impl Into<String>) -> Self {
        Operand::Named(name.into())
    }

    /// Wrap a synchronous function
    pub fn func<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Operand::Func(Arc::new(move || {
            let value = f();
            Box::pin(async move { Ok(value) }) as CallbackFuture
        }))
    }

    /// Wrap an asynchronous function
    pub fn async_func<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        Operand::Func(Arc::new(move || Box::pin(f()) as CallbackFuture))
    }

    /// Check if this operand is a plain literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }

    /// Name of the referenced side-effect function, if any
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Operand::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Operand::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Operand::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Literal(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Literal(Value::from(value))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Literal(Value::from(value))
    }
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand::Literal(Value::from(value))
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Named(name.to_string())
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Named(name)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Literal(Value::Bool(value))
    }
}

/// A bare string is a named reference; anything else is a literal.
/// `From<&str>` follows the same rule.
impl<'de> Deserialize<'de> for Operand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(name) => Operand::Named(name),
            other => Operand::Literal(other),
        })
    }
}

/// Destination of a `move`: absolute, or relative to the live value
#[derive(Debug, Clone)]
pub enum ToValue {
    Absolute(Operand),
    /// Current value plus the operand
    Inc(Operand),
    /// Current value minus the operand
    Dec(Operand),
}

impl ToValue {
    pub fn inc(delta: impl Into<Operand>) -> Self {
        ToValue::Inc(delta.into())
    }

    pub fn dec(delta: impl Into<Operand>) -> Self {
        ToValue::Dec(delta.into())
    }

    /// The operand regardless of relativity
    pub fn operand(&self) -> &Operand {
        match self {
            ToValue::Absolute(op) | ToValue::Inc(op) | ToValue::Dec(op) => op,
        }
    }
}

impl From<Operand> for ToValue {
    fn from(op: Operand) -> Self {
        ToValue::Absolute(op)
    }
}

impl From<f64> for ToValue {
    fn from(value: f64) -> Self {
        ToValue::Absolute(value.into())
    }
}

impl From<i64> for ToValue {
    fn from(value: i64) -> Self {
        ToValue::Absolute(value.into())
    }
}

impl<'de> Deserialize<'de> for ToValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        if let Value::Object(obj) = &value {
            if obj.len() == 1 {
                if let Some(delta) = obj.get("inc") {
                    let op = Operand::deserialize(delta.clone()).map_err(D::Error::custom)?;
                    return Ok(ToValue::Inc(op));
                }
                if let Some(delta) = obj.get("dec") {
                    let op = Operand::deserialize(delta.clone()).map_err(D::Error::custom)?;
                    return Ok(ToValue::Dec(op));
                }
            }
        }

        let op = Operand::deserialize(value).map_err(D::Error::custom)?;
        Ok(ToValue::Absolute(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_is_named_reference() {
        let op: Operand = serde_json::from_value(json!("brightness")).unwrap();
        assert_eq!(op.as_named(), Some("brightness"));

        let op: Operand = serde_json::from_value(json!(0.5)).unwrap();
        assert!(op.is_literal());
    }

    #[test]
    fn test_relative_to() {
        let to: ToValue = serde_json::from_value(json!({"inc": 2})).unwrap();
        assert!(matches!(to, ToValue::Inc(Operand::Literal(_))));

        let to: ToValue = serde_json::from_value(json!({"dec": "step_size"})).unwrap();
        assert!(matches!(to, ToValue::Dec(Operand::Named(_))));

        let to: ToValue = serde_json::from_value(json!(1.0)).unwrap();
        assert!(matches!(to, ToValue::Absolute(_)));
    }

    #[test]
    fn test_func_operands() {
        let Operand::Func(f) = Operand::func(|| json!(42)) else {
            panic!("Expected Func operand");
        };
        assert_eq!(tokio_test::block_on(f()), Ok(json!(42)));

        let Operand::Func(f) = Operand::async_func(|| async { Ok(json!(true)) }) else {
            panic!("Expected Func operand");
        };
        assert_eq!(tokio_test::block_on(f()), Ok(json!(true)));
    }
}
