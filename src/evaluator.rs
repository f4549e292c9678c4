//! Policies turning a script's raw result into a pass/fail verdict.

use std::fmt;

use crate::Value;

/// Decides whether the value a script evaluated to should let the rule pass.
///
/// The rule applies its evaluator twice per lifecycle: to the primary script's
/// result during `execute`, and to the validator script's result when the host
/// checks whether a cached outcome can be reused.
pub trait ResultEvaluator: fmt::Debug + Send + Sync {
    /// `false` when the result should make the rule fail.
    fn is_valid_result(&self, result: &Value) -> bool;
}

/// The built-in policy.
///
/// | result | verdict |
/// |---|---|
/// | `Null` | `false` |
/// | `Bool(b)` | `b` |
/// | `Int` / `Float` | `false` iff equal to zero |
/// | anything else | `true` |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultResultEvaluator;

impl ResultEvaluator for DefaultResultEvaluator {
    fn is_valid_result(&self, result: &Value) -> bool {
        match result {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            // NaN != 0.0, so NaN passes; -0.0 == 0.0, so it fails.
            Value::Float(f) => *f != 0.0,
            Value::String(_) | Value::Array(_) | Value::Map(_) | Value::Opaque(_) => true,
        }
    }
}

/// Passes only when the result equals a fixed expected value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedValueEvaluator {
    expected: Value,
}

impl ExpectedValueEvaluator {
    pub fn new(expected: impl Into<Value>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn expected(&self) -> &Value {
        &self.expected
    }
}

impl ResultEvaluator for ExpectedValueEvaluator {
    fn is_valid_result(&self, result: &Value) -> bool {
        *result == self.expected
    }
}
