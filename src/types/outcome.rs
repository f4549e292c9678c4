use std::fmt;

use super::Value;

/// The raw value a script evaluated to, together with the verdict the
/// configured [`ResultEvaluator`](crate::ResultEvaluator) derived from it.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ExecutionOutcome {
    value: Value,
    passed: bool,
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "passed" } else { "failed" };
        write!(f, "{} ({verdict})", self.value)
    }
}

impl ExecutionOutcome {
    pub fn new(value: Value, passed: bool) -> Self {
        Self { value, passed }
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}
