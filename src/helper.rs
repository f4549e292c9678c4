use std::rc::Rc;

use crate::log::{Log, TracingLog};
use crate::types::ExpressionEvaluationError;
use crate::Value;

/// Expression resolving to the build's source encoding.
pub const SOURCE_ENCODING_EXPRESSION: &str = "${project.build.sourceEncoding}";

/// The host build tool's view into the running build.
///
/// A rule receives its helper when it executes. The helper supplies the log
/// script output is forwarded to and resolves host expressions (the build's
/// source encoding, project properties). When a helper key is configured the
/// helper is also bound into the script, which can call `evaluate` on it.
pub trait RuleHelper {
    fn log(&self) -> Rc<dyn Log>;

    /// Resolve a host expression such as `${project.version}`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionEvaluationError`] when the expression cannot be resolved.
    fn evaluate(&self, expression: &str) -> Result<Value, ExpressionEvaluationError>;
}

/// A helper with no build behind it: logs through `tracing` and resolves
/// every expression to null.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandaloneHelper;

impl RuleHelper for StandaloneHelper {
    fn log(&self) -> Rc<dyn Log> {
        Rc::new(TracingLog)
    }

    fn evaluate(&self, _expression: &str) -> Result<Value, ExpressionEvaluationError> {
        Ok(Value::Null)
    }
}
