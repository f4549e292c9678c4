use thiserror::Error;

use crate::types::{ConfigurationError, ScriptEvaluationError, ScriptSourceError};

/// Unified error type returned by [`Rule::execute()`](crate::Rule::execute).
///
/// Every variant aborts the enclosing build step. [`RuleError::Violation`] is
/// the user-facing failure: the script ran and was judged to fail.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    ScriptSource(#[from] ScriptSourceError),

    #[error("no script engine registered for language '{language}'")]
    EngineNotFound { language: String },

    #[error(transparent)]
    Evaluation(#[from] ScriptEvaluationError),

    #[error("{message}")]
    Violation { message: String },
}

impl RuleError {
    /// Whether this error reports a failed check rather than a broken rule.
    #[must_use]
    pub fn is_violation(&self) -> bool {
        matches!(self, RuleError::Violation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_carries_message() {
        let err = RuleError::Violation {
            message: "Script evaluated to false".into(),
        };
        assert_eq!(err.to_string(), "Script evaluated to false");
        assert!(err.is_violation());
    }

    #[test]
    fn engine_not_found_message() {
        let err = RuleError::EngineNotFound {
            language: "groovy".into(),
        };
        assert_eq!(
            err.to_string(),
            "no script engine registered for language 'groovy'"
        );
        assert!(!err.is_violation());
    }

    #[test]
    fn configuration_is_transparent() {
        let err = RuleError::from(ConfigurationError::MissingScript);
        assert_eq!(err.to_string(), ConfigurationError::MissingScript.to_string());
    }
}
