use std::path::PathBuf;

use thiserror::Error;

/// The rule configuration violates a mutual-exclusion or presence constraint.
///
/// Always fatal; reported before any script runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("one of 'script' or 'scriptFile' must be set")]
    MissingScript,

    #[error("only one of 'script' and 'scriptFile' may be set")]
    ConflictingScript,

    #[error("only one of 'validatorScript' and 'validatorScriptFile' may be set")]
    ConflictingValidatorScript,
}

/// The script text could not be obtained.
#[derive(Debug, Error)]
pub enum ScriptSourceError {
    #[error("script file '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported source encoding '{label}'")]
    UnsupportedEncoding { label: String },

    #[error("failed to read script file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The host could not resolve an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to evaluate expression '{expression}': {reason}")]
pub struct ExpressionEvaluationError {
    pub expression: String,
    pub reason: String,
}

impl ExpressionEvaluationError {
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

/// A failure while running script text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptEvaluationError {
    #[error("{engine} could not parse script: {reason}")]
    Parse { engine: String, reason: String },

    #[error("script runtime error: {0}")]
    Runtime(String),

    #[error("script terminated after exceeding {limit_ms}ms")]
    Terminated { limit_ms: u128 },
}
