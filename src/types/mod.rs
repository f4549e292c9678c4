mod config;
mod context;
mod error;
mod outcome;
mod value;

pub use config::{
    RuleConfig, RuleConfigBuilder, ScriptSource, DEFAULT_LANGUAGE, DEFAULT_MESSAGE,
    DEFAULT_VALIDATION_CONTEXT_KEY,
};
pub use context::ValidationContext;
pub use error::{
    ConfigurationError, ExpressionEvaluationError, ScriptEvaluationError, ScriptSourceError,
};
pub use outcome::ExecutionOutcome;
pub use value::Value;
