//! A build rule that evaluates a user script and judges its result.
//!
//! A [`ScriptRule`] reads its script inline or from a file, evaluates it with
//! the engine registered for the configured language, and hands the result
//! to a [`ResultEvaluator`]. A rejected result fails the rule with
//! [`RuleError::Violation`].
//!
//! Rules configured with a validator script are cacheable: their
//! [`cache_id()`](Rule::cache_id) is a digest of the configuration, and on a
//! cache hit the validator runs against the [`ValidationContext`] the earlier
//! execution left behind.

pub mod engine;
mod error;
mod evaluator;
pub mod fingerprint;
mod helper;
mod log;
mod rule;
mod source;
mod types;

pub use engine::{EngineRegistry, RhaiEngine, ScriptEngine};
pub use error::RuleError;
pub use evaluator::{DefaultResultEvaluator, ExpectedValueEvaluator, ResultEvaluator};
pub use helper::{RuleHelper, StandaloneHelper, SOURCE_ENCODING_EXPRESSION};
pub use log::{Log, LogLevel, LogWriter, TracingLog};
pub use rule::{Rule, ScriptRule};
pub use source::{read_script, source_encoding, PLATFORM_DEFAULT_ENCODING};
pub use types::{
    ConfigurationError, ExecutionOutcome, ExpressionEvaluationError, RuleConfig,
    RuleConfigBuilder, ScriptEvaluationError, ScriptSource, ScriptSourceError, ValidationContext,
    Value, DEFAULT_LANGUAGE, DEFAULT_MESSAGE, DEFAULT_VALIDATION_CONTEXT_KEY,
};
