use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::engine::{Binding, Bindings, EngineRegistry, ScriptIo};
use crate::error::RuleError;
use crate::fingerprint;
use crate::helper::RuleHelper;
use crate::log::{Log, LogLevel, LogWriter};
use crate::source::read_script;
use crate::types::{ExecutionOutcome, RuleConfig, ScriptSource, ValidationContext};
use crate::Value;

/// The lifecycle the host build tool drives a rule through.
///
/// The host asks for [`cache_id()`](Rule::cache_id) first. On a miss it calls
/// [`execute()`](Rule::execute); on a hit it hands the rule instance that
/// produced the cached outcome to [`is_result_valid()`](Rule::is_result_valid)
/// to decide whether that outcome still holds.
pub trait Rule: Any {
    fn is_cacheable(&self) -> bool;

    fn cache_id(&self) -> String;

    /// Run the check.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Violation`] when the check fails, or another
    /// [`RuleError`] when the rule could not be run at all.
    fn execute(&mut self, helper: Rc<dyn RuleHelper>) -> Result<(), RuleError>;

    /// Whether the outcome `cached` produced earlier may be reused.
    ///
    /// Never fails: anything that goes wrong counts as "not valid".
    fn is_result_valid(&self, cached: &dyn Rule) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// A rule that evaluates a script and judges its result.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use scriptrule::{Rule, RuleConfig, ScriptRule, StandaloneHelper};
///
/// let mut rule = ScriptRule::new(
///     RuleConfig::builder()
///         .script("ruleContext.put(\"answer\", 42); true;")
///         .validator_script("ruleContext.get(\"answer\") == 42")
///         .build(),
/// );
///
/// rule.execute(Rc::new(StandaloneHelper)).unwrap();
/// assert!(rule.is_result_valid(&rule));
/// ```
pub struct ScriptRule {
    config: RuleConfig,
    registry: EngineRegistry,
    validation_context: ValidationContext,
    helper: Option<Rc<dyn RuleHelper>>,
    last_outcome: Option<ExecutionOutcome>,
}

impl ScriptRule {
    /// A rule evaluating with the default engine registry.
    #[must_use]
    pub fn new(config: RuleConfig) -> Self {
        Self::with_registry(config, EngineRegistry::default())
    }

    #[must_use]
    pub fn with_registry(config: RuleConfig, registry: EngineRegistry) -> Self {
        Self {
            config,
            registry,
            validation_context: ValidationContext::new(),
            helper: None,
            last_outcome: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// The context shared with this rule's scripts.
    #[must_use]
    pub fn validation_context(&self) -> &ValidationContext {
        &self.validation_context
    }

    /// Outcome of the last successful run, if any.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&ExecutionOutcome> {
        self.last_outcome.as_ref()
    }

    /// Run the primary script and judge its result.
    ///
    /// On success the helper is kept for a later validity check, and the
    /// outcome is both returned and kept.
    ///
    /// # Errors
    ///
    /// - [`RuleError::Configuration`] for an invalid configuration,
    /// - [`RuleError::ScriptSource`] when the script cannot be read,
    /// - [`RuleError::EngineNotFound`] for an unknown language,
    /// - [`RuleError::Evaluation`] when the script fails,
    /// - [`RuleError::Violation`] when the result is judged invalid.
    pub fn run(&mut self, helper: Rc<dyn RuleHelper>) -> Result<ExecutionOutcome, RuleError> {
        let outcome = Handler::new(self, Rc::clone(&helper), &self.validation_context).execute()?;
        self.helper = Some(helper);
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    fn validate_cached(&self, cached: &ScriptRule) -> Result<bool, RuleError> {
        let Some(helper) = cached.helper.clone() else {
            tracing::debug!("cached rule never executed successfully");
            return Ok(false);
        };
        let Some(validator) = self.config.validator_source() else {
            return Ok(false);
        };
        Handler::new(self, helper, &cached.validation_context).validate(&validator)
    }
}

impl Rule for ScriptRule {
    fn is_cacheable(&self) -> bool {
        self.config.is_cacheable()
    }

    fn cache_id(&self) -> String {
        fingerprint::cache_id(&self.config)
    }

    fn execute(&mut self, helper: Rc<dyn RuleHelper>) -> Result<(), RuleError> {
        self.run(helper).map(|_| ())
    }

    fn is_result_valid(&self, cached: &dyn Rule) -> bool {
        if let Err(err) = self.config.validate() {
            tracing::debug!(error = %err, "invalid configuration; cached result rejected");
            return false;
        }
        if !self.is_cacheable() {
            return false;
        }
        let Some(cached) = cached.as_any().downcast_ref::<ScriptRule>() else {
            tracing::debug!("cached rule is not a script rule");
            return false;
        };
        match self.validate_cached(cached) {
            Ok(valid) => valid,
            Err(err) => {
                tracing::debug!(error = %err, "validator script failed; cached result rejected");
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for ScriptRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRule")
            .field("config", &self.config)
            .field("validation_context", &self.validation_context)
            .field("executed", &self.helper.is_some())
            .field("last_outcome", &self.last_outcome)
            .finish_non_exhaustive()
    }
}

/// One evaluation of a rule's script against a helper and a validation context.
struct Handler<'a> {
    config: &'a RuleConfig,
    registry: &'a EngineRegistry,
    helper: Rc<dyn RuleHelper>,
    log: Rc<dyn Log>,
    context: &'a ValidationContext,
}

impl<'a> Handler<'a> {
    fn new(rule: &'a ScriptRule, helper: Rc<dyn RuleHelper>, context: &'a ValidationContext) -> Self {
        let log = helper.log();
        Self {
            config: &rule.config,
            registry: &rule.registry,
            helper,
            log,
            context,
        }
    }

    fn execute(&self) -> Result<ExecutionOutcome, RuleError> {
        self.config.validate()?;
        let source = self.config.script_source()?;
        let value = self.evaluate(&source)?;

        let passed = self.config.result_evaluator().is_valid_result(&value);
        tracing::debug!(result = %value, passed, "script judged");
        if !passed {
            return Err(RuleError::Violation {
                message: self.config.message().to_owned(),
            });
        }
        Ok(ExecutionOutcome::new(value, passed))
    }

    fn validate(&self, validator: &ScriptSource) -> Result<bool, RuleError> {
        let value = self.evaluate(validator)?;
        let valid = self.config.result_evaluator().is_valid_result(&value);
        tracing::debug!(result = %value, valid, "validator script judged");
        Ok(valid)
    }

    fn evaluate(&self, source: &ScriptSource) -> Result<Value, RuleError> {
        tracing::debug!(source = source.kind(), "resolving script");
        let script = read_script(source, self.helper.as_ref())?;
        let engine = self.registry.lookup_engine(self.config.language())?;

        tracing::debug!(engine = engine.name(), language = self.config.language(), "evaluating script");
        let io = ScriptIo::new(
            LogWriter::with_level(Rc::clone(&self.log), LogLevel::Info),
            LogWriter::with_level(Rc::clone(&self.log), LogLevel::Error),
        );
        Ok(engine.evaluate(&script, &self.bindings(), io)?)
    }

    /// User bindings first, then the helper, then the validation context;
    /// later entries replace earlier ones under the same name.
    fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.extend_values(self.config.script_bindings());
        if let Some(key) = self.config.rule_helper_key() {
            bindings.insert(key, Binding::Helper(Rc::clone(&self.helper)));
        }
        if self.config.is_cacheable() {
            bindings.insert(self.config.validation_context_key(), self.context.clone());
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::StandaloneHelper;

    fn helper() -> Rc<dyn RuleHelper> {
        Rc::new(StandaloneHelper)
    }

    #[test]
    fn run_returns_outcome() {
        let mut rule = ScriptRule::new(RuleConfig::builder().script("40 + 2").build());
        let outcome = rule.run(helper()).unwrap();
        assert_eq!(outcome.value(), &Value::Int(42));
        assert!(outcome.passed());
        assert_eq!(rule.last_outcome(), Some(&outcome));
    }

    #[test]
    fn failed_run_keeps_no_outcome() {
        let mut rule = ScriptRule::new(RuleConfig::builder().script("false").build());
        assert!(rule.run(helper()).is_err());
        assert!(rule.last_outcome().is_none());
        assert!(rule.helper.is_none());
    }

    #[test]
    fn context_binding_wins_name_collision() {
        let rule = ScriptRule::new(
            RuleConfig::builder()
                .script("true")
                .validator_script("true")
                .script_binding("ruleContext", 1_i64)
                .rule_helper_key("ruleContext")
                .build(),
        );
        let handler = Handler::new(&rule, helper(), &rule.validation_context);
        let bindings = handler.bindings();
        assert_eq!(bindings.len(), 1);
        assert!(matches!(bindings.get("ruleContext"), Some(Binding::Context(_))));
    }

    #[test]
    fn helper_binding_wins_over_user_binding() {
        let rule = ScriptRule::new(
            RuleConfig::builder()
                .script("true")
                .script_binding("helper", "shadowed")
                .rule_helper_key("helper")
                .build(),
        );
        let handler = Handler::new(&rule, helper(), &rule.validation_context);
        assert!(matches!(handler.bindings().get("helper"), Some(Binding::Helper(_))));
    }

    #[test]
    fn context_not_bound_without_validator() {
        let rule = ScriptRule::new(RuleConfig::builder().script("true").build());
        let handler = Handler::new(&rule, helper(), &rule.validation_context);
        assert!(handler.bindings().get("ruleContext").is_none());
    }

    #[test]
    fn never_executed_candidate_is_invalid() {
        let config = RuleConfig::builder()
            .script("true")
            .validator_script("true")
            .build();
        let fresh = ScriptRule::new(config.clone());
        let current = ScriptRule::new(config);
        assert!(!current.is_result_valid(&fresh));
    }

    #[test]
    fn debug_reports_execution_state() {
        let mut rule = ScriptRule::new(RuleConfig::builder().script("true").build());
        assert!(format!("{rule:?}").contains("executed: false"));
        rule.execute(helper()).unwrap();
        assert!(format!("{rule:?}").contains("executed: true"));
    }
}
