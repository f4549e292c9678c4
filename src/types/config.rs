use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::ConfigurationError;
use super::value::Value;
use crate::evaluator::{DefaultResultEvaluator, ResultEvaluator};

/// Language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "javascript";

/// Failure message used when none is configured.
pub const DEFAULT_MESSAGE: &str = "Script evaluated to false";

/// Binding name of the validation context when none is configured.
pub const DEFAULT_VALIDATION_CONTEXT_KEY: &str = "ruleContext";

/// Where a script's text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Script text given directly in the configuration.
    Inline(String),
    /// A file holding the script text, decoded with the build's source encoding.
    File(PathBuf),
}

impl ScriptSource {
    /// `"inline"` or `"file"`, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptSource::Inline(_) => "inline",
            ScriptSource::File(_) => "file",
        }
    }
}

impl fmt::Display for ScriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptSource::Inline(_) => write!(f, "inline script"),
            ScriptSource::File(path) => write!(f, "script file '{}'", path.display()),
        }
    }
}

/// Configuration of a single script rule.
///
/// Built with [`RuleConfigBuilder`], or deserialized when the `serde` feature
/// is enabled. The configuration is not validated on construction; the rule
/// checks it with [`validate()`](Self::validate) before every execution and
/// validity check.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RuleConfig {
    pub(crate) script: Option<String>,
    pub(crate) script_file: Option<PathBuf>,
    pub(crate) language: String,
    pub(crate) message: String,
    pub(crate) rule_helper_key: Option<String>,
    pub(crate) validation_context_key: String,
    pub(crate) script_bindings: HashMap<String, Value>,
    #[cfg_attr(feature = "serde", serde(skip, default = "default_evaluator"))]
    pub(crate) result_evaluator: Arc<dyn ResultEvaluator>,
    pub(crate) validator_script: Option<String>,
    pub(crate) validator_script_file: Option<PathBuf>,
}

fn default_evaluator() -> Arc<dyn ResultEvaluator> {
    Arc::new(DefaultResultEvaluator)
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            script: None,
            script_file: None,
            language: DEFAULT_LANGUAGE.to_owned(),
            message: DEFAULT_MESSAGE.to_owned(),
            rule_helper_key: None,
            validation_context_key: DEFAULT_VALIDATION_CONTEXT_KEY.to_owned(),
            script_bindings: HashMap::new(),
            result_evaluator: default_evaluator(),
            validator_script: None,
            validator_script_file: None,
        }
    }
}

fn is_set(text: Option<&String>) -> bool {
    text.is_some_and(|s| !s.trim().is_empty())
}

impl RuleConfig {
    /// Start building a configuration with every field at its default.
    #[must_use]
    pub fn builder() -> RuleConfigBuilder {
        RuleConfigBuilder::default()
    }

    /// Check the mutual-exclusion constraints between script fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when no primary script is configured,
    /// when both inline and file forms of the primary script are set, or when
    /// both forms of the validator script are set.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let inline = is_set(self.script.as_ref());
        match (inline, self.script_file.is_some()) {
            (false, false) => return Err(ConfigurationError::MissingScript),
            (true, true) => return Err(ConfigurationError::ConflictingScript),
            _ => {}
        }
        if is_set(self.validator_script.as_ref()) && self.validator_script_file.is_some() {
            return Err(ConfigurationError::ConflictingValidatorScript);
        }
        Ok(())
    }

    /// Whether a validator script is configured. Only such rules are cacheable.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        is_set(self.validator_script.as_ref()) || self.validator_script_file.is_some()
    }

    /// The primary script source. Inline text wins when it is not blank.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingScript`] when neither form is set.
    pub fn script_source(&self) -> Result<ScriptSource, ConfigurationError> {
        source_of(self.script.as_ref(), self.script_file.as_deref())
            .ok_or(ConfigurationError::MissingScript)
    }

    /// The validator script source, if one is configured.
    #[must_use]
    pub fn validator_source(&self) -> Option<ScriptSource> {
        source_of(
            self.validator_script.as_ref(),
            self.validator_script_file.as_deref(),
        )
    }

    #[must_use]
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    #[must_use]
    pub fn script_file(&self) -> Option<&Path> {
        self.script_file.as_deref()
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn rule_helper_key(&self) -> Option<&str> {
        self.rule_helper_key.as_deref()
    }

    #[must_use]
    pub fn validation_context_key(&self) -> &str {
        &self.validation_context_key
    }

    #[must_use]
    pub fn script_bindings(&self) -> &HashMap<String, Value> {
        &self.script_bindings
    }

    #[must_use]
    pub fn result_evaluator(&self) -> &dyn ResultEvaluator {
        self.result_evaluator.as_ref()
    }

    #[must_use]
    pub fn validator_script(&self) -> Option<&str> {
        self.validator_script.as_deref()
    }

    #[must_use]
    pub fn validator_script_file(&self) -> Option<&Path> {
        self.validator_script_file.as_deref()
    }
}

fn source_of(inline: Option<&String>, file: Option<&Path>) -> Option<ScriptSource> {
    if is_set(inline) {
        return inline.map(|s| ScriptSource::Inline(s.clone()));
    }
    file.map(|p| ScriptSource::File(p.to_path_buf()))
}

/// Builder for [`RuleConfig`].
///
/// # Example
///
/// ```
/// use scriptrule::RuleConfig;
///
/// let config = RuleConfig::builder()
///     .script("ruleContext.put(\"checked\", true); true;")
///     .validator_script("ruleContext.get(\"checked\")")
///     .script_binding("minimum", 3_i64)
///     .message("project check failed")
///     .build();
///
/// assert!(config.validate().is_ok());
/// assert!(config.is_cacheable());
/// ```
#[derive(Debug, Default)]
#[must_use]
pub struct RuleConfigBuilder {
    config: RuleConfig,
}

impl RuleConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline script text. Mutually exclusive with [`script_file`](Self::script_file).
    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.config.script = Some(script.into());
        self
    }

    /// Path of a file holding the script.
    pub fn script_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.script_file = Some(path.into());
        self
    }

    /// Name of the scripting backend to evaluate with.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    /// Message carried by the violation raised when the script judges false.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.config.message = message.into();
        self
    }

    /// Bind the host's rule helper into the script under `key`.
    pub fn rule_helper_key(mut self, key: impl Into<String>) -> Self {
        self.config.rule_helper_key = Some(key.into());
        self
    }

    /// Binding name of the validation context.
    pub fn validation_context_key(mut self, key: impl Into<String>) -> Self {
        self.config.validation_context_key = key.into();
        self
    }

    /// Add one script binding, replacing any previous value under `name`.
    pub fn script_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.script_bindings.insert(name.into(), value.into());
        self
    }

    /// Replace every script binding.
    pub fn script_bindings(mut self, bindings: HashMap<String, Value>) -> Self {
        self.config.script_bindings = bindings;
        self
    }

    /// Policy deciding whether a script result passes.
    pub fn result_evaluator(mut self, evaluator: impl ResultEvaluator + 'static) -> Self {
        self.config.result_evaluator = Arc::new(evaluator);
        self
    }

    /// Share an existing evaluator instance.
    pub fn shared_result_evaluator(mut self, evaluator: Arc<dyn ResultEvaluator>) -> Self {
        self.config.result_evaluator = evaluator;
        self
    }

    /// Inline validator script. Setting a validator makes the rule cacheable.
    pub fn validator_script(mut self, script: impl Into<String>) -> Self {
        self.config.validator_script = Some(script.into());
        self
    }

    /// Path of a file holding the validator script.
    pub fn validator_script_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.validator_script_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn build(self) -> RuleConfig {
        self.config
    }
}
