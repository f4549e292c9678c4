//! Named scripting backends and the bindings handed to them.

mod rhai_engine;

use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;

pub use self::rhai_engine::{RhaiEngine, RHAI_LANGUAGE_NAMES};
use crate::error::RuleError;
use crate::helper::RuleHelper;
use crate::types::{ScriptEvaluationError, ValidationContext};
use crate::Value;

/// A scripting backend able to evaluate program text against bound names.
pub trait ScriptEngine: fmt::Debug + Send + Sync {
    /// Canonical name of the backend.
    fn name(&self) -> &str;

    /// Evaluate `script` with every entry of `bindings` visible by name.
    ///
    /// Evaluation is synchronous; unless the backend is configured with a
    /// deadline it blocks for as long as the script runs. Whatever the script
    /// prints goes to `io`; both writers are flushed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptEvaluationError`] when the script does not parse, fails
    /// while running, or is terminated.
    fn evaluate(
        &self,
        script: &str,
        bindings: &Bindings,
        io: ScriptIo,
    ) -> Result<Value, ScriptEvaluationError>;
}

/// One entry in the evaluation scope.
#[derive(Clone)]
pub enum Binding {
    /// Plain data.
    Value(Value),
    /// The host's rule helper, callable from the script.
    Helper(Rc<dyn RuleHelper>),
    /// The rule's validation context, shared with the script by reference.
    Context(ValidationContext),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Binding::Helper(_) => f.write_str("Helper"),
            Binding::Context(ctx) => f.debug_tuple("Context").field(ctx).finish(),
        }
    }
}

impl From<Value> for Binding {
    fn from(v: Value) -> Self {
        Binding::Value(v)
    }
}

impl From<ValidationContext> for Binding {
    fn from(ctx: ValidationContext) -> Self {
        Binding::Context(ctx)
    }
}

/// Flat name → [`Binding`] map. Inserting an existing name replaces it.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: BTreeMap<String, Binding>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, returning the binding it replaced.
    pub fn insert(&mut self, name: impl Into<String>, binding: impl Into<Binding>) -> Option<Binding> {
        self.entries.insert(name.into(), binding.into())
    }

    /// Bind every value of `values`.
    pub fn extend_values<'a>(&mut self, values: impl IntoIterator<Item = (&'a String, &'a Value)>) {
        for (name, value) in values {
            self.insert(name.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Binding> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a String, &'a Binding);
    type IntoIter = btree_map::Iter<'a, String, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Where a script's standard output and standard error go.
pub struct ScriptIo {
    pub stdout: Box<dyn Write>,
    pub stderr: Box<dyn Write>,
}

impl ScriptIo {
    pub fn new(stdout: impl Write + 'static, stderr: impl Write + 'static) -> Self {
        Self {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        }
    }

    /// Discard all script output.
    pub fn sink() -> Self {
        Self::new(io::sink(), io::sink())
    }
}

impl fmt::Debug for ScriptIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptIo").finish_non_exhaustive()
    }
}

/// Scripting backends keyed by language name.
///
/// Names are matched case-insensitively. [`EngineRegistry::default()`]
/// contains the rhai backend under every name in [`RHAI_LANGUAGE_NAMES`];
/// [`EngineRegistry::empty()`] contains nothing.
#[derive(Debug, Clone)]
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn ScriptEngine>>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let rhai: Arc<dyn ScriptEngine> = Arc::new(RhaiEngine::new());
        for name in RHAI_LANGUAGE_NAMES {
            registry.register_shared(name, Arc::clone(&rhai));
        }
        registry
    }
}

impl EngineRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// Register `engine` under `name`, replacing any engine already there.
    pub fn register(&mut self, name: &str, engine: impl ScriptEngine + 'static) {
        self.register_shared(name, Arc::new(engine));
    }

    /// Register an already shared engine under `name`.
    pub fn register_shared(&mut self, name: &str, engine: Arc<dyn ScriptEngine>) {
        self.engines.insert(name.to_lowercase(), engine);
    }

    /// The engine registered under `name`, if any.
    #[must_use]
    pub fn get_engine_by_name(&self, name: &str) -> Option<Arc<dyn ScriptEngine>> {
        self.engines.get(&name.to_lowercase()).cloned()
    }

    /// The engine registered under `language`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::EngineNotFound`] when nothing is registered under it.
    pub fn lookup_engine(&self, language: &str) -> Result<Arc<dyn ScriptEngine>, RuleError> {
        self.get_engine_by_name(language)
            .ok_or_else(|| RuleError::EngineNotFound {
                language: language.to_owned(),
            })
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ConstantEngine(Value);

    impl ScriptEngine for ConstantEngine {
        fn name(&self) -> &str {
            "constant"
        }

        fn evaluate(
            &self,
            _script: &str,
            _bindings: &Bindings,
            _io: ScriptIo,
        ) -> Result<Value, ScriptEvaluationError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn default_registry_resolves_rhai_aliases() {
        let registry = EngineRegistry::default();
        for name in ["rhai", "javascript", "JavaScript", "js", "ecmascript"] {
            let engine = registry.get_engine_by_name(name).unwrap();
            assert_eq!(engine.name(), "rhai");
        }
    }

    #[test]
    fn unknown_language_is_not_found() {
        let registry = EngineRegistry::default();
        assert!(registry.get_engine_by_name("cobol").is_none());
        let err = registry.lookup_engine("cobol").unwrap_err();
        assert!(matches!(err, RuleError::EngineNotFound { language } if language == "cobol"));
    }

    #[test]
    fn empty_registry_has_no_engines() {
        let registry = EngineRegistry::empty();
        assert!(registry.names().is_empty());
        assert!(registry.lookup_engine("javascript").is_err());
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = EngineRegistry::default();
        registry.register("js", ConstantEngine(Value::Int(7)));
        let engine = registry.lookup_engine("JS").unwrap();
        assert_eq!(engine.name(), "constant");
        let result = engine
            .evaluate("ignored", &Bindings::new(), ScriptIo::sink())
            .unwrap();
        assert_eq!(result, Value::Int(7));
        assert_eq!(registry.lookup_engine("rhai").unwrap().name(), "rhai");
    }

    #[test]
    fn names_are_sorted() {
        let registry = EngineRegistry::default();
        assert_eq!(registry.names(), vec!["ecmascript", "javascript", "js", "rhai"]);
    }

    #[test]
    fn later_bindings_overwrite_earlier() {
        let mut bindings = Bindings::new();
        bindings.insert("key", Value::Int(1));
        let replaced = bindings.insert("key", ValidationContext::new());
        assert!(matches!(replaced, Some(Binding::Value(Value::Int(1)))));
        assert!(matches!(bindings.get("key"), Some(Binding::Context(_))));
        assert_eq!(bindings.len(), 1);
    }
}
