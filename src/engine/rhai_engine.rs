use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Scope, INT};

use super::{Binding, Bindings, ScriptEngine, ScriptIo};
use crate::helper::RuleHelper;
use crate::types::{ScriptEvaluationError, ValidationContext};
use crate::Value;

/// Language names the default registry maps to [`RhaiEngine`].
///
/// Rule scripts written for the host's default language use the expression
/// subset rhai shares with it: literals, comparisons, method calls on bound
/// objects and `;` separated statements.
pub const RHAI_LANGUAGE_NAMES: &[&str] = &["rhai", "javascript", "js", "ecmascript"];

/// Evaluates scripts with the rhai interpreter.
///
/// A fresh interpreter is built for every evaluation so that output hooks can
/// capture that evaluation's writers.
///
/// Inside a script:
/// - value bindings are ordinary variables,
/// - the rule helper supports `helper.evaluate("${expr}")`,
/// - the validation context supports `put`, `get`, `contains`, `remove`,
///   `len`, `is_empty` and `ctx["key"]` indexing,
/// - `print(..)` writes to stdout; `debug(..)` and `eprint(..)` write to stderr.
#[derive(Debug, Clone, Default)]
pub struct RhaiEngine {
    deadline: Option<Duration>,
}

type SharedWriter = Rc<RefCell<Box<dyn Write>>>;

#[derive(Clone)]
struct HelperHandle(Rc<dyn RuleHelper>);

impl RhaiEngine {
    /// An engine without a time limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminate scripts still running after `limit` of wall-clock time.
    #[must_use]
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    fn build_engine(&self, stdout: &SharedWriter, stderr: &SharedWriter) -> Engine {
        let mut engine = Engine::new();

        let out = Rc::clone(stdout);
        engine.on_print(move |text| {
            let _ = writeln!(out.borrow_mut(), "{text}");
        });
        let err = Rc::clone(stderr);
        engine.on_debug(move |text, _source, _pos| {
            let _ = writeln!(err.borrow_mut(), "{text}");
        });
        let err = Rc::clone(stderr);
        engine.register_fn("eprint", move |text: &str| {
            let _ = writeln!(err.borrow_mut(), "{text}");
        });

        if let Some(limit) = self.deadline {
            let started = Instant::now();
            engine.on_progress(move |_ops| {
                if started.elapsed() > limit {
                    Some(Dynamic::UNIT)
                } else {
                    None
                }
            });
        }

        register_helper(&mut engine);
        register_context(&mut engine);
        engine
    }
}

impl ScriptEngine for RhaiEngine {
    fn name(&self) -> &str {
        "rhai"
    }

    fn evaluate(
        &self,
        script: &str,
        bindings: &Bindings,
        io: ScriptIo,
    ) -> Result<Value, ScriptEvaluationError> {
        let stdout: SharedWriter = Rc::new(RefCell::new(io.stdout));
        let stderr: SharedWriter = Rc::new(RefCell::new(io.stderr));

        let result = {
            let engine = self.build_engine(&stdout, &stderr);
            let mut scope = Scope::new();
            for (name, binding) in bindings {
                scope.push_dynamic(name.as_str(), binding_to_dynamic(binding));
            }
            engine
                .compile_with_scope(&scope, script)
                .map_err(|err| ScriptEvaluationError::Parse {
                    engine: self.name().to_owned(),
                    reason: err.to_string(),
                })
                .and_then(|ast| {
                    engine
                        .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
                        .map_err(|err| self.runtime_error(*err))
                })
        };

        let _ = stdout.borrow_mut().flush();
        let _ = stderr.borrow_mut().flush();

        result.map(dynamic_to_value)
    }
}

impl RhaiEngine {
    fn runtime_error(&self, err: EvalAltResult) -> ScriptEvaluationError {
        match (err, self.deadline) {
            (EvalAltResult::ErrorTerminated(..), Some(limit)) => ScriptEvaluationError::Terminated {
                limit_ms: limit.as_millis(),
            },
            (other, _) => ScriptEvaluationError::Runtime(other.to_string()),
        }
    }
}

fn register_helper(engine: &mut Engine) {
    engine.register_type_with_name::<HelperHandle>("RuleHelper");
    engine.register_fn(
        "evaluate",
        |helper: &mut HelperHandle, expression: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            helper
                .0
                .evaluate(expression)
                .map(|value| value_to_dynamic(&value))
                .map_err(|err| err.to_string().into())
        },
    );
}

fn register_context(engine: &mut Engine) {
    engine.register_type_with_name::<ValidationContext>("ValidationContext");
    engine.register_fn(
        "put",
        |ctx: &mut ValidationContext, key: &str, value: Dynamic| -> Dynamic {
            ctx.insert(key, dynamic_to_value(value))
                .map_or(Dynamic::UNIT, |previous| value_to_dynamic(&previous))
        },
    );
    engine.register_fn("get", |ctx: &mut ValidationContext, key: &str| -> Dynamic {
        ctx.get(key)
            .map_or(Dynamic::UNIT, |value| value_to_dynamic(&value))
    });
    engine.register_fn("contains", |ctx: &mut ValidationContext, key: &str| {
        ctx.contains_key(key)
    });
    engine.register_fn("remove", |ctx: &mut ValidationContext, key: &str| -> Dynamic {
        ctx.remove(key)
            .map_or(Dynamic::UNIT, |value| value_to_dynamic(&value))
    });
    engine.register_fn("len", |ctx: &mut ValidationContext| -> INT {
        INT::try_from(ctx.len()).unwrap_or(INT::MAX)
    });
    engine.register_fn("is_empty", |ctx: &mut ValidationContext| ctx.is_empty());
    engine.register_indexer_get(
        |ctx: &mut ValidationContext, key: ImmutableString| -> Dynamic {
            ctx.get(key.as_str())
                .map_or(Dynamic::UNIT, |value| value_to_dynamic(&value))
        },
    );
    engine.register_indexer_set(
        |ctx: &mut ValidationContext, key: ImmutableString, value: Dynamic| {
            ctx.insert(key.as_str(), dynamic_to_value(value));
        },
    );
    engine.register_fn("to_string", |ctx: &mut ValidationContext| {
        format!("{ctx:?}")
    });
    engine.register_fn("to_debug", |ctx: &mut ValidationContext| {
        format!("{ctx:?}")
    });
}

fn binding_to_dynamic(binding: &Binding) -> Dynamic {
    match binding {
        Binding::Value(value) => value_to_dynamic(value),
        Binding::Helper(helper) => Dynamic::from(HelperHandle(Rc::clone(helper))),
        Binding::Context(ctx) => Dynamic::from(ctx.clone()),
    }
}

fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Int(i) => Dynamic::from_int(*i),
        Value::Float(f) => Dynamic::from_float(*f),
        Value::String(s) | Value::Opaque(s) => Dynamic::from(s.clone()),
        Value::Array(items) => Dynamic::from_array(items.iter().map(value_to_dynamic).collect()),
        Value::Map(entries) => {
            let mut map = rhai::Map::new();
            for (key, value) in entries {
                map.insert(key.as_str().into(), value_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
    }
}

fn dynamic_to_value(value: Dynamic) -> Value {
    let type_name = value.type_name();
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::Int(i);
    }
    if let Ok(f) = value.as_float() {
        return Value::Float(f);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if value.is_string() {
        return value.into_string().map(Value::String).unwrap_or_default();
    }
    if value.is_array() {
        return value
            .into_array()
            .map(|items| Value::Array(items.into_iter().map(dynamic_to_value).collect()))
            .unwrap_or_default();
    }
    if value.is_map() {
        if let Some(map) = value.try_cast::<rhai::Map>() {
            return Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key.to_string(), dynamic_to_value(value)))
                    .collect(),
            );
        }
        return Value::Opaque(type_name.to_owned());
    }
    if let Some(ctx) = value.try_cast::<ValidationContext>() {
        return Value::Map(ctx.snapshot());
    }
    Value::Opaque(type_name.to_owned())
}
