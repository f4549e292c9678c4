#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use scriptrule::{ExpressionEvaluationError, Log, LogLevel, RuleHelper, Value};

/// A log that keeps every enabled message, tagged with its level.
#[derive(Debug, Default)]
pub struct RecordingLog {
    pub debug_enabled: bool,
    entries: RefCell<Vec<(LogLevel, String)>>,
}

impl RecordingLog {
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.borrow().clone()
    }

    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn record(&self, level: LogLevel, message: &str) {
        self.entries.borrow_mut().push((level, message.to_owned()));
    }
}

impl Log for RecordingLog {
    fn is_debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    fn is_info_enabled(&self) -> bool {
        true
    }

    fn is_warn_enabled(&self) -> bool {
        true
    }

    fn is_error_enabled(&self) -> bool {
        true
    }

    fn debug(&self, message: &str) {
        self.record(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }
}

/// A helper resolving expressions from a fixed table; anything else fails.
#[derive(Debug, Default)]
pub struct RecordingHelper {
    pub log: Rc<RecordingLog>,
    pub expressions: HashMap<String, Value>,
}

impl RecordingHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expression(mut self, expression: &str, value: impl Into<Value>) -> Self {
        self.expressions.insert(expression.to_owned(), value.into());
        self
    }

    pub fn with_debug(self) -> Self {
        Self {
            log: Rc::new(RecordingLog {
                debug_enabled: true,
                ..RecordingLog::default()
            }),
            ..self
        }
    }
}

impl RuleHelper for RecordingHelper {
    fn log(&self) -> Rc<dyn Log> {
        self.log.clone()
    }

    fn evaluate(&self, expression: &str) -> Result<Value, ExpressionEvaluationError> {
        self.expressions
            .get(expression)
            .cloned()
            .ok_or_else(|| ExpressionEvaluationError::new(expression, "unknown expression"))
    }
}
