//! Cache identity of a rule configuration.
//!
//! The host compares cache ids to decide whether an earlier outcome of a rule
//! may be reused. Only rules with a validator script can be cached; every
//! other rule gets a fresh random id per request, which never matches.
//!
//! ## Canonical form
//!
//! ```text
//! language=<[[..]]>script=<[[..]]>scriptFile=<[[..]]>validatorScript=<[[..]]>
//! validatorScriptFile=<[[..]]>message=<[[..]]>ruleHelperKey=<[[..]]>
//! validationContextKey=<[[..]]>scriptBindings=<[[{a=1,b="x"}]]>
//! ```
//!
//! (one line, no breaks). Absent fields render as `null`, file paths are made
//! absolute, and bindings are sorted by key. Binding values use `Value`'s
//! `Display`: strings are quoted and floats keep a fractional part (`1.0`), so
//! values of different types never render alike. Values are not escaped: a
//! value containing `]]>` can make two differently shaped configurations render
//! the same text. The canonical string is hashed with BLAKE3 and hex encoded.

use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use uuid::Uuid;

use crate::types::RuleConfig;
use crate::Value;

/// The cache id of `config`.
///
/// Stable for identical cacheable configurations; random for non-cacheable ones.
#[must_use]
pub fn cache_id(config: &RuleConfig) -> String {
    if !config.is_cacheable() {
        let id = Uuid::new_v4().to_string();
        tracing::debug!(cache_id = %id, "rule is not cacheable; issuing random cache id");
        return id;
    }
    let id = blake3::hash(canonical_form(config).as_bytes())
        .to_hex()
        .to_string();
    tracing::debug!(cache_id = %id, "computed rule cache id");
    id
}

/// The string a cacheable configuration's cache id is hashed from.
#[must_use]
pub fn canonical_form(config: &RuleConfig) -> String {
    let script_file = config.script_file().map(absolute);
    let validator_file = config.validator_script_file().map(absolute);
    let bindings = canonical_bindings(config.script_bindings());

    let mut out = String::new();
    push_field(&mut out, "language", Some(config.language()));
    push_field(&mut out, "script", config.script());
    push_field(&mut out, "scriptFile", script_file.as_deref());
    push_field(&mut out, "validatorScript", config.validator_script());
    push_field(&mut out, "validatorScriptFile", validator_file.as_deref());
    push_field(&mut out, "message", Some(config.message()));
    push_field(&mut out, "ruleHelperKey", config.rule_helper_key());
    push_field(
        &mut out,
        "validationContextKey",
        Some(config.validation_context_key()),
    );
    push_field(&mut out, "scriptBindings", Some(&bindings));
    out
}

/// `{k1=v1,k2=v2}` with keys in lexicographic order.
#[must_use]
pub fn canonical_bindings(bindings: &HashMap<String, Value>) -> String {
    let mut entries: Vec<(&String, &Value)> = bindings.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut out = String::from("{");
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{key}={value}");
    }
    out.push('}');
    out
}

fn push_field(out: &mut String, key: &str, value: Option<&str>) {
    let _ = write!(out, "{key}=<[[{}]]>", value.unwrap_or("null"));
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
