//! Obtaining script text from inline configuration or from a file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::helper::{RuleHelper, SOURCE_ENCODING_EXPRESSION};
use crate::log::Log;
use crate::types::{ScriptSource, ScriptSourceError};
use crate::Value;

/// Encoding used when the build does not declare one.
pub const PLATFORM_DEFAULT_ENCODING: &Encoding = UTF_8;

/// Read the text of `source`.
///
/// Inline text is returned as is. A file is read whole and decoded with the
/// encoding the helper resolves for the build, falling back to
/// [`PLATFORM_DEFAULT_ENCODING`]. The file handle does not outlive this call.
///
/// # Errors
///
/// Returns [`ScriptSourceError`] when the file is missing or unreadable, or
/// when the build declares an encoding that is not supported.
pub fn read_script(
    source: &ScriptSource,
    helper: &dyn RuleHelper,
) -> Result<String, ScriptSourceError> {
    let log = helper.log();
    match source {
        ScriptSource::Inline(text) => {
            if log.is_debug_enabled() {
                log.debug("Using inline script");
            }
            Ok(text.clone())
        }
        ScriptSource::File(path) => {
            if log.is_debug_enabled() {
                log.debug(&format!("Using script file {}", path.display()));
            }
            let encoding = source_encoding(helper, log.as_ref())?;
            read_file(path, encoding)
        }
    }
}

/// Resolve the build's source encoding.
///
/// # Errors
///
/// Returns [`ScriptSourceError::UnsupportedEncoding`] when the build declares
/// a label `encoding_rs` does not recognise.
pub fn source_encoding(
    helper: &dyn RuleHelper,
    log: &dyn Log,
) -> Result<&'static Encoding, ScriptSourceError> {
    let label = match helper.evaluate(SOURCE_ENCODING_EXPRESSION) {
        Ok(Value::Null) => return Ok(PLATFORM_DEFAULT_ENCODING),
        Ok(Value::String(label)) if label.trim().is_empty() => {
            return Ok(PLATFORM_DEFAULT_ENCODING);
        }
        Ok(Value::String(label)) => label,
        Ok(other) => other.to_string(),
        Err(err) => {
            if log.is_debug_enabled() {
                log.debug(&format!(
                    "Could not resolve source encoding, using {}: {err}",
                    PLATFORM_DEFAULT_ENCODING.name()
                ));
            }
            return Ok(PLATFORM_DEFAULT_ENCODING);
        }
    };
    Encoding::for_label(label.trim().as_bytes())
        .ok_or(ScriptSourceError::UnsupportedEncoding { label })
}

fn read_file(path: &Path, encoding: &'static Encoding) -> Result<String, ScriptSourceError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ScriptSourceError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ScriptSourceError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let (text, actual, had_errors) = encoding.decode(&bytes);
    if had_errors {
        tracing::debug!(
            path = %path.display(),
            encoding = actual.name(),
            "script contained malformed sequences; replaced"
        );
    }
    Ok(text.into_owned())
}
