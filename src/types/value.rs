use std::collections::BTreeMap;
use std::fmt;

/// A dynamically-typed value crossing the script boundary.
///
/// Script bindings are supplied as `Value`s, script results come back as
/// `Value`s, and the validation context stores them between the primary and
/// the validator script.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// The absence of a value (`()` in rhai, `null` elsewhere).
    #[default]
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A string-keyed map. Keys are kept sorted.
    Map(BTreeMap<String, Value>),
    /// A backend object with no plain-data form, identified by its type name.
    #[cfg_attr(feature = "serde", serde(skip))]
    Opaque(String),
}

impl Value {
    /// Whether this value is one of the numeric variants.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Whether this value is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string content, if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// A short name for the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Opaque(name) => name,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            // Debug keeps the fractional part: `1.0`, never `1`.
            Value::Float(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Opaque(name) => write!(f, "<{name}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_integers() {
        assert_eq!(Value::from(42_i64), Value::Int(42));
        assert_eq!(Value::from(-7_i32), Value::Int(-7));
        assert_eq!(Value::from(7_u32), Value::Int(7));
    }

    #[test]
    fn from_floats() {
        assert_eq!(Value::from(2.5_f64), Value::Float(2.5));
        assert_eq!(Value::from(0.5_f32), Value::Float(0.5));
    }

    #[test]
    fn from_bool() {
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn from_str_and_string() {
        assert_eq!(Value::from("hello"), Value::String("hello".to_owned()));
        assert_eq!(
            Value::from("owned".to_owned()),
            Value::String("owned".to_owned())
        );
    }

    #[test]
    fn from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn from_vec() {
        assert_eq!(
            Value::from(vec![1_i64, 2]),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(3.25).to_string(), "3.25");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_ne!(Value::Float(1.0).to_string(), Value::Int(1).to_string());
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::String("hello".into()).to_string(), "\"hello\"");
        assert_eq!(Value::Opaque("RuleHelper".into()).to_string(), "<RuleHelper>");
    }

    #[test]
    fn display_collections() {
        let array = Value::from(vec!["a", "b"]);
        assert_eq!(array.to_string(), "[\"a\", \"b\"]");

        let mut map = BTreeMap::new();
        map.insert("z".to_owned(), Value::Int(1));
        map.insert("a".to_owned(), Value::Bool(false));
        assert_eq!(Value::Map(map).to_string(), "{a: false, z: 1}");
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Float(1.0).type_name(), "float");
        assert_eq!(Value::Opaque("Thing".into()).type_name(), "Thing");
    }

    #[test]
    fn numeric_and_null_checks() {
        assert!(Value::Int(0).is_numeric());
        assert!(Value::Float(0.0).is_numeric());
        assert!(!Value::String("0".into()).is_numeric());
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(false).is_null());
    }
}
