use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::Value;

/// Mapping written by the primary script and read back by the validator script.
///
/// A rule creates exactly one context and keeps it for its whole lifetime.
/// Cloning the handle does not copy the map: every clone refers to the same
/// instance, so writes made while the primary script runs are visible when
/// the validator script runs later. The handle is `!Send`: one
/// writer (`execute`) is followed by one reader (`is_result_valid`) on the
/// same thread.
#[derive(Clone, Default)]
pub struct ValidationContext {
    data: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl ValidationContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, returning the previous value if any.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.borrow_mut().insert(key.into(), value.into())
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.borrow().get(key).cloned()
    }

    /// Remove a key, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.borrow_mut().remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.borrow().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.data.borrow_mut().clear();
    }

    /// Copy the current contents out.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.data.borrow().clone()
    }

    /// Whether two handles refer to the same underlying instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &ValidationContext) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.data.borrow().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let ctx = ValidationContext::new();
        ctx.insert("foo", 1_i64);
        assert_eq!(ctx.get("foo"), Some(Value::Int(1)));
    }

    #[test]
    fn get_missing_returns_none() {
        let ctx = ValidationContext::new();
        assert_eq!(ctx.get("foo"), None);
        assert!(!ctx.contains_key("foo"));
    }

    #[test]
    fn overwrite_returns_previous() {
        let ctx = ValidationContext::new();
        assert_eq!(ctx.insert("score", 10_i64), None);
        assert_eq!(ctx.insert("score", 20_i64), Some(Value::Int(10)));
        assert_eq!(ctx.get("score"), Some(Value::Int(20)));
    }

    #[test]
    fn clones_share_the_same_instance() {
        let ctx = ValidationContext::new();
        let handle = ctx.clone();
        handle.insert("written", true);

        assert!(ctx.ptr_eq(&handle));
        assert_eq!(ctx.get("written"), Some(Value::Bool(true)));
    }

    #[test]
    fn separate_contexts_are_distinct() {
        let a = ValidationContext::new();
        let b = ValidationContext::new();
        a.insert("k", "v");
        assert!(!a.ptr_eq(&b));
        assert!(b.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let ctx = ValidationContext::new();
        ctx.insert("a", 1_i64);
        ctx.insert("b", 2_i64);
        assert_eq!(ctx.remove("a"), Some(Value::Int(1)));
        assert_eq!(ctx.len(), 1);
        ctx.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let ctx = ValidationContext::new();
        ctx.insert("a", 1_i64);
        let snap = ctx.snapshot();
        ctx.insert("b", 2_i64);
        assert_eq!(snap.len(), 1);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn debug_renders_entries() {
        let ctx = ValidationContext::new();
        ctx.insert("k", 1_i64);
        assert_eq!(format!("{ctx:?}"), "{\"k\": Int(1)}");
    }
}
