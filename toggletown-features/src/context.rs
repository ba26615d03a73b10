//! Evaluation context (user attributes).

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Key of the nested attribute map consulted when a top-level lookup misses.
pub const NESTED_ATTRIBUTES_KEY: &str = "attributes";

/// Per-call attributes that targeting rules are evaluated against.
///
/// ```
/// use toggletown_features::EvaluationContext;
///
/// let context = EvaluationContext::new()
///     .with_user_id("user-123")
///     .with_attribute("plan", "pro")
///     .with_attribute("seats", 25);
///
/// assert_eq!(context.user_id(), "user-123");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    attributes: HashMap<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `user_id`, the identity used for rollout bucketing.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.attributes
            .insert("user_id".to_string(), Value::String(user_id.into()));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add an entry to the nested `attributes` map.
    ///
    /// If a non-object value is already stored under `attributes` it is
    /// replaced by a fresh map.
    pub fn with_nested_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let slot = self
            .attributes
            .entry(NESTED_ATTRIBUTES_KEY.to_string())
            .or_insert_with(|| Value::Object(BTreeMap::new()));
        if !matches!(slot, Value::Object(_)) {
            *slot = Value::Object(BTreeMap::new());
        }
        if let Value::Object(map) = slot {
            map.insert(key.into(), value.into());
        }
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Look up an attribute at the top level, then inside the nested
    /// `attributes` map.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).or_else(|| {
            self.attributes
                .get(NESTED_ATTRIBUTES_KEY)
                .and_then(Value::as_object)
                .and_then(|nested| nested.get(key))
        })
    }

    /// Top-level lookup only.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Identity used for bucketing: `user_id`, then `userId`, else empty.
    ///
    /// Only string values count; a numeric `user_id` is ignored.
    pub fn user_id(&self) -> &str {
        self.get("user_id")
            .and_then(Value::as_str)
            .or_else(|| self.get("userId").and_then(Value::as_str))
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for EvaluationContext
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, Value>> for EvaluationContext {
    fn from(attributes: HashMap<String, Value>) -> Self {
        Self { attributes }
    }
}
