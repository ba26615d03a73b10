//! Flag Configuration and Evaluation
//!
//! Defines the server-side flag definition and the algorithm that resolves it
//! against an evaluation context.

use crate::context::EvaluationContext;
use crate::rollout::in_rollout;
use crate::rule::Rule;
use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Catalog of flag definitions keyed by flag key.
pub type FlagCatalog = HashMap<String, FlagConfig>;

/// Declared type of a flag's value.
///
/// Types this SDK does not know are kept verbatim in [`FlagType::Unknown`] so
/// one unfamiliar flag never spoils the rest of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlagType {
    Boolean,
    String,
    Number,
    Json,
    Unknown(String),
}

impl FlagType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Json => "JSON",
            Self::Unknown(raw) => raw,
        }
    }

    /// Value served to users left out of a flag's global rollout.
    pub fn off_value(&self) -> Value {
        match self {
            Self::Boolean => Value::Bool(false),
            Self::String => Value::String(String::new()),
            Self::Number => Value::Number(0.0),
            Self::Json | Self::Unknown(_) => Value::Null,
        }
    }
}

impl From<String> for FlagType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "BOOLEAN" => Self::Boolean,
            "STRING" => Self::String,
            "NUMBER" => Self::Number,
            "JSON" => Self::Json,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<FlagType> for String {
    fn from(flag_type: FlagType) -> Self {
        match flag_type {
            FlagType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One flag's full server-defined behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagConfig {
    /// Flag key/name
    pub key: String,

    #[serde(rename = "type")]
    pub flag_type: FlagType,

    /// Whether flag is enabled
    pub enabled: bool,

    /// Value served when enabled and no rule overrides it
    #[serde(default)]
    pub default_value: Value,

    /// Targeting rules; the first qualifying rule wins
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<Rule>,

    /// Global rollout percentage (0-100); 0 disables the global rollout
    #[serde(default, deserialize_with = "null_as_default")]
    pub rollout_percentage: i64,
}

impl FlagConfig {
    /// Create an enabled flag with no rules and no rollout.
    pub fn new(key: impl Into<String>, flag_type: FlagType, default_value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            flag_type,
            enabled: true,
            default_value: default_value.into(),
            rules: Vec::new(),
            rollout_percentage: 0,
        }
    }

    /// Create a simple boolean flag.
    ///
    /// ```
    /// use toggletown_features::{EvaluationContext, FlagConfig, Value};
    ///
    /// let flag = FlagConfig::boolean("new-ui", true);
    /// assert_eq!(flag.evaluate(&EvaluationContext::new()), Value::Bool(true));
    /// ```
    pub fn boolean(key: impl Into<String>, default_value: bool) -> Self {
        Self::new(key, FlagType::Boolean, default_value)
    }

    pub fn string(key: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self::new(key, FlagType::String, Value::String(default_value.into()))
    }

    pub fn number(key: impl Into<String>, default_value: f64) -> Self {
        Self::new(key, FlagType::Number, default_value)
    }

    pub fn json(key: impl Into<String>, default_value: impl Into<Value>) -> Self {
        Self::new(key, FlagType::Json, default_value)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Add targeting rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rollout(mut self, percentage: i64) -> Self {
        self.rollout_percentage = percentage;
        self
    }

    /// Evaluate flag for a context.
    ///
    /// Never fails: every path ends in the flag default, a rule's override
    /// value, or the type's off value.
    pub fn evaluate(&self, context: &EvaluationContext) -> Value {
        if !self.enabled {
            return self.default_value.clone();
        }

        let user_id = context.user_id();

        for rule in &self.rules {
            if !rule.matches(context) {
                continue;
            }

            if let Some(percentage) = rule.percentage
                && percentage < 100
                && (user_id.is_empty() || !in_rollout(user_id, &self.key, percentage))
            {
                continue;
            }

            return rule
                .roll_value
                .clone()
                .unwrap_or_else(|| self.default_value.clone());
        }

        if self.rollout_percentage > 0 && !user_id.is_empty() {
            return if in_rollout(user_id, &self.key, self.rollout_percentage) {
                self.default_value.clone()
            } else {
                self.flag_type.off_value()
            };
        }

        self.default_value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> EvaluationContext {
        EvaluationContext::new().with_user_id(id)
    }

    #[test]
    fn test_disabled_flag_returns_default() {
        let flag = FlagConfig::boolean("test-flag", true)
            .with_enabled(false)
            .with_rule(Rule::always("user_id").with_roll_value(false))
            .with_rollout(0);

        assert_eq!(flag.evaluate(&user("user-1")), Value::Bool(true));
        assert_eq!(flag.evaluate(&EvaluationContext::new()), Value::Bool(true));
    }

    #[test]
    fn test_full_rollout_returns_default() {
        let flag = FlagConfig::boolean("test-flag", true).with_rollout(100);
        assert_eq!(flag.evaluate(&user("u1")), Value::Bool(true));

        let flag = FlagConfig::boolean("test-flag", false).with_rollout(100);
        assert_eq!(flag.evaluate(&user("u1")), Value::Bool(false));
    }

    #[test]
    fn test_no_rollout_returns_default() {
        let flag = FlagConfig::boolean("test-flag", false).with_rollout(0);
        assert_eq!(flag.evaluate(&user("u1")), Value::Bool(false));

        let flag = FlagConfig::string("banner", "hello").with_rollout(0);
        assert_eq!(flag.evaluate(&user("u1")), Value::from("hello"));
    }

    #[test]
    fn test_rollout_excluded_user_gets_off_value() {
        // "u3:pct-flag" hashes to bucket 62, "u2:pct-flag" to 14.
        let flag = FlagConfig::string("pct-flag", "variant-a").with_rollout(50);
        assert_eq!(flag.evaluate(&user("u2")), Value::from("variant-a"));
        assert_eq!(flag.evaluate(&user("u3")), Value::from(""));

        let flag = FlagConfig::number("pct-flag", 42.0).with_rollout(50);
        assert_eq!(flag.evaluate(&user("u3")), Value::Number(0.0));

        let flag = FlagConfig::json("pct-flag", Value::from(vec!["a"])).with_rollout(50);
        assert_eq!(flag.evaluate(&user("u3")), Value::Null);

        let flag = FlagConfig::boolean("pct-flag", true).with_rollout(50);
        assert_eq!(flag.evaluate(&user("u3")), Value::Bool(false));
    }

    #[test]
    fn test_rollout_without_user_returns_default() {
        let flag = FlagConfig::boolean("pct-flag", true).with_rollout(1);
        assert_eq!(flag.evaluate(&EvaluationContext::new()), Value::Bool(true));
    }

    #[test]
    fn test_targeting_rule_match() {
        let flag = FlagConfig::boolean("test-flag", false)
            .with_rule(Rule::new("plan", "equals", "pro").with_roll_value(true));

        let pro = EvaluationContext::new().with_attribute("plan", "pro");
        let free = EvaluationContext::new().with_attribute("plan", "free");
        assert_eq!(flag.evaluate(&pro), Value::Bool(true));
        assert_eq!(flag.evaluate(&free), Value::Bool(false));
    }

    #[test]
    fn test_rule_without_roll_value_returns_default() {
        let flag = FlagConfig::string("greeting", "hi")
            .with_rule(Rule::new("plan", "equals", "pro"))
            .with_rollout(1);

        // The matched rule short-circuits the global rollout.
        let context = user("u3").with_attribute("plan", "pro");
        assert_eq!(flag.evaluate(&context), Value::from("hi"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let flag = FlagConfig::string("color", "grey")
            .with_rule(Rule::new("plan", "equals", "pro").with_roll_value("gold"))
            .with_rule(Rule::new("country", "equals", "US").with_roll_value("blue"));

        let both = EvaluationContext::new()
            .with_attribute("plan", "pro")
            .with_attribute("country", "US");
        assert_eq!(flag.evaluate(&both), Value::from("gold"));

        let us_only = EvaluationContext::new().with_attribute("country", "US");
        assert_eq!(flag.evaluate(&us_only), Value::from("blue"));
    }

    #[test]
    fn test_rule_percentage_requires_user_id() {
        let flag = FlagConfig::string("pct-flag", "default")
            .with_rule(
                Rule::new("plan", "equals", "pro")
                    .with_percentage(99)
                    .with_roll_value("gated"),
            );

        let anonymous = EvaluationContext::new().with_attribute("plan", "pro");
        assert_eq!(flag.evaluate(&anonymous), Value::from("default"));
    }

    #[test]
    fn test_rule_percentage_gates_on_bucket() {
        // buckets for pct-flag: u2 -> 14, u3 -> 62
        let flag = FlagConfig::string("pct-flag", "default")
            .with_rule(
                Rule::new("plan", "equals", "pro")
                    .with_percentage(50)
                    .with_roll_value("gated"),
            )
            .with_rule(Rule::new("plan", "equals", "pro").with_roll_value("fallthrough"));

        let inside = user("u2").with_attribute("plan", "pro");
        let outside = user("u3").with_attribute("plan", "pro");
        assert_eq!(flag.evaluate(&inside), Value::from("gated"));
        assert_eq!(flag.evaluate(&outside), Value::from("fallthrough"));
    }

    #[test]
    fn test_rule_percentage_100_skips_rollout() {
        let flag = FlagConfig::string("pct-flag", "default").with_rule(
            Rule::new("plan", "equals", "pro")
                .with_percentage(100)
                .with_roll_value("everyone"),
        );

        let anonymous = EvaluationContext::new().with_attribute("plan", "pro");
        assert_eq!(flag.evaluate(&anonymous), Value::from("everyone"));
    }

    #[test]
    fn test_rule_percentage_zero_never_qualifies() {
        let flag = FlagConfig::boolean("pct-flag", false).with_rule(
            Rule::new("plan", "equals", "pro")
                .with_percentage(0)
                .with_roll_value(true),
        );

        let context = user("u2").with_attribute("plan", "pro");
        assert_eq!(flag.evaluate(&context), Value::Bool(false));
    }

    #[test]
    fn test_camel_case_user_id() {
        let flag = FlagConfig::boolean("pct-flag", true).with_rollout(50);
        let context = EvaluationContext::new().with_attribute("userId", "u3");
        assert_eq!(flag.evaluate(&context), Value::Bool(false));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "key": "checkout",
            "type": "NUMBER",
            "enabled": true,
            "defaultValue": 3,
            "rules": [{"attribute": "plan", "operator": "equals", "value": "pro", "rollValue": 5}],
            "rolloutPercentage": 25
        }"#;
        let flag: FlagConfig = serde_json::from_str(json).unwrap();
        assert_eq!(flag.flag_type, FlagType::Number);
        assert_eq!(flag.default_value, Value::Number(3.0));
        assert_eq!(flag.rules.len(), 1);
        assert_eq!(flag.rollout_percentage, 25);

        let back: FlagConfig = serde_json::from_value(serde_json::to_value(&flag).unwrap()).unwrap();
        assert_eq!(back, flag);
    }

    #[test]
    fn test_wire_defaults() {
        let flag: FlagConfig =
            serde_json::from_str(r#"{"key":"k","type":"BOOLEAN","enabled":false}"#).unwrap();
        assert!(flag.rules.is_empty());
        assert_eq!(flag.rollout_percentage, 0);
        assert_eq!(flag.default_value, Value::Null);
    }

    #[test]
    fn test_wire_null_fields() {
        let flag: FlagConfig = serde_json::from_str(
            r#"{"key":"k","type":"STRING","enabled":true,"defaultValue":"x","rules":null,"rolloutPercentage":null}"#,
        )
        .unwrap();
        assert!(flag.rules.is_empty());
        assert_eq!(flag.rollout_percentage, 0);
        assert_eq!(flag.evaluate(&user("u1")), Value::from("x"));
    }

    #[test]
    fn test_unknown_flag_type() {
        let catalog: FlagCatalog = serde_json::from_str(
            r#"{
                "a": {"key":"a","type":"BOOLEAN","enabled":true,"defaultValue":true},
                "b": {"key":"b","type":"DATE","enabled":true,"defaultValue":"2024-01-01","rolloutPercentage":50}
            }"#,
        )
        .unwrap();

        assert_eq!(catalog["a"].evaluate(&user("u1")), Value::Bool(true));
        assert_eq!(catalog["b"].flag_type, FlagType::Unknown("DATE".into()));
        assert_eq!(FlagType::Unknown("DATE".into()).off_value(), Value::Null);

        let json = serde_json::to_value(&catalog["b"]).unwrap();
        assert_eq!(json["type"], "DATE");
    }

    #[test]
    fn test_flag_type_spelling() {
        assert_eq!(FlagType::from("JSON".to_string()), FlagType::Json);
        assert_eq!(String::from(FlagType::Boolean), "BOOLEAN");
        assert_eq!(FlagType::Number.to_string(), "NUMBER");
    }
}
