//! Targeting rules and the operators they compare with.

use crate::context::EvaluationContext;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a targeting rule.
///
/// Unrecognised operators are kept verbatim in [`Operator::Unknown`] and
/// never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Gt,
    Lt,
    In,
    NotIn,
    Always,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Always => "always",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Operator {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "always" => Self::Always,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for Operator {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        match operator {
            Operator::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One targeting condition, optionally gated by a sub-rollout and carrying
/// an override value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Context attribute to read.
    pub attribute: String,

    pub operator: Operator,

    /// Operand compared against the attribute.
    #[serde(default)]
    pub value: Value,

    /// Share of matching users (0-100) the rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,

    /// Value served when the rule qualifies; the flag default otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_value: Option<Value>,
}

impl Rule {
    pub fn new(
        attribute: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            value: value.into(),
            percentage: None,
            roll_value: None,
        }
    }

    /// A rule that matches any context carrying `attribute`.
    pub fn always(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Operator::Always, Value::Null)
    }

    pub fn with_percentage(mut self, percentage: i64) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn with_roll_value(mut self, value: impl Into<Value>) -> Self {
        self.roll_value = Some(value.into());
        self
    }

    /// Check the rule's condition against a context.
    ///
    /// A missing attribute never matches, whatever the operator.
    pub fn matches(&self, context: &EvaluationContext) -> bool {
        let Some(actual) = context.lookup(&self.attribute) else {
            return false;
        };
        let expected = &self.value;

        match &self.operator {
            Operator::Equals => actual.to_string_form() == expected.to_string_form(),
            Operator::NotEquals => actual.to_string_form() != expected.to_string_form(),
            Operator::Contains => match (actual, expected) {
                (Value::String(a), Value::String(e)) => a.contains(e.as_str()),
                _ => false,
            },
            Operator::NotContains => match (actual, expected) {
                (Value::String(a), Value::String(e)) => !a.contains(e.as_str()),
                _ => false,
            },
            Operator::Gt => actual.coerce_f64() > expected.coerce_f64(),
            Operator::Lt => actual.coerce_f64() < expected.coerce_f64(),
            Operator::In => list_contains(expected, actual),
            Operator::NotIn => !list_contains(expected, actual),
            Operator::Always => true,
            Operator::Unknown(_) => false,
        }
    }
}

/// `true` when `list` is an array holding an element whose string form
/// equals that of `actual`.
fn list_contains(list: &Value, actual: &Value) -> bool {
    let Some(items) = list.as_array() else {
        return false;
    };
    let needle = actual.to_string_form();
    items.iter().any(|item| item.to_string_form() == needle)
}
