//! `filter`: keep the array items that satisfy every configured condition.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::traits::{ExecutableNode, ExecutionContext};
use crate::value::{coerce_string, compare, strict_equals};
use crate::NodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    Contains,
    Gt,
    Lt,
    /// Any operator name not listed above. Never matches.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    /// Absent means `undefined`, which is not the same as `null`.
    #[serde(default)]
    pub value: Option<Value>,
}

impl FilterCondition {
    fn matches(&self, item: &Value) -> bool {
        let actual = item.get(&self.field);
        let expected = self.value.as_ref();
        match self.operator {
            FilterOperator::Equals => strict_equals(actual, expected),
            FilterOperator::Contains => coerce_string(actual).contains(&coerce_string(expected)),
            FilterOperator::Gt => compare(actual, expected) == Some(Ordering::Greater),
            FilterOperator::Lt => compare(actual, expected) == Some(Ordering::Less),
            FilterOperator::Unknown => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

pub struct FilterNode {
    config: FilterConfig,
}

impl FilterNode {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ExecutableNode for FilterNode {
    async fn execute(&self, inputs: &[Value], _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let [input] = inputs else {
            return Err(NodeError::InvalidInput(format!(
                "filter node requires exactly one input, got {}",
                inputs.len()
            )));
        };
        let Value::Array(items) = input else {
            return Err(NodeError::InvalidInput("filter node input must be an array".into()));
        };

        let kept = items
            .iter()
            .filter(|item| self.config.conditions.iter().all(|c| c.matches(item)))
            .cloned()
            .collect();
        Ok(Value::Array(kept))
    }
}
