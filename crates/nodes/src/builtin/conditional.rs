//! `conditional`: evaluate a condition against the first input and report
//! which branch it selects.
//!
//! The decision is informational: the scheduler runs every node regardless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::expression::Expr;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalConfig {
    /// Expression over the bound variable `data`, e.g. `data.total > 100`.
    pub condition: String,
    #[serde(default)]
    pub true_branch: Option<String>,
    #[serde(default)]
    pub false_branch: Option<String>,
}

pub struct ConditionalNode {
    config: ConditionalConfig,
    expr: Expr,
}

impl ConditionalNode {
    /// Fails if the condition does not parse.
    pub fn new(config: ConditionalConfig) -> Result<Self, NodeError> {
        let expr = Expr::parse(&config.condition)?;
        Ok(Self { config, expr })
    }
}

#[async_trait]
impl ExecutableNode for ConditionalNode {
    async fn execute(&self, inputs: &[Value], _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data = inputs.first();
        let condition_met = self.expr.test(data)?;
        let next_node = if condition_met {
            &self.config.true_branch
        } else {
            &self.config.false_branch
        };

        Ok(json!({
            "conditionMet": condition_met,
            "nextNode": next_node,
            "data": data.cloned().unwrap_or(Value::Null),
        }))
    }
}
