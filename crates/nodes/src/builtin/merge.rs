//! `merge`: combine the outputs of several upstream nodes into one value.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::traits::{ExecutableNode, ExecutionContext};
use crate::value::strict_key;
use crate::NodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Flatten all inputs one level into a single array.
    Concat,
    /// Like `Concat`, keeping only the first item seen for each `key` value.
    Deduplicate,
    /// Shallow-merge object inputs; later inputs override earlier keys.
    MergeObjects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub strategy: MergeStrategy,
    #[serde(default)]
    pub key: Option<String>,
}

pub struct MergeNode {
    config: MergeConfig,
}

impl MergeNode {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ExecutableNode for MergeNode {
    async fn execute(&self, inputs: &[Value], _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        match self.config.strategy {
            MergeStrategy::Concat => Ok(Value::Array(flatten(inputs))),
            MergeStrategy::Deduplicate => {
                let key = self.config.key.as_deref().ok_or_else(|| {
                    NodeError::InvalidConfig("deduplicate strategy requires a key".into())
                })?;
                Ok(Value::Array(deduplicate(flatten(inputs), key)))
            }
            MergeStrategy::MergeObjects => Ok(Value::Object(merge_objects(inputs))),
        }
    }
}

fn flatten(inputs: &[Value]) -> Vec<Value> {
    let mut out = Vec::new();
    for input in inputs {
        match input {
            Value::Array(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    out
}

fn deduplicate(items: Vec<Value>, key: &str) -> Vec<Value> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(strict_key(item.get(key))))
        .collect()
}

fn merge_objects(inputs: &[Value]) -> Map<String, Value> {
    let mut merged = Map::new();
    for (index, input) in inputs.iter().enumerate() {
        match input {
            Value::Object(fields) => {
                merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            _ => debug!(index, "skipping non-object input in merge_objects"),
        }
    }
    merged
}
