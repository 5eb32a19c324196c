//! DAG validation and scheduling.
//!
//! Rules enforced by [`validate_dag`]:
//! 1. Node IDs must be unique within the workflow.
//! 2. Every declared input must name a node of the same workflow.
//! 3. The graph must be acyclic (topological sort must succeed).
//!
//! Returns node IDs in execution order on success.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::{WorkflowDag, WorkflowNode};
use crate::EngineError;

/// Validate the workflow's graph and return node IDs in execution order.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownInput`] if a node lists an input that doesn't exist.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_dag(workflow: &WorkflowDag) -> Result<Vec<String>, EngineError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    for node in &workflow.nodes {
        if let Some(missing) = node.inputs.iter().find(|i| !seen_ids.contains(i.as_str())) {
            return Err(EngineError::UnknownInput {
                node_id: node.id.clone(),
                input_id: missing.clone(),
            });
        }
    }

    order(&workflow.nodes)
}

/// Kahn's algorithm over declared inputs.
///
/// A node's in-degree is the length of its `inputs` list. Ready nodes are
/// seeded in declaration order and then dequeued FIFO, so ties among nodes
/// that become ready together follow the order they became ready in.
///
/// # Errors
/// [`EngineError::CycleDetected`] with the nodes that could not be placed.
/// No partial order is returned.
pub fn order(nodes: &[WorkflowNode]) -> Result<Vec<String>, EngineError> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();

    for node in nodes {
        in_degree.insert(node.id.as_str(), node.inputs.len());
        for input in &node.inputs {
            adjacency
                .entry(input.as_str())
                .or_default()
                .push(node.id.as_str());
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .filter(|n| n.inputs.is_empty())
        .map(|n| n.id.as_str())
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());

        if let Some(dependents) = adjacency.get(node_id) {
            for &dependent in dependents {
                if let Some(deg) = in_degree.get_mut(dependent) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }
    }

    if sorted.len() < nodes.len() {
        let placed: HashSet<&str> = sorted.iter().map(String::as_str).collect();
        let stuck = nodes
            .iter()
            .map(|n| n.id.clone())
            .filter(|id| !placed.contains(id.as_str()))
            .collect();
        return Err(EngineError::CycleDetected(stuck));
    }

    Ok(sorted)
}
