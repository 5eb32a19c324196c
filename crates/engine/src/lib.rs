//! `engine` crate: domain models, DAG scheduling, and the execution engine.

pub mod dag;
pub mod error;
pub mod executor;
pub mod models;

pub use dag::{order, validate_dag};
pub use error::EngineError;
pub use executor::{ExecutorConfig, WorkflowExecutor};
pub use models::{ExecutionStatus, NodeExecutionLog, WorkflowDag, WorkflowExecution, WorkflowNode};

#[cfg(test)]
mod executor_tests;
