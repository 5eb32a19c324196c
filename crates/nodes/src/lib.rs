//! `nodes` crate: the `ExecutableNode` trait and the built-in node kinds.
//!
//! Every node kind implements [`ExecutableNode`]. The engine crate dispatches
//! through the closed [`BuiltinNode`] enum, one variant per [`NodeKind`].
//! External capabilities (tool calls, LLM completions, credentials) are
//! reached only through the traits in [`services`].

pub mod builtin;
pub mod error;
pub mod expression;
pub mod mock;
pub mod resolver;
pub mod services;
pub mod traits;
pub mod value;

pub use builtin::{BuiltinNode, NodeKind};
pub use error::{CredentialError, NodeError};
pub use services::NodeServices;
pub use traits::{ExecutableNode, ExecutionContext};
