//! Domain types, error handling, configuration, and logging shared between
//! the orchestrator and the worker.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use error::CalcError;
pub use types::{Expression, ExpressionStatus, Operation, Task, TaskStatus, User};
