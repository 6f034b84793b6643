//! The three core entities: User, Expression, Task. See the Data Model
//! section for the invariants these types are built to uphold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authenticated principal. Read-only to everything except the identity
/// collaborator that creates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// pending -> computing -> done, monotonic, never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Pending,
    Computing,
    Done,
}

impl fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionStatus::Pending => write!(f, "pending"),
            ExpressionStatus::Computing => write!(f, "computing"),
            ExpressionStatus::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for ExpressionStatus {
    type Err = crate::error::CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExpressionStatus::Pending),
            "computing" => Ok(ExpressionStatus::Computing),
            "done" => Ok(ExpressionStatus::Done),
            other => Err(crate::error::CalcError::Storage(format!(
                "unknown expression status '{other}'"
            ))),
        }
    }
}

/// An expression's lifecycle record. `root_task_id` is recorded at
/// creation time rather than derived by scanning for "last task with a
/// non-nil result", which is ambiguous whenever the final operation's
/// result happens to be absent for other reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: String,
    pub user_id: i64,
    pub expression: String,
    pub status: ExpressionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    /// Internal scheduling field, not part of the user-facing wire shape.
    #[serde(skip_serializing)]
    pub root_task_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// pending -> computing -> done, monotonic, never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Computing,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Computing => write!(f, "computing"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::error::CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "computing" => Ok(TaskStatus::Computing),
            "done" => Ok(TaskStatus::Done),
            other => Err(crate::error::CalcError::Storage(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operation {
    pub fn symbol(self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Subtract => '-',
            Operation::Multiply => '*',
            Operation::Divide => '/',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operation::Add),
            '-' => Some(Operation::Subtract),
            '*' => Some(Operation::Multiply),
            '/' => Some(Operation::Divide),
            _ => None,
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Operation::Add | Operation::Subtract => 1,
            Operation::Multiply | Operation::Divide => 2,
        }
    }

    /// Worker-side evaluation. Division by zero yields 0.0 deliberately:
    /// the submit-time parser already rejects expressions that divide by
    /// a literal zero, so this only fires when a referenced subtask
    /// resolved to zero at runtime, and there is no failed status in the
    /// task lifecycle to report it through.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for Operation {
    type Err = crate::error::CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Operation::from_symbol(c)
                .ok_or_else(|| crate::error::CalcError::Storage(format!("unknown operator '{s}'"))),
            _ => Err(crate::error::CalcError::Storage(format!(
                "unknown operator '{s}'"
            ))),
        }
    }
}

/// One binary operation. `arg1`/`arg2` are either a decimal literal or a
/// `$<task-id>` reference to a sibling task in the same expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub expression_id: String,
    pub arg1: String,
    pub arg2: String,
    pub operation: Operation,
    pub operation_time_ms: u64,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True iff `arg` is a reference to another task's result.
    pub fn is_reference(arg: &str) -> bool {
        arg.starts_with('$')
    }

    /// Strips the leading `$` from a reference argument.
    pub fn referenced_task_id(arg: &str) -> Option<&str> {
        arg.strip_prefix('$')
    }
}
