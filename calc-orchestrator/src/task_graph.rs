//! Task graph builder. Post-order flattens an operator tree into a list of
//! binary tasks whose arguments are literals or `$<task-id>` references to
//! earlier tasks in the same list. The last task emitted is the root, by
//! construction.

use calc_shared::config::AppConfig;
use calc_shared::types::Operation;

use crate::parser::Node;

/// A task about to be persisted; not yet assigned `status`/timestamps,
/// which the store is responsible for stamping.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub id: String,
    pub arg1: String,
    pub arg2: String,
    pub operation: Operation,
    pub operation_time_ms: u64,
}

/// Canonical decimal form for a leaf literal.
fn literal_token(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// Returns `(tasks, root_task_id)`. `tasks` is in emission (post-order)
/// order; the root task is always `tasks.last()`.
///
/// Panics if `tree` is a bare `Node::Literal` with no operation — callers
/// are expected to go through `parser::parse`, which rejects that shape
/// before a graph is ever built.
pub fn build_task_graph(
    tree: &Node,
    expression_id: &str,
    config: &AppConfig,
) -> (Vec<NewTask>, String) {
    let mut tasks = Vec::new();
    let mut n = 0usize;
    emit(tree, expression_id, config, &mut tasks, &mut n);
    let root_task_id = tasks
        .last()
        .expect("tree must contain at least one operation")
        .id
        .clone();
    (tasks, root_task_id)
}

fn emit(
    node: &Node,
    expression_id: &str,
    config: &AppConfig,
    tasks: &mut Vec<NewTask>,
    n: &mut usize,
) -> String {
    match node {
        Node::Literal(value) => literal_token(*value),
        Node::BinaryOp(op, left, right) => {
            let arg1 = emit(left, expression_id, config, tasks, n);
            let arg2 = emit(right, expression_id, config, tasks, n);
            *n += 1;
            let id = format!("{expression_id}_task{n}");
            tasks.push(NewTask {
                id: id.clone(),
                arg1,
                arg2,
                operation: *op,
                operation_time_ms: config.operation_time_ms(*op),
            });
            format!("${id}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn test_config() -> AppConfig {
        AppConfig {
            port: 8080,
            database_url: None,
            jwt_secret: "x".into(),
            server_url: "http://localhost:8080".into(),
            computing_power: 4,
            time_addition_ms: 1000,
            time_subtraction_ms: 1000,
            time_multiplication_ms: 2000,
            time_division_ms: 2000,
            shutdown_timeout_secs: 10,
        }
    }

    #[test]
    fn test_single_operation_yields_one_task() {
        let tree = parse("2+2").unwrap();
        let (tasks, root) = build_task_graph(&tree, "E1", &test_config());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "E1_task1");
        assert_eq!(tasks[0].arg1, "2");
        assert_eq!(tasks[0].arg2, "2");
        assert_eq!(root, "E1_task1");
    }

    #[test]
    fn test_precedence_builds_two_tasks_with_a_reference() {
        let tree = parse("2+3*4").unwrap();
        let (tasks, root) = build_task_graph(&tree, "E1", &test_config());
        assert_eq!(tasks.len(), 2);
        // post-order: 3*4 first, then 2+$that
        assert_eq!(tasks[0].id, "E1_task1");
        assert_eq!(tasks[0].arg1, "3");
        assert_eq!(tasks[0].arg2, "4");
        assert_eq!(tasks[1].id, "E1_task2");
        assert_eq!(tasks[1].arg1, "2");
        assert_eq!(tasks[1].arg2, "$E1_task1");
        assert_eq!(root, "E1_task2");
    }

    #[test]
    fn test_left_associative_chain_references_previous_task() {
        let tree = parse("10-3-2").unwrap();
        let (tasks, root) = build_task_graph(&tree, "E1", &test_config());
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].arg1, "10");
        assert_eq!(tasks[0].arg2, "3");
        assert_eq!(tasks[1].arg1, "$E1_task1");
        assert_eq!(tasks[1].arg2, "2");
        assert_eq!(root, "E1_task2");
    }

    #[test]
    fn test_parentheses_yield_three_tasks_with_multiply_root() {
        let tree = parse("(1+2)*(3+4)").unwrap();
        let (tasks, root) = build_task_graph(&tree, "E1", &test_config());
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[2].operation, Operation::Multiply);
        assert_eq!(root, "E1_task3");
    }

    #[test]
    fn test_operation_time_ms_comes_from_config() {
        let tree = parse("2*3").unwrap();
        let (tasks, _) = build_task_graph(&tree, "E1", &test_config());
        assert_eq!(tasks[0].operation_time_ms, 2000);
    }
}
