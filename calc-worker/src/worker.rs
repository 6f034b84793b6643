//! The poll/resolve/compute/submit loop. Each worker is an independent
//! polling task with no shared state — concurrency is N parallel poll
//! loops, not a shared pool, per the "goroutine-per-worker polling loop"
//! design note.

use std::time::Duration;

use calc_shared::types::Operation;
use tokio::time::sleep;

use crate::client::{ClientError, OrchestratorClient, WireTask};

const IDLE_BACKOFF: Duration = Duration::from_secs(1);
const REFERENCE_POLL_BACKOFF: Duration = Duration::from_millis(100);

pub struct Worker {
    id: usize,
    client: OrchestratorClient,
}

impl Worker {
    pub fn new(id: usize, client: OrchestratorClient) -> Self {
        Self { id, client }
    }

    /// Runs until `shutdown` fires. Never returns an error: transport and
    /// protocol failures are logged and retried, matching the worker's
    /// "workers are cooperative, retry with backoff" contract.
    pub async fn run(self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(worker_id = self.id, "worker shutting down");
                    return;
                }
                _ = self.poll_once() => {}
            }
        }
    }

    async fn poll_once(&self) {
        match self.client.next_task().await {
            Ok(Some(task)) => {
                if let Err(err) = self.process_task(task).await {
                    tracing::warn!(worker_id = self.id, error = %err, "task processing failed, will retry next poll");
                }
            }
            Ok(None) => sleep(IDLE_BACKOFF).await,
            Err(err) => {
                tracing::warn!(worker_id = self.id, error = %err, "poll failed, backing off");
                sleep(IDLE_BACKOFF).await;
            }
        }
    }

    #[tracing::instrument(skip(self, task), fields(worker_id = self.id, task_id = %task.id))]
    async fn process_task(&self, task: WireTask) -> Result<(), ClientError> {
        let a = self.resolve_arg(&task.arg1).await?;
        let b = self.resolve_arg(&task.arg2).await?;

        sleep(Duration::from_millis(task.operation_time)).await;

        let result = apply(task.operation, a, b);
        tracing::debug!(result, "computed task result");
        self.client.submit_result(&task.id, result).await
    }

    /// Literal arguments parse directly; `$`-prefixed references are
    /// polled until the referenced task has a result.
    async fn resolve_arg(&self, arg: &str) -> Result<f64, ClientError> {
        let Some(task_id) = arg.strip_prefix('$') else {
            return Ok(arg.parse().unwrap_or(0.0));
        };

        loop {
            if let Some(task) = self.client.get_task(task_id).await? {
                if let Some(result) = task.result {
                    return Ok(result);
                }
            }
            sleep(REFERENCE_POLL_BACKOFF).await;
        }
    }
}

/// Division by zero yields 0.0 deliberately; see `Operation::apply`.
fn apply(op: Operation, a: f64, b: f64) -> f64 {
    op.apply(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_by_zero_yields_zero() {
        assert_eq!(apply(Operation::Divide, 5.0, 0.0), 0.0);
    }

    #[test]
    fn test_normal_division() {
        assert_eq!(apply(Operation::Divide, 10.0, 2.0), 5.0);
    }

    #[test]
    fn test_addition() {
        assert_eq!(apply(Operation::Add, 2.0, 2.0), 4.0);
    }
}
