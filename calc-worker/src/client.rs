//! HTTP client against the orchestrator's worker-facing protocol.

use calc_shared::types::Operation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct WireTask {
    pub id: String,
    pub expression_id: String,
    pub arg1: String,
    pub arg2: String,
    pub operation: Operation,
    pub operation_time: u64,
    #[allow(dead_code)]
    pub status: String,
    pub result: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SubmitResultRequest {
    result: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("orchestrator returned an unexpected status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

#[derive(Clone)]
pub struct OrchestratorClient {
    http: reqwest::Client,
    base_url: String,
}

impl OrchestratorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// `Ok(None)` on the idle 404; `Err` for transport failure or any
    /// other non-200/404 status.
    pub async fn next_task(&self) -> Result<Option<WireTask>, ClientError> {
        let resp = self
            .http
            .get(format!("{}/internal/task", self.base_url))
            .send()
            .await?;
        self.task_or_none(resp).await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Option<WireTask>, ClientError> {
        let resp = self
            .http
            .get(format!("{}/internal/task/{task_id}", self.base_url))
            .send()
            .await?;
        self.task_or_none(resp).await
    }

    pub async fn submit_result(&self, task_id: &str, result: f64) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(format!("{}/internal/task/{task_id}", self.base_url))
            .json(&SubmitResultRequest { result })
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::UnexpectedStatus(resp.status()))
        }
    }

    async fn task_or_none(&self, resp: reqwest::Response) -> Result<Option<WireTask>, ClientError> {
        match resp.status() {
            status if status.is_success() => Ok(Some(resp.json::<WireTask>().await?)),
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(ClientError::UnexpectedStatus(status)),
        }
    }
}
