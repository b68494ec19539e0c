use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::conversation::AnswerSet;
use crate::error::PlanError;
use crate::proxy::PlanProvider;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlanRequest {
    pub answers: AnswerSet,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlanResponse {
    pub plan: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
}

/// Talks to a remote `fincheck serve` instance; holds no credential of its own.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: Client,
    plan_url: String,
}

impl ProxyClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            http: Client::new(),
            plan_url: format!("{}/api/plan", server_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl PlanProvider for ProxyClient {
    #[instrument(skip_all, fields(url = %self.plan_url))]
    async fn request_plan(&self, answers: &AnswerSet) -> Result<String, PlanError> {
        let response = self
            .http
            .post(&self.plan_url)
            .json(&PlanRequest {
                answers: answers.clone(),
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to reach plan server");
                PlanError::transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .map(|body| body.error)
                .filter(|error| !error.trim().is_empty())
                .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));
            error!(%status, %message, "Plan server returned an error");
            return Err(PlanError::Remote(message));
        }

        let body = response
            .json::<PlanResponse>()
            .await
            .map_err(|e| {
                error!(error = %e, "Plan server response carried no plan");
                PlanError::Remote("Unexpected response format from the plan server.".to_string())
            })?;
        debug!(chars = body.plan.len(), "Received plan from server");
        Ok(body.plan)
    }
}
