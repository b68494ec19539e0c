//! The server-side half of plan generation: owns the Gemini credential,
//! turns an [`AnswerSet`] into a prompt and makes exactly one upstream call.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::constants;
use crate::conversation::AnswerSet;
use crate::error::PlanError;
use crate::gemini::GeminiClient;
use crate::prompt::build_plan_prompt;

/// Anything that can turn a completed answer set into plan text.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    async fn request_plan(&self, answers: &AnswerSet) -> Result<String, PlanError>;
}

#[derive(Clone)]
pub struct ProxyConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: constants::GEMINI_BASE_URL.clone(),
            model: constants::GEMINI_MODEL.clone(),
        }
    }
}

// Hand-written so the key never shows up in logs.
impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PlanProxy {
    api_key: Option<String>,
    gemini: GeminiClient,
}

impl PlanProxy {
    pub fn new(config: ProxyConfig) -> Self {
        let api_key = config.api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!("GEMINI_API_KEY is not set; plan requests will fail until it is configured");
        }
        Self {
            api_key,
            gemini: GeminiClient::new(&config.base_url, &config.model),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl PlanProvider for PlanProxy {
    #[instrument(skip_all, fields(answers = answers.len()))]
    async fn request_plan(&self, answers: &AnswerSet) -> Result<String, PlanError> {
        let api_key = self.api_key.as_deref().ok_or(PlanError::MissingApiKey)?;

        let prompt = build_plan_prompt(answers);
        info!(model = self.gemini.model(), "Requesting financial plan");
        let plan = self.gemini.generate(api_key, &prompt).await?;
        info!(chars = plan.len(), "Financial plan generated");
        Ok(plan)
    }
}
