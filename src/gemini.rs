use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::error::PlanError;

// Structures matching Gemini's generateContent endpoint
#[derive(Serialize, Debug)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    // usageMetadata, modelVersion, etc. are ignored
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Sends `prompt` as the only user message and returns the first candidate's text.
    #[instrument(skip(self, api_key, prompt), fields(model = %self.model))]
    pub async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, PlanError> {
        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Gemini API");
                PlanError::transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Gemini API request failed");
            return Err(PlanError::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.json::<GenerateContentResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse JSON response from Gemini API");
            PlanError::MalformedResponse
        })?;

        let text = body.first_text().ok_or_else(|| {
            error!("Gemini response carried no candidate text");
            PlanError::MalformedResponse
        })?;

        debug!(chars = text.len(), "Received Gemini response");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Option<String> {
        serde_json::from_value::<GenerateContentResponse>(value)
            .unwrap()
            .first_text()
    }

    #[test]
    fn test_first_text_extracted() {
        let text = parse(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "first"}, {"text": "second"}]}},
                {"content": {"role": "model", "parts": [{"text": "other"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 10}
        }));
        assert_eq!(text.as_deref(), Some("first"));
    }

    #[test]
    fn test_missing_candidate_text() {
        assert!(parse(json!({})).is_none());
        assert!(parse(json!({"candidates": []})).is_none());
        assert!(parse(json!({"candidates": [{"finishReason": "SAFETY"}]})).is_none());
        assert!(parse(json!({"candidates": [{"content": {"parts": []}}]})).is_none());
        assert!(parse(json!({"candidates": [{"content": {"parts": [{"text": ""}]}}]})).is_none());
    }

    #[test]
    fn test_request_shape() {
        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new("http://localhost:9000/", "gemini-test");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-test:generateContent"
        );
    }
}
