use dotenv::dotenv;
use reqwest::Client;
use std::env;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::endpoints::{
    GeminiErrorBody, GenerateContentRequest, GenerateContentResponse,
    Provider, GEMINI_API_BASE_URL, GEMINI_MODELS,
};

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("API returned no content")]
    EmptyResponse,
    #[error("Response violates schema: {0}")]
    SchemaViolation(String),
}

impl Provider {
    pub fn gemini(api_key_env_var_name: &str, model: &str) -> Self {
        dotenv().ok();
        let provider = Self::Gemini {
            api_key: api_key_env_var_name.to_string(),
            model: model.to_string(),
            available_models: GEMINI_MODELS.to_vec(),
        };
        // Unlisted models are still sent; Gemini rejects unknown names itself.
        if !provider.is_known_model() {
            warn!(model = %model, "Model is not in the known Gemini model list");
        }
        provider
    }

    /// Whether the configured model appears in the provider's model table.
    pub fn is_known_model(&self) -> bool {
        match self {
            Provider::Gemini {
                model,
                available_models,
                ..
            } => available_models.iter().any(|m| m.model_name == model.as_str()),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } => model,
        }
    }

    /// Sends one `generateContent` call and returns the model's text output.
    pub async fn call_generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<String, ApiConnectionError> {
        match self {
            Provider::Gemini {
                api_key: api_key_env_var_name,
                model,
                ..
            } => {
                dotenv().ok();
                let actual_api_key = env::var(api_key_env_var_name)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone()))?;

                let client = Client::new();
                let url = format!("{GEMINI_API_BASE_URL}/models/{model}:generateContent");

                debug!(model = %model, "Sending generateContent request");
                let response = client
                    .post(&url)
                    .header("x-goog-api-key", actual_api_key)
                    .json(request)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let raw_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    let error_body = error_message_from_body(raw_body);
                    error!(status = %status, "Gemini API returned an error");
                    return Err(ApiConnectionError::ApiError { status, error_body });
                }

                let parsed = response.json::<GenerateContentResponse>().await?;
                if let Some(usage) = &parsed.usage_metadata {
                    debug!(total_tokens = ?usage.total_token_count, "Gemini usage");
                }
                match parsed.text() {
                    Some(text) => Ok(text),
                    None => {
                        // Blocked or truncated candidates come back without parts.
                        warn!(finish_reason = ?parsed.finish_reason(), "Gemini returned no text");
                        Err(ApiConnectionError::EmptyResponse)
                    }
                }
            }
        }
    }
}

/// Extracts `error.message` from a Gemini error body, falling back to the raw
/// body when it is not the documented JSON shape.
pub fn error_message_from_body(raw_body: String) -> String {
    serde_json::from_str::<GeminiErrorBody>(&raw_body)
        .map(|body| body.error.message)
        .unwrap_or(raw_body)
}

/// Strips a surrounding Markdown code fence (```json ... ``` or ``` ... ```)
/// from model output.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6 {
        let inner = &trimmed[3..trimmed.len() - 3];
        // Language tag right after the opening fence
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        inner.trim()
    } else {
        trimmed
    }
}
