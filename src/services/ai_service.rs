use std::time::{Duration as StdDuration, Instant};

use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::InsightsConfig;
use crate::error::{AiErrorCode, AppError, AppResult};
use crate::models::ai_types::{BackendMetadata, GenerativeBackend};

const PROVIDER_ID: &str = "gemini";

/// Google Gemini `generateContent` client.
///
/// Built once per process and shared; the inner `reqwest::Client` keeps the
/// connection pool.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiProvider {
    pub fn try_new(config: &InsightsConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build Gemini HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_request_body(prompt: &str) -> JsonValue {
        json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "temperature": 0.4,
                "topP": 0.9
            }
        })
    }

    /// Concatenated text of the first candidate.
    fn extract_text(body: &JsonValue, correlation_id: &str) -> AppResult<String> {
        let parts = body
            .pointer("/candidates/0/content/parts")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                let block_reason = body
                    .pointer("/promptFeedback/blockReason")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string);
                AppError::ai_with_details(
                    AiErrorCode::InvalidResponse,
                    "Gemini response has no candidate content",
                    Some(correlation_id),
                    Some(json!({ "reason": "missing_candidate", "blockReason": block_reason })),
                )
            })?;

        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(JsonValue::as_str))
            .collect();

        Ok(text)
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> (AppError, bool) {
        let (code, message, retryable) = match status {
            StatusCode::UNAUTHORIZED => (
                AiErrorCode::MissingApiKey,
                "Gemini API key is invalid or unauthorized".to_string(),
                false,
            ),
            StatusCode::FORBIDDEN => (
                AiErrorCode::Forbidden,
                "Gemini API access is forbidden".to_string(),
                false,
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                AiErrorCode::RateLimited,
                "Gemini quota exceeded, try again later".to_string(),
                true,
            ),
            status if status.is_server_error() => (
                AiErrorCode::BackendUnavailable,
                format!("Gemini is temporarily unavailable (status {})", status.as_u16()),
                true,
            ),
            StatusCode::BAD_REQUEST => (
                AiErrorCode::RejectedRequest,
                "Gemini rejected the request format".to_string(),
                false,
            ),
            StatusCode::NOT_FOUND => (
                AiErrorCode::RejectedRequest,
                "Gemini model or endpoint not found".to_string(),
                false,
            ),
            status => (
                AiErrorCode::Unknown,
                format!("Gemini returned status {}", status.as_u16()),
                false,
            ),
        };

        (
            AppError::ai_with_details(
                code,
                message,
                Some(correlation_id),
                Some(json!({ "status": status.as_u16(), "retryable": retryable })),
            ),
            retryable,
        )
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> (AppError, bool) {
        if err.is_timeout() {
            (
                AppError::ai_with_details(
                    AiErrorCode::HttpTimeout,
                    "Gemini request timed out",
                    Some(correlation_id),
                    Some(json!({ "retryable": true })),
                ),
                true,
            )
        } else if err.is_connect() {
            (
                AppError::ai_with_details(
                    AiErrorCode::BackendUnavailable,
                    "could not connect to Gemini",
                    Some(correlation_id),
                    Some(json!({ "retryable": true })),
                ),
                true,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            (
                AppError::ai_with_details(
                    AiErrorCode::Unknown,
                    format!("Gemini request failed: {err}"),
                    Some(correlation_id),
                    Some(json!({ "retryable": false })),
                ),
                false,
            )
        }
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiProvider {
    async fn generate(&self, model: &str, prompt: &str) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ai(AiErrorCode::MissingApiKey, "Gemini API key is not configured"))?;

        let correlation_id = Uuid::new_v4().to_string();
        let endpoint = self.endpoint(model);

        debug!(
            target: "app::ai::gemini",
            correlation_id = %correlation_id,
            model,
            prompt_len = prompt.len(),
            "invoking Gemini"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request_body(prompt))
            .send()
            .await;

        let resp = match response {
            Ok(resp) => resp,
            Err(err) => {
                let (error, retryable) = Self::error_from_reqwest(err, correlation_id.as_str());
                warn!(
                    target: "app::ai::gemini",
                    correlation_id = %correlation_id,
                    retryable,
                    "Gemini request failed"
                );
                return Err(error);
            }
        };

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis() as u64;
        if !status.is_success() {
            let (error, retryable) = Self::map_http_error(status, correlation_id.as_str());
            warn!(
                target: "app::ai::gemini",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                latency_ms,
                retryable,
                "Gemini returned non-success status"
            );
            return Err(error);
        }

        let body: JsonValue = resp.json().await.map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                "failed to decode Gemini response body",
                Some(correlation_id.as_str()),
                Some(json!({ "reason": err.to_string() })),
            )
        })?;

        let text = Self::extract_text(&body, &correlation_id)?;

        debug!(
            target: "app::ai::gemini",
            correlation_id = %correlation_id,
            latency_ms,
            response_len = text.len(),
            "Gemini responded"
        );

        Ok(text)
    }

    fn describe(&self) -> BackendMetadata {
        BackendMetadata {
            provider_id: PROVIDER_ID.to_string(),
            base_url: Some(self.base_url.clone()),
            has_api_key: self.api_key.is_some(),
        }
    }
}

pub mod testing {
    use super::*;

    /// Expose Gemini error mapping for integration tests without widening the public API surface.
    pub fn map_http_error(status: StatusCode) -> (AppError, bool) {
        GeminiProvider::map_http_error(status, "test-correlation-id")
    }

    pub async fn generate_via_http(
        base_url: &str,
        timeout: StdDuration,
        model: &str,
        prompt: &str,
    ) -> AppResult<String> {
        let config = InsightsConfig {
            api_key: Some("test-key".to_string()),
            api_base_url: base_url.trim_end_matches('/').to_string(),
            http_timeout: timeout,
            ..InsightsConfig::default()
        };
        let provider = GeminiProvider::try_new(&config)?;
        provider.generate(model, prompt).await
    }
}
