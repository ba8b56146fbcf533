use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AiErrorCode, AppError, AppResult};
use crate::models::ai_types::{ArtifactKind, GenerativeBackend};

/// Appended to every prompt regardless of the builder's own directive.
pub const STRICT_JSON_SUFFIX: &str = "CRITICAL REQUIREMENTS:
- Return ONLY valid JSON object
- Do NOT include markdown formatting
- Do NOT include code blocks
- Do NOT include explanation or commentary
- Do NOT include extra text before or after JSON
- Ensure JSON is valid and parseable";

const EXCERPT_CHARS: usize = 200;

/// Sends prompts to the generative backend and turns replies into JSON.
///
/// Stateless apart from the shared backend handle; every call is independent
/// and nothing is retried here.
#[derive(Clone)]
pub struct ModelInvoker {
    backend: Arc<dyn GenerativeBackend>,
    default_model: String,
}

impl ModelInvoker {
    pub fn new(backend: Arc<dyn GenerativeBackend>, default_model: impl Into<String>) -> Self {
        Self {
            backend,
            default_model: default_model.into(),
        }
    }

    /// Raw model text for `prompt`, with the strict JSON suffix attached.
    pub async fn complete(
        &self,
        prompt: &str,
        kind: ArtifactKind,
        model: Option<&str>,
    ) -> AppResult<String> {
        let model = model.unwrap_or(&self.default_model);
        let full_prompt = with_strict_suffix(prompt);

        debug!(
            target: "app::ai::invoker",
            kind = kind.as_str(),
            model,
            prompt_len = full_prompt.len(),
            "invoking model"
        );

        let start = Instant::now();
        let text = self.backend.generate(model, &full_prompt).await?;

        debug!(
            target: "app::ai::invoker",
            kind = kind.as_str(),
            model,
            latency_ms = start.elapsed().as_millis() as u64,
            response_len = text.len(),
            "model responded"
        );

        Ok(text)
    }

    /// Model reply for `prompt`, cleaned and parsed as JSON.
    pub async fn invoke_json(
        &self,
        prompt: &str,
        kind: ArtifactKind,
        model: Option<&str>,
    ) -> AppResult<JsonValue> {
        let text = self.complete(prompt, kind, model).await?;
        parse_model_output(&text)
    }
}

pub fn with_strict_suffix(prompt: &str) -> String {
    format!("{prompt}\n\n{STRICT_JSON_SUFFIX}")
}

/// Strip a single surrounding markdown fence from a model reply.
///
/// The text is trimmed first. A leading ```` ```json ```` (or, failing that, a
/// bare ```` ``` ````) is removed together with one newline after it, and a
/// trailing ```` ``` ```` is removed together with one newline before it.
/// Anything else, including fences in the middle of the text, is left alone.
pub fn clean_model_output(raw: &str) -> &str {
    let trimmed = raw.trim();

    let opening = if trimmed.starts_with("```json") {
        "```json"
    } else if trimmed.starts_with("```") {
        "```"
    } else {
        return trimmed;
    };

    let body = &trimmed[opening.len()..];
    let body = body.strip_prefix('\n').unwrap_or(body);

    match body.strip_suffix("```") {
        Some(rest) => rest.strip_suffix('\n').unwrap_or(rest),
        None => body,
    }
}

/// Clean and parse a model reply; failure is a model-output error.
pub fn parse_model_output(raw: &str) -> AppResult<JsonValue> {
    let cleaned = clean_model_output(raw);

    serde_json::from_str(cleaned).map_err(|err| {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            target: "app::ai::invoker",
            correlation_id = %correlation_id,
            error = %err,
            response_len = raw.len(),
            "model reply is not valid JSON"
        );
        AppError::ai_with_details(
            AiErrorCode::MalformedOutput,
            format!("AI generation failed: model reply is not valid JSON ({err})"),
            Some(correlation_id.as_str()),
            Some(json!({
                "reason": "invalid_json",
                "excerpt": excerpt(cleaned),
            })),
        )
    })
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ai_types::BackendMetadata;
    use std::sync::Mutex;

    #[test]
    fn strips_json_fence() {
        assert_eq!(clean_model_output("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn unfenced_text_is_unchanged() {
        assert_eq!(clean_model_output("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(clean_model_output("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn cleanup_is_idempotent_on_fenced_json() {
        let once = clean_model_output("```json\n{\"a\":1}\n```");
        assert_eq!(clean_model_output(once), once);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_matching() {
        assert_eq!(
            clean_model_output("  \n ```json\n{\"a\":1}\n```  \n"),
            "{\"a\":1}"
        );
        assert_eq!(clean_model_output("\t{\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn open_fence_only_keeps_body() {
        assert_eq!(clean_model_output("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn fence_without_newlines_is_stripped() {
        assert_eq!(clean_model_output("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn inner_backticks_are_not_touched() {
        let raw = "```json\n{\"code\":\"```rust\\nfn main() {}\\n```\"}\n```";
        assert_eq!(
            clean_model_output(raw),
            "{\"code\":\"```rust\\nfn main() {}\\n```\"}"
        );
    }

    #[test]
    fn uppercase_tag_is_not_recognised() {
        // Only the bare fence is removed, so the tag stays in front of the body.
        assert_eq!(clean_model_output("```JSON\n{}\n```"), "JSON\n{}");
        assert!(parse_model_output("```JSON\n{}\n```").is_err());
    }

    #[test]
    fn text_before_fence_disables_cleanup() {
        let raw = "Here you go:\n```json\n{}\n```";
        assert_eq!(clean_model_output(raw), raw);
    }

    #[test]
    fn parse_failure_is_model_output_error() {
        let error = parse_model_output("not json").expect_err("not json");
        assert_eq!(error.ai_code(), Some(AiErrorCode::MalformedOutput));
        assert!(error.is_model_output());
        assert!(error.ai_correlation_id().is_some());
        assert_eq!(
            error.ai_details().and_then(|d| d.get("excerpt")).and_then(|v| v.as_str()),
            Some("not json")
        );
    }

    struct RecordingBackend {
        reply: String,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl GenerativeBackend for RecordingBackend {
        async fn generate(&self, model: &str, prompt: &str) -> AppResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            Ok(self.reply.clone())
        }

        fn describe(&self) -> BackendMetadata {
            BackendMetadata::default()
        }
    }

    #[tokio::test]
    async fn invoke_json_appends_suffix_and_uses_default_model() {
        let backend = Arc::new(RecordingBackend {
            reply: "```json\n{\"ok\":true}\n```".to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let invoker = ModelInvoker::new(backend.clone(), "gemini-1.5-flash");

        let value = invoker
            .invoke_json("Say ok", ArtifactKind::GoalPlan, None)
            .await
            .expect("json reply");
        assert_eq!(value, json!({ "ok": true }));

        invoker
            .complete("Again", ArtifactKind::WeeklyReport, Some("gemini-2.0-flash"))
            .await
            .expect("raw reply");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].0, "gemini-1.5-flash");
        assert!(calls[0].1.starts_with("Say ok\n\n"));
        assert!(calls[0].1.ends_with(STRICT_JSON_SUFFIX));
        assert_eq!(calls[1].0, "gemini-2.0-flash");
    }
}
