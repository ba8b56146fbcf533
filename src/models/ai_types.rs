use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Every structured artifact the pipeline can ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    WeeklySummary,
    GoalPlan,
    HabitOptimization,
    WeeklyReport,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::WeeklySummary => "weeklySummary",
            ArtifactKind::GoalPlan => "goalPlan",
            ArtifactKind::HabitOptimization => "habitOptimization",
            ArtifactKind::WeeklyReport => "weeklyReport",
        }
    }

    /// Field names the model must return, in prompt order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ArtifactKind::WeeklySummary => &[
                "summary",
                "tasksCompleted",
                "focusMinutes",
                "topStreak",
                "recommendation",
            ],
            ArtifactKind::GoalPlan => &["goal", "steps", "timeline", "focus"],
            ArtifactKind::HabitOptimization => &[
                "habit",
                "currentStreak",
                "suggestion",
                "motivation",
                "nextStep",
            ],
            ArtifactKind::WeeklyReport => &["summary", "strengths", "improvements", "suggestions"],
        }
    }
}

/// Metadata describing the backend that serves generations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendMetadata {
    pub provider_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub has_api_key: bool,
}

/// Current configuration status of the AI substrate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AiStatusDto {
    pub has_api_key: bool,
    pub model: String,
    pub report_model: String,
    pub last_checked_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<BackendMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Text-in, text-out contract of a generative model backend.
///
/// Implementations must fail with a backend error (never a model-output error)
/// when the service cannot be reached or rejects the call.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> AppResult<String>;

    fn describe(&self) -> BackendMetadata;
}
